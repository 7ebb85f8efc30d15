//! Abstract storage traits for the resolver.
//!
//! The resolver reads and writes four logical tables: restaurants,
//! inspections, links and tweet matches. Each has its own trait; a backend
//! implements all four plus the atomic group commit to become a
//! [`RecordStore`].

use thiserror::Error;

use crate::inspection::{Inspection, InspectionId};
use crate::link::LinkRecord;
use crate::restaurant::{GeoBounds, NewRestaurant, Restaurant, RestaurantId};
use crate::tweet::TweetMatch;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Restaurant not found.
    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(RestaurantId),

    /// Inspection not found.
    #[error("Inspection not found: {0}")]
    InspectionNotFound(InspectionId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A row would break a table invariant.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Selects restaurants by the lowercased first character of their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialSelector<'a> {
    /// Initial is one of these symbols.
    AnyOf(&'a [char]),
    /// Initial is none of these symbols, or the name is empty.
    NoneOf(&'a [char]),
}

impl InitialSelector<'_> {
    /// Returns true if a row with this initial is selected.
    #[must_use]
    pub fn selects(&self, initial: Option<char>) -> bool {
        match self {
            Self::AnyOf(symbols) => initial.is_some_and(|c| symbols.contains(&c)),
            Self::NoneOf(symbols) => initial.map_or(true, |c| !symbols.contains(&c)),
        }
    }
}

/// One resolved group, ready to be committed atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCommit {
    /// Canonical record; stored with `resolved = true`.
    pub composite: NewRestaurant,
    /// Raw rows absorbed by the composite.
    pub members: Vec<RestaurantId>,
}

/// Restaurant an ingested inspection attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestaurantRef {
    /// A row already in the store.
    Existing(RestaurantId),
    /// The n-th entry of [`IngestBatch::restaurants`].
    Staged(usize),
}

impl RestaurantRef {
    /// The concrete id, given the ids assigned to the staged rows.
    #[must_use]
    pub fn resolve(self, staged: &[RestaurantId]) -> Option<RestaurantId> {
        match self {
            Self::Existing(id) => Some(id),
            Self::Staged(index) => staged.get(index).copied(),
        }
    }
}

/// An inspection waiting in an [`IngestBatch`].
///
/// `inspection.restaurant_id` is overwritten with the resolved `restaurant`
/// on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedInspection {
    pub restaurant: RestaurantRef,
    pub inspection: Inspection,
}

/// Feed records written as one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestBatch {
    /// Raw rows to insert, in order.
    pub restaurants: Vec<NewRestaurant>,
    pub inspections: Vec<StagedInspection>,
}

impl IngestBatch {
    /// No rows to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty() && self.inspections.is_empty()
    }
}

/// Storage trait for restaurant rows.
pub trait RestaurantStore: Send + Sync {
    /// Insert a restaurant and return its assigned id.
    fn insert_restaurant(&self, restaurant: NewRestaurant) -> Result<RestaurantId, StorageError>;

    /// Get a restaurant by ID.
    fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, StorageError>;

    /// First restaurant with exactly this name and address.
    fn find_by_name_address(
        &self,
        name: &str,
        address: Option<&str>,
    ) -> Result<Option<Restaurant>, StorageError>;

    /// All `resolved = false` rows in ascending id order.
    fn find_unresolved(&self) -> Result<Vec<Restaurant>, StorageError>;

    /// Rows selected by name initial, in ascending id order.
    fn find_by_initials(&self, selector: InitialSelector<'_>) -> Result<Vec<Restaurant>, StorageError>;

    /// Rows whose normalized name equals one of `keys`, in ascending id order.
    fn find_by_name_keys(&self, keys: &[String]) -> Result<Vec<Restaurant>, StorageError>;

    /// Rows with both coordinates inside `bounds`, in ascending id order.
    fn find_within(&self, bounds: GeoBounds) -> Result<Vec<Restaurant>, StorageError>;

    /// Set `resolved = true` on one row.
    fn mark_resolved(&self, id: RestaurantId) -> Result<(), StorageError>;

    /// Number of restaurant rows.
    fn count_restaurants(&self) -> Result<usize, StorageError>;
}

/// Storage trait for inspections.
pub trait InspectionStore: Send + Sync {
    /// Insert an inspection. Returns `DuplicateKey` if the id already exists
    /// and `RestaurantNotFound` if its restaurant does not.
    fn insert_inspection(&self, inspection: Inspection) -> Result<(), StorageError>;

    /// Get an inspection by ID.
    fn get_inspection(&self, id: &InspectionId) -> Result<Option<Inspection>, StorageError>;

    /// Inspections attached to a restaurant, ordered by id.
    fn find_inspections_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Inspection>, StorageError>;

    /// Number of inspection rows.
    fn count_inspections(&self) -> Result<usize, StorageError>;
}

/// Storage trait for provenance links.
pub trait LinkStore: Send + Sync {
    /// Composite that absorbed `original`, if any.
    fn find_primary(&self, original: RestaurantId) -> Result<Option<RestaurantId>, StorageError>;

    /// Originals absorbed by `primary`, ascending.
    fn find_originals(&self, primary: RestaurantId) -> Result<Vec<RestaurantId>, StorageError>;

    /// Every link record, ordered by original id.
    fn find_links(&self) -> Result<Vec<LinkRecord>, StorageError>;
}

/// Storage trait for tweet associations.
pub trait TweetMatchStore: Send + Sync {
    /// Insert or replace rows keyed on `(tweet_key, restaurant_id)`.
    fn upsert_tweet_matches(&self, matches: &[TweetMatch]) -> Result<(), StorageError>;

    /// Tweet associations for one restaurant, ordered by tweet key.
    fn find_tweet_matches_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<TweetMatch>, StorageError>;
}

/// A complete backend: every table plus the atomic group commit.
pub trait RecordStore: RestaurantStore + InspectionStore + LinkStore + TweetMatchStore {
    /// Commit one resolved group as a single unit.
    ///
    /// Inserts the composite, marks every member resolved, writes one link
    /// per member and repoints the members' inspections to the composite.
    /// Either all of it happens or none of it does.
    ///
    /// # Errors
    /// - `RestaurantNotFound`: a member does not exist
    /// - `ConstraintViolation`: the group is empty, or a member is already
    ///   resolved or linked
    fn commit_group(&self, commit: GroupCommit) -> Result<RestaurantId, StorageError>;

    /// Write a batch of feed records as a single unit.
    ///
    /// Inserts the staged restaurants in order, then every inspection against
    /// its resolved restaurant. Returns the ids assigned to the staged rows.
    /// On any error nothing from the batch is kept.
    ///
    /// # Errors
    /// - `RestaurantNotFound`: an existing reference does not exist
    /// - `DuplicateKey`: an inspection id is already stored or repeats in the batch
    /// - `ConstraintViolation`: a staged reference is out of range
    fn commit_ingest(&self, batch: IngestBatch) -> Result<Vec<RestaurantId>, StorageError>;
}
