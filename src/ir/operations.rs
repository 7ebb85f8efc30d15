//! Resolver request definitions and payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inspection::InspectionPayload;
use crate::restaurant::RestaurantId;
use crate::tweet::Tweet;

/// The top-level IR wrapper for all resolver requests.
///
/// Every request is wrapped in this struct to provide:
/// - Protocol versioning for forward/backward compatibility
/// - Request tracking via unique IDs
/// - Timestamp for audit logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverIR {
    /// Protocol version (e.g., "1.0").
    pub version: String,

    /// Unique identifier for this request (for tracing/debugging).
    pub request_id: Uuid,

    /// When this IR was created.
    pub timestamp: DateTime<Utc>,

    /// The request to execute.
    pub request: Request,
}

impl ResolverIR {
    /// Current protocol version.
    pub const CURRENT_VERSION: &'static str = "1.0";

    /// Creates a new IR with the given request.
    pub fn new(request: Request) -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            request,
        }
    }

    /// Sets a custom request ID (useful for correlation).
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// All supported resolver requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "snake_case")]
pub enum Request {
    /// Run a resolution pass.
    Resolve(ResolvePayload),

    /// Ingest one inspection feed record.
    LoadInspection(InspectionPayload),

    /// Ingest a batch of feed records in one transaction.
    LoadInspections(InspectionBatch),

    /// Match a tweet against restaurants.
    MatchTweet(Tweet),

    /// A restaurant and its inspections.
    FindRestaurant(RestaurantLookup),

    /// The restaurant an inspection is attached to.
    RestaurantByInspection(InspectionLookup),

    /// The restaurant an inspection is attached to plus every row it absorbed.
    LinkedByInspection(InspectionLookup),

    /// The composite that absorbed a raw row.
    PrimaryOf(RestaurantLookup),

    /// Tweet associations of a restaurant.
    TweetsForRestaurant(RestaurantLookup),

    /// Number of stored inspections.
    CountInspections,
}

impl Request {
    /// Stable name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Resolve(_) => "resolve",
            Self::LoadInspection(_) => "load_inspection",
            Self::LoadInspections(_) => "load_inspections",
            Self::MatchTweet(_) => "match_tweet",
            Self::FindRestaurant(_) => "find_restaurant",
            Self::RestaurantByInspection(_) => "restaurant_by_inspection",
            Self::LinkedByInspection(_) => "linked_by_inspection",
            Self::PrimaryOf(_) => "primary_of",
            Self::TweetsForRestaurant(_) => "tweets_for_restaurant",
            Self::CountInspections => "count_inspections",
        }
    }
}

/// Payload for RESOLVE requests.
///
/// Unset fields fall back to the engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvePayload {
    /// Run the blocked pass instead of the unblocked one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaled: Option<bool>,

    /// Requested number of alphabet blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<usize>,
}

impl ResolvePayload {
    /// Blocked pass with `blocks` requested blocks.
    #[must_use]
    pub const fn blocked(blocks: usize) -> Self {
        Self {
            scaled: Some(true),
            blocks: Some(blocks),
        }
    }

    /// Unblocked pass.
    #[must_use]
    pub const fn unblocked() -> Self {
        Self {
            scaled: Some(false),
            blocks: None,
        }
    }
}

/// Payload for LOAD_INSPECTIONS requests.
///
/// The records commit together; if any of them fails, none are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionBatch {
    pub records: Vec<InspectionPayload>,
}

impl InspectionBatch {
    #[must_use]
    pub fn new(records: Vec<InspectionPayload>) -> Self {
        Self { records }
    }
}

/// Lookup by restaurant id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantLookup {
    pub restaurant_id: RestaurantId,
}

/// Lookup by inspection id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionLookup {
    pub inspection_id: String,
}

impl InspectionLookup {
    pub fn new(inspection_id: impl Into<String>) -> Self {
        Self {
            inspection_id: inspection_id.into(),
        }
    }
}
