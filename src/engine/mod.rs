//! Execution engine for resolver requests.
//!
//! [`ResolverEngine`] applies requests (`ResolverIR`) against a pluggable
//! [`RecordStore`]. Every request is validated before it touches the store.

mod pass;
mod runtime;

pub use pass::{
    run_pass, BlockFailure, BlockSummary, GroupFailure, MergedGroup, PassId, PassMode, PassReport,
};
pub use runtime::{link_block, link_blocks};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::error::{ExecutionError, ResolverError, ResolverResult, ValidationError};
use crate::inspection::{Inspection, InspectionId, InspectionPayload};
use crate::ir::{InspectionLookup, Request, ResolvePayload, ResolverIR};
use crate::matching::{match_tweet, TweetMatchOutcome};
use crate::restaurant::{Restaurant, RestaurantId};
use crate::storage::{
    IngestBatch, InMemoryStores, RecordStore, RestaurantRef, StagedInspection, StorageError,
};
use crate::tweet::{Tweet, TweetMatch};

/// Result of ingesting one inspection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    /// Restaurant the inspection is attached to.
    pub restaurant_id: RestaurantId,
    /// A new raw restaurant row was inserted.
    pub created_restaurant: bool,
    /// The inspection row was written (false when it already existed).
    pub inserted_inspection: bool,
}

/// A restaurant and its inspections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDetail {
    pub restaurant: Restaurant,
    pub inspections: Vec<Inspection>,
}

/// A composite and the rows it absorbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedRestaurants {
    /// The restaurant the inspection points to.
    pub primary: Restaurant,
    /// Absorbed originals, ascending by id. Empty for a non-composite row.
    pub linked: Vec<Restaurant>,
    /// Linked ids followed by the primary id.
    pub ids: Vec<RestaurantId>,
}

/// Result of executing a resolver request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineResponse {
    /// Result of a RESOLVE.
    Resolve { report: PassReport },

    /// Result of LOAD_INSPECTION.
    LoadInspection { outcome: LoadOutcome },

    /// Result of LOAD_INSPECTIONS, one outcome per record in request order.
    LoadInspections { outcomes: Vec<LoadOutcome> },

    /// Result of MATCH_TWEET.
    MatchTweet { outcome: TweetMatchOutcome },

    /// Result of FIND_RESTAURANT.
    Restaurant { detail: RestaurantDetail },

    /// Result of RESTAURANT_BY_INSPECTION.
    RestaurantByInspection { restaurant: Restaurant },

    /// Result of LINKED_BY_INSPECTION.
    LinkedByInspection { linked: LinkedRestaurants },

    /// Result of PRIMARY_OF. `primary` is absent for rows never absorbed.
    PrimaryOf {
        original: RestaurantId,
        primary: Option<Restaurant>,
    },

    /// Result of TWEETS_FOR_RESTAURANT.
    TweetsForRestaurant {
        restaurant_id: RestaurantId,
        matches: Vec<TweetMatch>,
    },

    /// Result of COUNT_INSPECTIONS.
    CountInspections { count: usize },
}

/// Resolver execution engine.
#[derive(Clone)]
pub struct ResolverEngine {
    store: Arc<dyn RecordStore>,
    config: ResolverConfig,
}

impl ResolverEngine {
    /// Create a new engine over `store` with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            config: ResolverConfig::default(),
        }
    }

    /// Create a new engine with an explicit configuration.
    pub fn with_config(store: Arc<dyn RecordStore>, config: ResolverConfig) -> ResolverResult<Self> {
        Ok(Self {
            store,
            config: config.validate()?,
        })
    }

    /// Engine over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStores::new()))
    }

    /// Get a reference to the record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Execute a resolver IR request.
    pub fn execute(&self, ir: ResolverIR) -> ResolverResult<EngineResponse> {
        // Deserialized IR is untrusted.
        ir.request.validate().map_err(ResolverError::from)?;
        debug!(request_id = %ir.request_id, op = ir.request.name(), "executing request");

        let response = match ir.request {
            Request::Resolve(payload) => EngineResponse::Resolve {
                report: self.resolve(payload)?,
            },
            Request::LoadInspection(payload) => EngineResponse::LoadInspection {
                outcome: self.load_inspection(&payload)?,
            },
            Request::LoadInspections(batch) => EngineResponse::LoadInspections {
                outcomes: self.load_inspections(&batch.records)?,
            },
            Request::MatchTweet(tweet) => EngineResponse::MatchTweet {
                outcome: self.match_tweet(&tweet)?,
            },
            Request::FindRestaurant(lookup) => EngineResponse::Restaurant {
                detail: self.restaurant(lookup.restaurant_id)?,
            },
            Request::RestaurantByInspection(lookup) => EngineResponse::RestaurantByInspection {
                restaurant: self.restaurant_by_inspection(&lookup_id(&lookup))?,
            },
            Request::LinkedByInspection(lookup) => EngineResponse::LinkedByInspection {
                linked: self.linked_by_inspection(&lookup_id(&lookup))?,
            },
            Request::PrimaryOf(lookup) => EngineResponse::PrimaryOf {
                original: lookup.restaurant_id,
                primary: self.primary_of(lookup.restaurant_id)?,
            },
            Request::TweetsForRestaurant(lookup) => EngineResponse::TweetsForRestaurant {
                restaurant_id: lookup.restaurant_id,
                matches: self.tweets_for_restaurant(lookup.restaurant_id)?,
            },
            Request::CountInspections => EngineResponse::CountInspections {
                count: self.count_inspections()?,
            },
        };
        Ok(response)
    }

    /// Runs one resolution pass.
    pub fn resolve(&self, payload: ResolvePayload) -> ResolverResult<PassReport> {
        run_pass(self.store.as_ref(), &self.config, payload)
    }

    /// Matches a tweet and persists its associations.
    pub fn match_tweet(&self, tweet: &Tweet) -> ResolverResult<TweetMatchOutcome> {
        match_tweet(self.store.as_ref(), tweet)
    }

    /// Ingests one feed record.
    ///
    /// A known inspection id is a no-op. Otherwise the inspection attaches to
    /// the first restaurant with the same name and address (or to the
    /// composite that absorbed it), inserting a raw row when none exists.
    pub fn load_inspection(&self, payload: &InspectionPayload) -> ResolverResult<LoadOutcome> {
        payload.validate()?;
        let id = payload.id().ok_or_else(|| {
            ResolverError::from(ValidationError::MissingField {
                field: "inspection_id".to_string(),
            })
        })?;

        if let Some(existing) = self.store.get_inspection(&id)? {
            debug!(inspection = %id, "inspection already loaded");
            return Ok(LoadOutcome {
                restaurant_id: existing.restaurant_id,
                created_restaurant: false,
                inserted_inspection: false,
            });
        }

        let new = payload.restaurant();
        let (restaurant_id, created_restaurant) =
            match self.store.find_by_name_address(&new.name, new.address.as_deref())? {
                Some(found) => match self.store.find_primary(found.id)? {
                    Some(primary) => (primary, false),
                    None => (found.id, false),
                },
                None => (self.store.insert_restaurant(new)?, true),
            };

        self.store
            .insert_inspection(payload.inspection(restaurant_id))?;
        info!(
            inspection = %id,
            restaurant = %restaurant_id,
            created_restaurant,
            "inspection loaded"
        );
        Ok(LoadOutcome {
            restaurant_id,
            created_restaurant,
            inserted_inspection: true,
        })
    }

    /// Ingests feed records as one transaction.
    ///
    /// Each record follows the [`load_inspection`](Self::load_inspection)
    /// rules, and records later in the batch see the rows staged by earlier
    /// ones. If any record fails, nothing from the batch is written.
    pub fn load_inspections(&self, records: &[InspectionPayload]) -> ResolverResult<Vec<LoadOutcome>> {
        let mut batch = IngestBatch::default();
        let mut staged_by_key: HashMap<(String, Option<String>), usize> = HashMap::new();
        let mut attached: HashMap<InspectionId, RestaurantRef> = HashMap::new();
        let mut planned = Vec::with_capacity(records.len());

        for payload in records {
            payload.validate()?;
            let id = payload.id().ok_or_else(|| {
                ResolverError::from(ValidationError::MissingField {
                    field: "inspection_id".to_string(),
                })
            })?;

            if let Some(existing) = self.store.get_inspection(&id)? {
                planned.push((RestaurantRef::Existing(existing.restaurant_id), false, false));
                continue;
            }
            if let Some(&target) = attached.get(&id) {
                planned.push((target, false, false));
                continue;
            }

            let new = payload.restaurant();
            let (target, created) =
                match self.store.find_by_name_address(&new.name, new.address.as_deref())? {
                    Some(found) => {
                        let primary = self.store.find_primary(found.id)?.unwrap_or(found.id);
                        (RestaurantRef::Existing(primary), false)
                    }
                    None => {
                        let key = (new.name.clone(), new.address.clone());
                        match staged_by_key.get(&key) {
                            Some(&index) => (RestaurantRef::Staged(index), false),
                            None => {
                                let index = batch.restaurants.len();
                                batch.restaurants.push(new);
                                staged_by_key.insert(key, index);
                                (RestaurantRef::Staged(index), true)
                            }
                        }
                    }
                };

            // Staged targets get their id on commit.
            let placeholder = target.resolve(&[]).unwrap_or(RestaurantId::new(0));
            batch.inspections.push(StagedInspection {
                restaurant: target,
                inspection: payload.inspection(placeholder),
            });
            attached.insert(id, target);
            planned.push((target, created, true));
        }

        let staged = if batch.is_empty() {
            Vec::new()
        } else {
            self.store.commit_ingest(batch)?
        };

        let outcomes = planned
            .into_iter()
            .map(|(target, created_restaurant, inserted_inspection)| -> ResolverResult<LoadOutcome> {
                let restaurant_id = target.resolve(&staged).ok_or_else(|| {
                    StorageError::BackendError(format!("no id assigned to {target:?}"))
                })?;
                Ok(LoadOutcome {
                    restaurant_id,
                    created_restaurant,
                    inserted_inspection,
                })
            })
            .collect::<ResolverResult<Vec<_>>>()?;

        info!(
            records = outcomes.len(),
            inserted = outcomes.iter().filter(|o| o.inserted_inspection).count(),
            created_restaurants = staged.len(),
            "inspection batch committed"
        );
        Ok(outcomes)
    }

    /// A restaurant and its inspections.
    pub fn restaurant(&self, id: RestaurantId) -> ResolverResult<RestaurantDetail> {
        let restaurant = self.require_restaurant(id)?;
        let inspections = self.store.find_inspections_by_restaurant(id)?;
        Ok(RestaurantDetail {
            restaurant,
            inspections,
        })
    }

    /// The restaurant an inspection is attached to.
    pub fn restaurant_by_inspection(&self, id: &InspectionId) -> ResolverResult<Restaurant> {
        let inspection = self
            .store
            .get_inspection(id)?
            .ok_or_else(|| ExecutionError::InspectionNotFound { id: id.clone() })?;
        self.require_restaurant(inspection.restaurant_id)
    }

    /// The restaurant an inspection is attached to, with every row it absorbed.
    pub fn linked_by_inspection(&self, id: &InspectionId) -> ResolverResult<LinkedRestaurants> {
        let primary = self.restaurant_by_inspection(id)?;
        let mut linked = Vec::new();
        for original in self.store.find_originals(primary.id)? {
            linked.push(self.require_restaurant(original)?);
        }
        let mut ids: Vec<RestaurantId> = linked.iter().map(|r| r.id).collect();
        ids.push(primary.id);
        Ok(LinkedRestaurants {
            primary,
            linked,
            ids,
        })
    }

    /// The composite that absorbed `original`, if any.
    pub fn primary_of(&self, original: RestaurantId) -> ResolverResult<Option<Restaurant>> {
        self.require_restaurant(original)?;
        match self.store.find_primary(original)? {
            Some(primary) => Ok(Some(self.require_restaurant(primary)?)),
            None => Ok(None),
        }
    }

    /// Tweet associations of a restaurant.
    pub fn tweets_for_restaurant(&self, id: RestaurantId) -> ResolverResult<Vec<TweetMatch>> {
        self.require_restaurant(id)?;
        Ok(self.store.find_tweet_matches_by_restaurant(id)?)
    }

    /// Number of stored inspections.
    pub fn count_inspections(&self) -> ResolverResult<usize> {
        Ok(self.store.count_inspections()?)
    }

    fn require_restaurant(&self, id: RestaurantId) -> ResolverResult<Restaurant> {
        self.store
            .get_restaurant(id)?
            .ok_or_else(|| StorageError::RestaurantNotFound(id).into())
    }
}

fn lookup_id(lookup: &InspectionLookup) -> InspectionId {
    InspectionId::new(lookup.inspection_id.trim())
}
