//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of the storage
//! traits. It is intended for embedded usage, tests, and as a reference
//! implementation for the SQL backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::inspection::{Inspection, InspectionId};
use crate::link::LinkRecord;
use crate::restaurant::{GeoBounds, NewRestaurant, Restaurant, RestaurantId};
use crate::storage::traits::{
    GroupCommit, IngestBatch, InitialSelector, InspectionStore, LinkStore, RecordStore,
    RestaurantRef, RestaurantStore, StorageError, TweetMatchStore,
};
use crate::tweet::{MatchReason, TweetKey, TweetMatch};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

type NameAddress = (String, Option<String>);

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    restaurants: BTreeMap<RestaurantId, Restaurant>,
    by_name_address: HashMap<NameAddress, BTreeSet<RestaurantId>>,
    by_name_key: HashMap<String, BTreeSet<RestaurantId>>,
    inspections: BTreeMap<InspectionId, Inspection>,
    inspections_by_restaurant: HashMap<RestaurantId, BTreeSet<InspectionId>>,
    // original -> primary
    links: BTreeMap<RestaurantId, RestaurantId>,
    originals_by_primary: HashMap<RestaurantId, BTreeSet<RestaurantId>>,
    tweet_matches: BTreeMap<(TweetKey, RestaurantId), MatchReason>,
}

impl State {
    fn insert_restaurant(&mut self, restaurant: NewRestaurant) -> RestaurantId {
        self.next_id += 1;
        let id = RestaurantId::new(self.next_id);
        let row = Restaurant::from_new(id, restaurant);
        self.by_name_address
            .entry((row.name.clone(), row.address.clone()))
            .or_default()
            .insert(id);
        self.by_name_key.entry(row.name_key()).or_default().insert(id);
        self.restaurants.insert(id, row);
        id
    }

    fn insert_inspection(&mut self, inspection: Inspection) {
        self.inspections_by_restaurant
            .entry(inspection.restaurant_id)
            .or_default()
            .insert(inspection.id.clone());
        self.inspections.insert(inspection.id.clone(), inspection);
    }

    fn rows<'a>(&'a self, ids: impl IntoIterator<Item = &'a RestaurantId>) -> Vec<Restaurant> {
        let mut rows: Vec<Restaurant> = ids
            .into_iter()
            .filter_map(|id| self.restaurants.get(id).cloned())
            .collect();
        rows.sort_by_key(|r| r.id);
        rows.dedup_by_key(|r| r.id);
        rows
    }

    fn check_group(&self, commit: &GroupCommit) -> Result<(), StorageError> {
        if commit.members.is_empty() {
            return Err(StorageError::ConstraintViolation(
                "group has no members".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for &member in &commit.members {
            if !seen.insert(member) {
                return Err(StorageError::ConstraintViolation(format!(
                    "restaurant {member} listed twice in group"
                )));
            }
            let row = self
                .restaurants
                .get(&member)
                .ok_or(StorageError::RestaurantNotFound(member))?;
            if row.resolved {
                return Err(StorageError::ConstraintViolation(format!(
                    "restaurant {member} is already resolved"
                )));
            }
            if let Some(primary) = self.links.get(&member) {
                return Err(StorageError::ConstraintViolation(format!(
                    "restaurant {member} is already linked to {primary}"
                )));
            }
        }
        Ok(())
    }

    fn check_ingest(&self, batch: &IngestBatch) -> Result<(), StorageError> {
        let mut seen = BTreeSet::new();
        for staged in &batch.inspections {
            match staged.restaurant {
                RestaurantRef::Existing(id) if !self.restaurants.contains_key(&id) => {
                    return Err(StorageError::RestaurantNotFound(id));
                }
                RestaurantRef::Staged(index) if index >= batch.restaurants.len() => {
                    return Err(StorageError::ConstraintViolation(format!(
                        "staged restaurant {index} is not in the batch"
                    )));
                }
                _ => {}
            }
            let id = &staged.inspection.id;
            if self.inspections.contains_key(id) || !seen.insert(id) {
                return Err(StorageError::DuplicateKey(format!("inspection {id}")));
            }
        }
        Ok(())
    }
}

/// In-memory implementation of every storage trait.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    state: RwLock<State>,
}

impl InMemoryStores {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, context: &'static str) -> Result<RwLockReadGuard<'_, State>, StorageError> {
        self.state.read().map_err(|_| lock_err(context))
    }

    fn write(&self, context: &'static str) -> Result<RwLockWriteGuard<'_, State>, StorageError> {
        self.state.write().map_err(|_| lock_err(context))
    }
}

impl RestaurantStore for InMemoryStores {
    fn insert_restaurant(&self, restaurant: NewRestaurant) -> Result<RestaurantId, StorageError> {
        let mut state = self.write("insert_restaurant")?;
        Ok(state.insert_restaurant(restaurant))
    }

    fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, StorageError> {
        let state = self.read("get_restaurant")?;
        Ok(state.restaurants.get(&id).cloned())
    }

    fn find_by_name_address(
        &self,
        name: &str,
        address: Option<&str>,
    ) -> Result<Option<Restaurant>, StorageError> {
        let state = self.read("find_by_name_address")?;
        let key = (name.to_string(), address.map(str::to_string));
        Ok(state
            .by_name_address
            .get(&key)
            .and_then(|ids| ids.first())
            .and_then(|id| state.restaurants.get(id).cloned()))
    }

    fn find_unresolved(&self) -> Result<Vec<Restaurant>, StorageError> {
        let state = self.read("find_unresolved")?;
        Ok(state
            .restaurants
            .values()
            .filter(|r| !r.resolved)
            .cloned()
            .collect())
    }

    fn find_by_initials(&self, selector: InitialSelector<'_>) -> Result<Vec<Restaurant>, StorageError> {
        let state = self.read("find_by_initials")?;
        Ok(state
            .restaurants
            .values()
            .filter(|r| selector.selects(r.initial()))
            .cloned()
            .collect())
    }

    fn find_by_name_keys(&self, keys: &[String]) -> Result<Vec<Restaurant>, StorageError> {
        let state = self.read("find_by_name_keys")?;
        let ids = keys
            .iter()
            .filter_map(|key| state.by_name_key.get(key))
            .flatten();
        Ok(state.rows(ids))
    }

    fn find_within(&self, bounds: GeoBounds) -> Result<Vec<Restaurant>, StorageError> {
        let state = self.read("find_within")?;
        Ok(state
            .restaurants
            .values()
            .filter(|r| r.within(&bounds))
            .cloned()
            .collect())
    }

    fn mark_resolved(&self, id: RestaurantId) -> Result<(), StorageError> {
        let mut state = self.write("mark_resolved")?;
        let row = state
            .restaurants
            .get_mut(&id)
            .ok_or(StorageError::RestaurantNotFound(id))?;
        row.resolved = true;
        Ok(())
    }

    fn count_restaurants(&self) -> Result<usize, StorageError> {
        Ok(self.read("count_restaurants")?.restaurants.len())
    }
}

impl InspectionStore for InMemoryStores {
    fn insert_inspection(&self, inspection: Inspection) -> Result<(), StorageError> {
        let mut state = self.write("insert_inspection")?;
        if state.inspections.contains_key(&inspection.id) {
            return Err(StorageError::DuplicateKey(format!(
                "inspection {}",
                inspection.id
            )));
        }
        if !state.restaurants.contains_key(&inspection.restaurant_id) {
            return Err(StorageError::RestaurantNotFound(inspection.restaurant_id));
        }
        state.insert_inspection(inspection);
        Ok(())
    }

    fn get_inspection(&self, id: &InspectionId) -> Result<Option<Inspection>, StorageError> {
        let state = self.read("get_inspection")?;
        Ok(state.inspections.get(id).cloned())
    }

    fn find_inspections_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Inspection>, StorageError> {
        let state = self.read("find_inspections_by_restaurant")?;
        Ok(state
            .inspections_by_restaurant
            .get(&restaurant_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.inspections.get(id).cloned())
            .collect())
    }

    fn count_inspections(&self) -> Result<usize, StorageError> {
        Ok(self.read("count_inspections")?.inspections.len())
    }
}

impl LinkStore for InMemoryStores {
    fn find_primary(&self, original: RestaurantId) -> Result<Option<RestaurantId>, StorageError> {
        let state = self.read("find_primary")?;
        Ok(state.links.get(&original).copied())
    }

    fn find_originals(&self, primary: RestaurantId) -> Result<Vec<RestaurantId>, StorageError> {
        let state = self.read("find_originals")?;
        Ok(state
            .originals_by_primary
            .get(&primary)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    fn find_links(&self) -> Result<Vec<LinkRecord>, StorageError> {
        let state = self.read("find_links")?;
        Ok(state
            .links
            .iter()
            .map(|(&original, &primary)| LinkRecord::new(primary, original))
            .collect())
    }
}

impl TweetMatchStore for InMemoryStores {
    fn upsert_tweet_matches(&self, matches: &[TweetMatch]) -> Result<(), StorageError> {
        let mut state = self.write("upsert_tweet_matches")?;
        if let Some(missing) = matches
            .iter()
            .find(|m| !state.restaurants.contains_key(&m.restaurant_id))
        {
            return Err(StorageError::RestaurantNotFound(missing.restaurant_id));
        }
        for m in matches {
            state
                .tweet_matches
                .insert((m.tweet_key.clone(), m.restaurant_id), m.reason);
        }
        Ok(())
    }

    fn find_tweet_matches_by_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<TweetMatch>, StorageError> {
        let state = self.read("find_tweet_matches_by_restaurant")?;
        Ok(state
            .tweet_matches
            .iter()
            .filter(|((_, id), _)| *id == restaurant_id)
            .map(|((key, id), reason)| TweetMatch {
                tweet_key: key.clone(),
                restaurant_id: *id,
                reason: *reason,
            })
            .collect())
    }
}

impl RecordStore for InMemoryStores {
    fn commit_group(&self, commit: GroupCommit) -> Result<RestaurantId, StorageError> {
        let mut state = self.write("commit_group")?;
        state.check_group(&commit)?;

        let mut composite = commit.composite;
        composite.resolved = true;
        let primary = state.insert_restaurant(composite);

        for &member in &commit.members {
            if let Some(row) = state.restaurants.get_mut(&member) {
                row.resolved = true;
            }
            state.links.insert(member, primary);
            state
                .originals_by_primary
                .entry(primary)
                .or_default()
                .insert(member);

            let moved = state
                .inspections_by_restaurant
                .remove(&member)
                .unwrap_or_default();
            for inspection_id in &moved {
                if let Some(inspection) = state.inspections.get_mut(inspection_id) {
                    inspection.restaurant_id = primary;
                }
            }
            state
                .inspections_by_restaurant
                .entry(primary)
                .or_default()
                .extend(moved);
        }
        Ok(primary)
    }

    fn commit_ingest(&self, batch: IngestBatch) -> Result<Vec<RestaurantId>, StorageError> {
        let mut state = self.write("commit_ingest")?;
        state.check_ingest(&batch)?;

        let staged: Vec<RestaurantId> = batch
            .restaurants
            .into_iter()
            .map(|restaurant| state.insert_restaurant(restaurant))
            .collect();
        for item in batch.inspections {
            let mut inspection = item.inspection;
            inspection.restaurant_id = item.restaurant.resolve(&staged).ok_or_else(|| {
                StorageError::BackendError("staged restaurant vanished".to_string())
            })?;
            state.insert_inspection(inspection);
        }
        Ok(staged)
    }
}
