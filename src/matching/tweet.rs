//! Tweet-to-restaurant matching.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ResolverError, ResolverResult, ValidationError};
use crate::matching::ngrams::tweet_ngrams;
use crate::restaurant::{GeoBounds, RestaurantId};
use crate::storage::RecordStore;
use crate::tweet::{MatchReason, Tweet, TweetKey, TweetMatch};

/// Half-height of the geo match box, in degrees latitude.
pub const LAT_DELTA: f64 = 0.002_250_01;

/// Half-width of the geo match box, in degrees longitude.
pub const LON_DELTA: f64 = 0.003_021_90;

/// Matches found for one tweet, ordered by restaurant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetMatchOutcome {
    pub tweet_key: TweetKey,
    pub matches: Vec<TweetMatch>,
}

impl TweetMatchOutcome {
    /// Matched restaurant ids, ascending.
    #[must_use]
    pub fn restaurant_ids(&self) -> Vec<RestaurantId> {
        self.matches.iter().map(|m| m.restaurant_id).collect()
    }

    /// Reason recorded for `id`, if it matched.
    #[must_use]
    pub fn reason_for(&self, id: RestaurantId) -> Option<MatchReason> {
        self.matches
            .iter()
            .find(|m| m.restaurant_id == id)
            .map(|m| m.reason)
    }
}

/// Bounding box searched around a tweet's coordinates.
#[must_use]
pub fn geo_bounds(lat: f64, lon: f64) -> GeoBounds {
    GeoBounds::around(lat, lon, LAT_DELTA, LON_DELTA)
}

/// Matches a tweet by name n-gram and location, persisting any matches.
///
/// A restaurant matches by name when its normalized name equals one of the
/// tweet's 1- to 4-word n-grams, and by location when it lies inside the
/// box around the tweet's coordinates. Rows are written only when at least
/// one restaurant matched.
pub fn match_tweet(store: &dyn RecordStore, tweet: &Tweet) -> ResolverResult<TweetMatchOutcome> {
    tweet.validate()?;
    let tweet_key = tweet.tweet_key().ok_or_else(|| {
        ResolverError::from(ValidationError::MissingField {
            field: "key".to_string(),
        })
    })?;

    let grams: Vec<String> = tweet_ngrams(tweet.text.as_deref().unwrap_or_default())
        .into_iter()
        .collect();

    let mut reasons: BTreeMap<RestaurantId, MatchReason> = BTreeMap::new();
    if !grams.is_empty() {
        for row in store.find_by_name_keys(&grams)? {
            reasons.insert(row.id, MatchReason::Name);
        }
    }
    if let Some((lat, lon)) = tweet.coordinates() {
        for row in store.find_within(geo_bounds(lat, lon))? {
            reasons
                .entry(row.id)
                .and_modify(|reason| *reason = reason.with_geo())
                .or_insert(MatchReason::Geo);
        }
    }

    let matches: Vec<TweetMatch> = reasons
        .into_iter()
        .map(|(restaurant_id, reason)| TweetMatch {
            tweet_key: tweet_key.clone(),
            restaurant_id,
            reason,
        })
        .collect();

    if !matches.is_empty() {
        store.upsert_tweet_matches(&matches)?;
    }
    debug!(
        tweet = %tweet_key,
        ngrams = grams.len(),
        matched = matches.len(),
        "tweet matched"
    );
    Ok(TweetMatchOutcome { tweet_key, matches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restaurant::NewRestaurant;
    use crate::storage::{InMemoryStores, RestaurantStore, TweetMatchStore};

    fn placed(name: &str, lat: f64, lon: f64) -> NewRestaurant {
        NewRestaurant {
            latitude: Some(lat),
            longitude: Some(lon),
            ..NewRestaurant::named(name)
        }
    }

    #[test]
    fn name_and_geo_hits_merge_into_both() {
        let store = InMemoryStores::new();
        let kims = store.insert_restaurant(placed("Kim's Diner", 41.8800, -87.6300)).unwrap();
        let nearby = store.insert_restaurant(placed("Alinea", 41.8810, -87.6310)).unwrap();
        let far = store.insert_restaurant(placed("Kims Grill", 41.9500, -87.7000)).unwrap();

        let tweet = Tweet::new("t-1", "Loving brunch at Kim's Diner today").at(41.8801, -87.6301);
        let outcome = match_tweet(&store, &tweet).unwrap();

        assert_eq!(outcome.restaurant_ids(), vec![kims, nearby]);
        assert_eq!(outcome.reason_for(kims), Some(MatchReason::Both));
        assert_eq!(outcome.reason_for(nearby), Some(MatchReason::Geo));
        assert_eq!(outcome.reason_for(far), None);
        assert_eq!(store.find_tweet_matches_by_restaurant(kims).unwrap().len(), 1);
    }

    #[test]
    fn tweet_without_coordinates_matches_by_name_only() {
        let store = InMemoryStores::new();
        let kims = store.insert_restaurant(placed("Kim's Diner", 41.88, -87.63)).unwrap();
        let outcome = match_tweet(&store, &Tweet::new("t-2", "KIMS DINER rocks")).unwrap();
        assert_eq!(outcome.reason_for(kims), Some(MatchReason::Name));
    }

    #[test]
    fn no_match_writes_nothing() {
        let store = InMemoryStores::new();
        let kims = store.insert_restaurant(placed("Kim's Diner", 41.88, -87.63)).unwrap();
        let outcome = match_tweet(&store, &Tweet::new("t-3", "nothing to see")).unwrap();
        assert!(outcome.matches.is_empty());
        assert!(store.find_tweet_matches_by_restaurant(kims).unwrap().is_empty());
    }

    #[test]
    fn geo_box_edges_are_inclusive() {
        let bounds = geo_bounds(41.0, -87.0);
        assert!(bounds.contains(41.0 + 0.002, -87.0 - 0.003));
        assert!(!bounds.contains(41.0 + 0.0023, -87.0));
        assert!(!bounds.contains(41.0, -87.0 + 0.0031));
    }

    #[test]
    fn invalid_tweet_is_rejected() {
        let store = InMemoryStores::new();
        let tweet = Tweet {
            key: Some("t-4".to_string()),
            ..Tweet::default()
        };
        let err = match_tweet(&store, &tweet).unwrap_err();
        assert!(err.is_validation());
    }
}
