//! Tweets and their restaurant associations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ir::validation::{validate_coordinates, validate_non_empty};
use crate::lenient;
use crate::restaurant::RestaurantId;

/// Caller-supplied tweet key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweetKey(String);

impl TweetKey {
    /// Wraps a tweet key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TweetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incoming tweet: `{text, lat, long, key}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub key: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub lat: Option<f64>,
    #[serde(default, rename = "long", deserialize_with = "lenient::opt_f64")]
    pub lon: Option<f64>,
}

impl Tweet {
    /// Creates a tweet without coordinates.
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            text: Some(text.into()),
            lat: None,
            lon: None,
        }
    }

    /// Attaches coordinates.
    #[must_use]
    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// Validates this tweet.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(key) = &self.key else {
            return Err(ValidationError::MissingField {
                field: "key".to_string(),
            });
        };
        validate_non_empty("key", key)?;
        if self.text.is_none() {
            return Err(ValidationError::MissingField {
                field: "text".to_string(),
            });
        }
        validate_coordinates(self.lat, self.lon)?;
        Ok(())
    }

    /// The tweet key, if present.
    #[must_use]
    pub fn tweet_key(&self) -> Option<TweetKey> {
        self.key.as_deref().map(TweetKey::new)
    }

    /// Both coordinates, when present.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

/// Why a tweet was associated with a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    /// The restaurant name appears as an n-gram of the tweet text.
    Name,
    /// The restaurant lies inside the tweet's bounding box.
    Geo,
    /// Both of the above.
    Both,
}

impl MatchReason {
    /// Stable storage tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Geo => "geo",
            Self::Both => "both",
        }
    }

    /// Parses a storage tag.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "name" => Some(Self::Name),
            "geo" => Some(Self::Geo),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Adds a geo hit to an existing reason.
    #[must_use]
    pub const fn with_geo(self) -> Self {
        match self {
            Self::Name | Self::Both => Self::Both,
            Self::Geo => Self::Geo,
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted tweet/restaurant association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TweetMatch {
    pub tweet_key: TweetKey,
    pub restaurant_id: RestaurantId,
    pub reason: MatchReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_decodes_long_field_and_string_coordinates() {
        let tweet: Tweet =
            serde_json::from_str(r#"{"key": "t1", "text": "hi", "lat": "41.88", "long": -87.63}"#)
                .unwrap();
        assert_eq!(tweet.coordinates(), Some((41.88, -87.63)));
        tweet.validate().unwrap();
    }

    #[test]
    fn tweet_without_text_is_rejected() {
        let tweet: Tweet = serde_json::from_str(r#"{"key": "t1", "lat": null, "long": null}"#).unwrap();
        assert!(matches!(
            tweet.validate(),
            Err(ValidationError::MissingField { ref field }) if field == "text"
        ));
    }

    #[test]
    fn tweet_without_key_is_rejected() {
        let tweet = Tweet {
            text: Some("hello".to_string()),
            ..Tweet::default()
        };
        assert!(matches!(
            tweet.validate(),
            Err(ValidationError::MissingField { ref field }) if field == "key"
        ));
    }

    #[test]
    fn match_reason_tags_round_trip_through_storage_form() {
        for reason in [MatchReason::Name, MatchReason::Geo, MatchReason::Both] {
            assert_eq!(MatchReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(MatchReason::parse("fuzzy"), None);
        assert_eq!(MatchReason::Name.with_geo(), MatchReason::Both);
    }
}
