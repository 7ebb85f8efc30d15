//! Restaurant records and identity.
//!
//! A restaurant row is either raw (`resolved == false`, produced by ingestion)
//! or resolved (a synthesized composite, or a raw row that has been through a
//! resolution pass). Rows are never deleted; provenance lives in link records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matching::normalize_text;

/// Number of leading postal-code characters used as the candidate key.
pub const POSTAL_PREFIX_LEN: usize = 4;

/// First character of the lowercased name, if any.
#[must_use]
pub fn name_initial(name: &str) -> Option<char> {
    name.chars().next().and_then(|c| c.to_lowercase().next())
}

/// Store-assigned restaurant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(i64);

impl RestaurantId {
    /// Wraps a raw store id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw store id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RestaurantId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Restaurant attributes without a store identity.
///
/// Used both for ingestion (raw rows) and for composite synthesis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub resolved: bool,
}

impl NewRestaurant {
    /// Creates a raw (unresolved) restaurant with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Normalized name used for exact n-gram matching.
    #[must_use]
    pub fn name_key(&self) -> String {
        normalize_text(&self.name)
    }

    /// First character of the lowercased name, if any.
    #[must_use]
    pub fn initial(&self) -> Option<char> {
        name_initial(&self.name)
    }
}

/// A stored restaurant row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub facility_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub resolved: bool,
}

impl Restaurant {
    /// Materializes a stored row from its attributes and assigned id.
    #[must_use]
    pub fn from_new(id: RestaurantId, new: NewRestaurant) -> Self {
        Self {
            id,
            name: new.name,
            facility_type: new.facility_type,
            address: new.address,
            city: new.city,
            state: new.state,
            zip: new.zip,
            latitude: new.latitude,
            longitude: new.longitude,
            resolved: new.resolved,
        }
    }

    /// Normalized name used for exact n-gram matching.
    #[must_use]
    pub fn name_key(&self) -> String {
        normalize_text(&self.name)
    }

    /// First character of the lowercased name, if any.
    #[must_use]
    pub fn initial(&self) -> Option<char> {
        name_initial(&self.name)
    }

    /// Leading postal-code characters used to narrow candidate comparisons.
    ///
    /// Shorter codes are used whole. Returns `None` when the row has no
    /// (non-blank) postal code.
    #[must_use]
    pub fn postal_prefix(&self) -> Option<&str> {
        let zip = self.zip.as_deref()?.trim();
        if zip.is_empty() {
            return None;
        }
        let end = zip
            .char_indices()
            .nth(POSTAL_PREFIX_LEN)
            .map_or(zip.len(), |(idx, _)| idx);
        Some(&zip[..end])
    }

    /// Returns true if both coordinates fall inside `bounds` (inclusive).
    #[must_use]
    pub fn within(&self, bounds: &GeoBounds) -> bool {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => bounds.contains(lat, lon),
            _ => false,
        }
    }
}

/// Inclusive latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Box of `±lat_delta` / `±lon_delta` degrees around a point.
    #[must_use]
    pub fn around(lat: f64, lon: f64, lat_delta: f64, lon_delta: f64) -> Self {
        Self {
            min_lat: lat - lat_delta,
            max_lat: lat + lat_delta,
            min_lon: lon - lon_delta,
            max_lon: lon + lon_delta,
        }
    }

    /// Inclusive containment check.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}
