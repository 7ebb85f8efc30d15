//! Inspection records and the ingestion payload.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ir::validation::{validate_coordinates, validate_non_empty, validate_optional_text};
use crate::lenient;
use crate::restaurant::{NewRestaurant, RestaurantId};

/// Feed-assigned inspection identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectionId(String);

impl InspectionId {
    /// Wraps a feed identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InspectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InspectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A stored inspection.
///
/// The resolver only ever rewrites `restaurant_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: InspectionId,
    pub risk: Option<String>,
    pub date: Option<NaiveDate>,
    pub inspection_type: Option<String>,
    pub results: Option<String>,
    #[serde(default)]
    pub violations: Vec<String>,
    pub restaurant_id: RestaurantId,
}

/// One flat feed record: an inspection plus the restaurant it was made at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionPayload {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub inspection_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub facility_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub zip: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub risk: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub inspection_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub results: Option<String>,
    #[serde(default, deserialize_with = "lenient::violations")]
    pub violations: Vec<String>,
}

impl InspectionPayload {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(id) = &self.inspection_id else {
            return Err(ValidationError::MissingField {
                field: "inspection_id".to_string(),
            });
        };
        validate_non_empty("inspection_id", id)?;
        let Some(name) = &self.name else {
            return Err(ValidationError::MissingField {
                field: "name".to_string(),
            });
        };
        validate_non_empty("name", name)?;
        for (field, value) in [
            ("facility_type", &self.facility_type),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("risk", &self.risk),
            ("inspection_type", &self.inspection_type),
            ("results", &self.results),
        ] {
            validate_optional_text(field, value)?;
        }
        validate_coordinates(self.latitude, self.longitude)?;
        Ok(())
    }

    /// Inspection id, if present.
    #[must_use]
    pub fn id(&self) -> Option<InspectionId> {
        self.inspection_id.as_deref().map(InspectionId::from)
    }

    /// The raw restaurant described by this record.
    #[must_use]
    pub fn restaurant(&self) -> NewRestaurant {
        NewRestaurant {
            name: self.name.clone().unwrap_or_default(),
            facility_type: self.facility_type.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            resolved: false,
        }
    }

    /// The inspection row, attached to `restaurant_id`.
    #[must_use]
    pub fn inspection(&self, restaurant_id: RestaurantId) -> Inspection {
        Inspection {
            id: InspectionId::new(self.inspection_id.clone().unwrap_or_default()),
            risk: self.risk.clone(),
            date: self.date,
            inspection_type: self.inspection_type.clone(),
            results: self.results.clone(),
            violations: self.violations.clone(),
            restaurant_id,
        }
    }
}
