//! IR validation.
//!
//! Deserialized requests are validated before execution; server and embedded
//! callers must not trust their inputs.

use crate::error::ValidationError;
use crate::ir::operations::{InspectionBatch, InspectionLookup, Request, ResolvePayload};

/// Conservative upper bound for free-form text fields.
pub const MAX_TEXT_LEN: usize = 16 * 1024;

/// Upper bound on requested blocks; larger values all yield one block per symbol.
pub const MAX_BLOCKS: usize = 1024;

/// Upper bound on records in one ingestion batch.
pub const MAX_BATCH_RECORDS: usize = 10_000;

/// Validate a non-empty trimmed string field.
pub(crate) fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if v.len() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

pub(crate) fn validate_optional_text(
    field: &'static str,
    value: &Option<String>,
) -> Result<(), ValidationError> {
    if let Some(v) = value {
        if v.trim().len() > MAX_TEXT_LEN {
            return Err(ValidationError::FieldTooLong {
                field: field.to_string(),
                max_length: MAX_TEXT_LEN,
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(), ValidationError> {
    for (field, value, bound) in [("latitude", latitude, 90.0), ("longitude", longitude, 180.0)] {
        if let Some(v) = value {
            if !v.is_finite() || v.abs() > bound {
                return Err(ValidationError::CoordinateOutOfRange {
                    field: field.to_string(),
                    value: v,
                });
            }
        }
    }
    Ok(())
}

impl ResolvePayload {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.blocks {
            Some(0) => Err(ValidationError::InvalidBlockCount { value: 0 }),
            Some(n) if n > MAX_BLOCKS => Err(ValidationError::InvalidField {
                field: "blocks".to_string(),
                reason: format!("must be at most {MAX_BLOCKS}"),
            }),
            _ => Ok(()),
        }
    }
}

impl InspectionLookup {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_empty("inspection_id", &self.inspection_id)
    }
}

impl InspectionBatch {
    /// Validates the batch and every record in it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.records.is_empty() {
            return Err(ValidationError::MissingField {
                field: "records".to_string(),
            });
        }
        if self.records.len() > MAX_BATCH_RECORDS {
            return Err(ValidationError::InvalidField {
                field: "records".to_string(),
                reason: format!("must hold at most {MAX_BATCH_RECORDS} records"),
            });
        }
        for (index, record) in self.records.iter().enumerate() {
            record.validate().map_err(|err| ValidationError::InvalidField {
                field: format!("records[{index}]"),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}

impl Request {
    /// Validate the request payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Resolve(p) => p.validate(),
            Self::LoadInspection(p) => p.validate(),
            Self::LoadInspections(b) => b.validate(),
            Self::MatchTweet(t) => t.validate(),
            Self::RestaurantByInspection(p) | Self::LinkedByInspection(p) => p.validate(),
            Self::FindRestaurant(_)
            | Self::PrimaryOf(_)
            | Self::TweetsForRestaurant(_)
            | Self::CountInspections => Ok(()),
        }
    }
}
