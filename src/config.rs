//! Resolver configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Similarity threshold applied to every gated attribute.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Number of alphabet blocks used by a scaled (blocked) pass.
pub const DEFAULT_BLOCK_COUNT: usize = 4;

/// Configuration for resolution passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum similarity (τ) for state, city and name.
    pub threshold: f64,
    /// Requested block count for blocked passes.
    pub block_count: usize,
    /// Run blocked passes unless a request says otherwise.
    pub scaled: bool,
    /// Collect names starting outside `a-z0-9` into a trailing residual block.
    pub include_residual_block: bool,
    /// Worker threads computing block linkage. `1` keeps the pass on the caller thread.
    pub linkage_workers: usize,
    /// Maximum queued blocks per worker pool.
    pub queue_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            block_count: DEFAULT_BLOCK_COUNT,
            scaled: false,
            include_residual_block: true,
            linkage_workers: 1,
            queue_capacity: 64,
        }
    }
}

impl ResolverConfig {
    /// Upper bound on linkage workers.
    pub const MAX_WORKERS: usize = 64;

    /// Validates and returns the configuration.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ValidationError::ThresholdOutOfRange {
                value: self.threshold,
            });
        }
        if self.block_count == 0 {
            return Err(ValidationError::InvalidBlockCount {
                value: self.block_count,
            });
        }
        if self.linkage_workers == 0 || self.linkage_workers > Self::MAX_WORKERS {
            return Err(ValidationError::InvalidField {
                field: "linkage_workers".to_string(),
                reason: format!("must be between 1 and {}", Self::MAX_WORKERS),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidField {
                field: "queue_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    /// Sets the linkage worker count.
    #[must_use]
    pub fn with_linkage_workers(mut self, workers: usize) -> Self {
        self.linkage_workers = workers;
        self
    }

    /// Sets the default pass mode.
    #[must_use]
    pub fn scaled(mut self, scaled: bool) -> Self {
        self.scaled = scaled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ResolverConfig::default().validate().unwrap();
        assert!((config.threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.block_count, 4);
        assert!(!config.scaled);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let config = ResolverConfig {
            threshold: 1.2,
            ..ResolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ThresholdOutOfRange { .. })
        ));
    }

    #[test]
    fn zero_blocks_and_workers_are_rejected() {
        let config = ResolverConfig {
            block_count: 0,
            ..ResolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBlockCount { value: 0 })
        ));

        let config = ResolverConfig::default().with_linkage_workers(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ResolverConfig = serde_json::from_str(r#"{"scaled": true}"#).unwrap();
        assert!(config.scaled);
        assert_eq!(config.block_count, DEFAULT_BLOCK_COUNT);
    }
}
