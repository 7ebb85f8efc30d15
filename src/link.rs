//! Provenance links between composites and the rows they absorbed.

use serde::{Deserialize, Serialize};

use crate::restaurant::RestaurantId;

/// Records that `original` was absorbed into the composite `primary`.
///
/// An original id appears in at most one link; `primary` is always a
/// resolved composite row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    pub primary: RestaurantId,
    pub original: RestaurantId,
}

impl LinkRecord {
    /// Creates a link from `original` to `primary`.
    #[must_use]
    pub const fn new(primary: RestaurantId, original: RestaurantId) -> Self {
        Self { primary, original }
    }
}
