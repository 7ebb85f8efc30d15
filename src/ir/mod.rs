//! Intermediate Representation (IR) for resolver requests.
//!
//! The IR provides a serializable, transportable format for every request
//! the engine executes. This enables:
//! - Network transport between clients and servers
//! - Request logging and replay
//! - Debugging and inspection

mod operations;
mod serialization;
pub(crate) mod validation;

pub use operations::{
    InspectionBatch, InspectionLookup, Request, ResolvePayload, ResolverIR, RestaurantLookup,
};

pub use serialization::{from_json, to_json_pretty};
pub use validation::{MAX_BATCH_RECORDS, MAX_BLOCKS, MAX_TEXT_LEN};
