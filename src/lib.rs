//! # restaurant-resolver
//!
//! Entity resolution for restaurant inspection feeds. Raw restaurant rows
//! arrive one per inspection record and are deduplicated into composite
//! records that keep provenance links back to every row they absorbed.
//!
//! ## Core Concepts
//!
//! - **Restaurant**: a raw row from the feed, or a composite built from a group
//! - **Block**: a snapshot of the rows whose names share an initial range
//! - **Group**: an anchor row plus every candidate that passed the similarity gates
//! - **Link**: `(primary, original)` provenance of an absorbed row
//! - **Tweet match**: a tweet associated with restaurants by name or location
//!
//! ## Usage
//!
//! ```rust
//! use restaurant_resolver::{InspectionPayload, ResolvePayload, ResolverEngine};
//!
//! let engine = ResolverEngine::in_memory();
//! for (id, name) in [("1", "Kim's Diner"), ("2", "Kims Diner")] {
//!     engine
//!         .load_inspection(&InspectionPayload {
//!             inspection_id: Some(id.to_string()),
//!             name: Some(name.to_string()),
//!             city: Some("Chicago".to_string()),
//!             state: Some("IL".to_string()),
//!             zip: Some("60601".to_string()),
//!             ..InspectionPayload::default()
//!         })
//!         .unwrap();
//! }
//!
//! let report = engine.resolve(ResolvePayload::blocked(4)).unwrap();
//! assert_eq!(report.merged.len(), 1);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core records
pub mod config;
pub mod error;
pub mod inspection;
mod lenient;
pub mod link;
pub mod restaurant;
pub mod tweet;

// Algorithms
pub mod matching;
pub mod resolution;

// IR, storage and execution
pub mod engine;
pub mod ir;
pub mod storage;

/// gRPC transport (requires `transport-grpc` feature).
#[cfg(feature = "transport-grpc")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use config::ResolverConfig;
pub use engine::{
    EngineResponse, LinkedRestaurants, LoadOutcome, PassReport, ResolverEngine, RestaurantDetail,
};
pub use error::{ExecutionError, ResolverError, ResolverResult, ValidationError};
pub use inspection::{Inspection, InspectionId, InspectionPayload};
pub use ir::{
    InspectionBatch, InspectionLookup, Request, ResolvePayload, ResolverIR, RestaurantLookup,
};
pub use link::LinkRecord;
pub use matching::TweetMatchOutcome;
pub use restaurant::{GeoBounds, NewRestaurant, Restaurant, RestaurantId};
pub use storage::{InMemoryStores, RecordStore, StorageError};
#[cfg(feature = "sqlite")]
pub use storage::{SqliteConfig, SqliteStores};
pub use tweet::{MatchReason, Tweet, TweetKey, TweetMatch};
