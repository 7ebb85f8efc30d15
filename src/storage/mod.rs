//! Storage traits and backends.
//!
//! The traits define the abstract interface; `memory` is the reference
//! backend and `sqlite` the persistent one.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use memory::InMemoryStores;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteStores};
pub use traits::{
    GroupCommit, IngestBatch, InitialSelector, InspectionStore, LinkStore, RecordStore,
    RestaurantRef, RestaurantStore, StagedInspection, StorageError, TweetMatchStore,
};
