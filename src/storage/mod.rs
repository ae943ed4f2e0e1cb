//! plantdb measurement store
//!
//! This module provides the persistent side of the system:
//!
//! - **identifier**: SHA-256 series key derivation
//! - **types**: Descriptor, Record, date bounds, duplicate policy
//! - **database**: per-operation SQLite connections and schema management
//! - **catalog**: Metadata CRUD, including the transactional compound delete
//! - **measurements**: Data CRUD with parameter-bound date filters
//! - **cache**: explicit, caller-owned descriptor cache
//! - **locks**: per-series write serialization
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use plantdb::storage::{Database, Descriptor, MeasurementStore, MetadataCatalog, RasterSpec};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./plant.db")?;
//!     let catalog = MetadataCatalog::new(db.clone());
//!     let store = MeasurementStore::new(db);
//!     catalog.ensure_schema()?;
//!
//!     let d = Descriptor::new("10BGA.80.01", "ISTWERT", "obj-1", "2023-01-01", "2024-01-01", RasterSpec::default())
//!         .unit("degC");
//!     catalog.insert(&d)?;
//!
//!     let records = store.query_window(&d.series_id, Some("2023-01-01"), Some("2023-03-01"))?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod database;
pub mod error;
pub mod identifier;
pub mod locks;
pub mod measurements;
pub mod types;

pub use cache::CatalogCache;
pub use catalog::MetadataCatalog;
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use identifier::derive;
pub use locks::SeriesLocks;
pub use measurements::MeasurementStore;
pub use types::{
    format_timestamp, parse_timestamp, DateBound, Descriptor, DuplicatePolicy, NewRecord, RasterSpec, Record,
    SeriesId, TIMESTAMP_FORMAT,
};
