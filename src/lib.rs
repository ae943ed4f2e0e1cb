//! # plantdb
//!
//! Catalog and analysis service for industrial plant sensor time-series.
//! Each series is identified by a hash of its defining attributes, described
//! in a metadata catalog, and stored as timestamped records in SQLite.
//!
//! ## Features
//!
//! - **Deterministic series ids**: SHA-256 over the six defining fields
//! - **Atomic deletes**: descriptor and records removed in one transaction
//! - **Alignment**: outer-join any number of series onto one time axis
//! - **Derived columns**: restricted arithmetic over aligned series
//! - **Reshaping**: hour-by-day heatmap grids and hourly profiles
//!
//! ## Modules
//!
//! - [`storage`]: Series ids, metadata catalog, measurement store
//! - [`align`]: Multi-series alignment, pivots, linear fit
//! - [`expression`]: Derived-column expression parser and evaluator
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plantdb::align::Aligner;
//! use plantdb::expression::evaluate;
//! use plantdb::storage::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("plant.db")?;
//!     db.ensure_schema()?;
//!
//!     let catalog = MetadataCatalog::new(db.clone());
//!     let store = MeasurementStore::new(db);
//!
//!     // Describe a series; the id is derived from the defining fields
//!     let power = Descriptor::new("10BGA.80.01", "ISTWERT", "obj-1", "2023-01-01", "2023-12-31", RasterSpec::default())
//!         .unit("kW");
//!     catalog.insert(&power)?;
//!
//!     store.append(&power.series_id, &[NewRecord::new(parse_timestamp("2023-01-01 00:00:00")?, 41.5)])?;
//!
//!     // Align and derive
//!     let aligner = Aligner::new(catalog, store);
//!     let alignment = aligner.align(&[power.series_id.clone()], None, None)?;
//!     let doubled = evaluate("m_0 * 2", &alignment.table)?;
//!
//!     println!("{:?}", doubled.values);
//!     Ok(())
//! }
//! ```

pub mod align;
pub mod api;
pub mod config;
pub mod expression;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    CatalogCache, Database, DateBound, Descriptor, DuplicatePolicy, MeasurementStore, MetadataCatalog, NewRecord,
    RasterSpec, Record, SeriesId, StoreError, StoreResult,
};

pub use align::{Aligner, Alignment, LinearFit, PivotGrid, ProfilePoint, WideTable};

pub use expression::{evaluate, evaluate_outcome, DerivedColumn, ExpressionError, ExpressionOutcome};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, DatabaseConfig, LoggingConfig};
