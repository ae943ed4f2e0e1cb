//! Multi-series alignment
//!
//! - **table**: `WideTable` and the pairwise outer join it is folded from
//! - **aligner**: reads series from the store and aligns them
//! - **reshape**: hour-by-day pivot grid and hourly profile of one series
//! - **fit**: least-squares line between two aligned columns
//!
//! # Pipeline
//!
//! ```text
//! [id_0, id_1, ...] → query each → reduce duplicates → fold outer joins → WideTable
//! ```

pub mod aligner;
pub mod fit;
pub mod reshape;
pub mod table;

pub use aligner::{column_name, AlignedDescriptor, Aligner, Alignment};
pub use fit::{linear_fit, LinearFit};
pub use reshape::{hourly_profile, PivotGrid, ProfilePoint};
pub use table::{Column, SeriesColumn, WideTable};
