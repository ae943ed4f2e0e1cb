//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use crate::align::{AlignedDescriptor, LinearFit, WideTable};
use crate::expression::ExpressionOutcome;
use crate::storage::{Descriptor, Record, SeriesId};
use serde::{Deserialize, Serialize};

// ============================================
// SERIES DTOs
// ============================================

/// `?start=&end=` window on a series; each bound is `YYYY-MM-DD` or a full timestamp
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Descriptor with its selection-list label
#[derive(Debug, Serialize)]
pub struct SeriesSummary {
    #[serde(flatten)]
    pub descriptor: Descriptor,
    pub label: String,
}

impl From<Descriptor> for SeriesSummary {
    fn from(descriptor: Descriptor) -> Self {
        let label = descriptor.label();
        Self { descriptor, label }
    }
}

/// List of series descriptors
#[derive(Debug, Serialize)]
pub struct SeriesListResponse {
    pub total: usize,
    pub series: Vec<SeriesSummary>,
}

/// Result of a compound delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub series_id: SeriesId,
    pub deleted: bool,
}

/// Records of one series within a window
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub series_id: SeriesId,
    pub total: usize,
    pub records: Vec<Record>,
}

// ============================================
// ANALYSIS DTOs
// ============================================

/// Output encoding of an aligned table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Align request
#[derive(Debug, Deserialize)]
pub struct AlignRequest {
    /// Series ids in column order
    pub series: Vec<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
}

/// Derived-column request
///
/// The series are aligned over `start..end`, cut down to
/// `preview_start..preview_end`, and the expression is evaluated over the
/// remaining rows.
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub series: Vec<String>,
    pub expression: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub preview_start: Option<String>,
    #[serde(default)]
    pub preview_end: Option<String>,
}

/// Derived-column response; `result` carries either the values or the error text
#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub table: WideTable,
    pub descriptors: Vec<AlignedDescriptor>,
    pub result: ExpressionOutcome,
}

/// Scatter request: two series plotted against each other
#[derive(Debug, Deserialize)]
pub struct ScatterRequest {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Scatter response
#[derive(Debug, Serialize)]
pub struct ScatterResponse {
    pub table: WideTable,
    pub descriptors: Vec<AlignedDescriptor>,
    /// Absent when fewer than two rows have both values
    pub fit: Option<LinearFit>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::descriptor;

    #[test]
    fn test_series_summary_flattens_descriptor() {
        let d = descriptor("10BGA.80.01", "ISTWERT");
        let json = serde_json::to_value(SeriesSummary::from(d.clone())).unwrap();
        assert_eq!(json["msr"], "10BGA.80.01");
        assert_eq!(json["series_id"], d.series_id.as_str());
        assert_eq!(json["label"], d.label());
    }

    #[test]
    fn test_align_request_defaults() {
        let req: AlignRequest = serde_json::from_str(r#"{"series": ["a"]}"#).unwrap();
        assert_eq!(req.format, OutputFormat::Json);
        assert!(req.start.is_none());

        let req: AlignRequest = serde_json::from_str(r#"{"series": [], "format": "csv"}"#).unwrap();
        assert_eq!(req.format, OutputFormat::Csv);
    }
}
