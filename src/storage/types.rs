//! Core data types for the plant measurement store
//!
//! - `SeriesId`: derived key of one measurement series
//! - `Descriptor`: the Metadata row describing a series
//! - `Record` / `NewRecord`: Data rows (stored / to be appended)
//! - `DateBound`: validated inclusive date filter
//! - `DuplicatePolicy`: how repeated timestamps inside one series are reduced

use super::error::{StoreError, StoreResult};
use super::identifier;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format of every timestamp stored in the `Data.date` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of bare date bounds and descriptor validity dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> StoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| StoreError::Corruption(format!("invalid timestamp '{}': {}", s, e)))
}

/// Render a timestamp in the stored format
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter writing timestamps as `YYYY-MM-DD HH:MM:SS`
pub mod timestamp_serde {
    use super::{format_timestamp, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Unique key of a measurement series (64 lowercase hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    /// Wrap an already-derived id without validation
    pub(crate) fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    /// Validate an id that arrived from outside the store
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let valid = raw.len() == 64
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(StoreError::InvalidArgument(format!(
                "'{}' is not a series id",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SeriesId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Nominal sampling interval of a series, e.g. 15 "min"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterSpec {
    pub size: i64,
    pub unit: String,
}

impl RasterSpec {
    pub fn new(size: i64, unit: impl Into<String>) -> Self {
        Self {
            size,
            unit: unit.into(),
        }
    }
}

impl Default for RasterSpec {
    fn default() -> Self {
        Self::new(15, "min")
    }
}

/// One row of the Metadata relation
///
/// `series_id` is always derived from the six identifying fields; use
/// [`Descriptor::new`] and the builder methods to construct one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub series_id: SeriesId,
    /// Physical measurement point
    pub msr: String,
    /// Attribute of the point (setpoint, actual value, ...)
    pub msr_attribute: String,
    pub object_id: String,
    pub object_type: Option<String>,
    pub cfg: Option<String>,
    pub device: Option<String>,
    pub number: Option<String>,
    pub object_description: Option<String>,
    pub object_name: Option<String>,
    pub unit: Option<String>,
    /// Start of the validity window (ISO date)
    pub start_date: String,
    /// End of the validity window (ISO date)
    pub end_date: String,
    pub raster_size: i64,
    pub raster_unit: String,
    pub scale: i64,
}

impl Descriptor {
    /// Create a descriptor with its identifying fields; the id is derived here
    pub fn new(
        msr: impl Into<String>,
        msr_attribute: impl Into<String>,
        object_id: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
        raster: RasterSpec,
    ) -> Self {
        let msr = msr.into();
        let msr_attribute = msr_attribute.into();
        let start_date = start_date.into();
        let end_date = end_date.into();
        let series_id = identifier::derive(
            &msr,
            &msr_attribute,
            &start_date,
            &end_date,
            raster.size,
            &raster.unit,
        );

        Self {
            series_id,
            msr,
            msr_attribute,
            object_id: object_id.into(),
            object_type: None,
            cfg: None,
            device: None,
            number: None,
            object_description: None,
            object_name: None,
            unit: None,
            start_date,
            end_date,
            raster_size: raster.size,
            raster_unit: raster.unit,
            scale: 1,
        }
    }

    /// Builder method: set object type
    pub fn object_type(mut self, v: impl Into<String>) -> Self {
        self.object_type = Some(v.into());
        self
    }

    /// Builder method: set configuration tag
    pub fn cfg(mut self, v: impl Into<String>) -> Self {
        self.cfg = Some(v.into());
        self
    }

    /// Builder method: set device
    pub fn device(mut self, v: impl Into<String>) -> Self {
        self.device = Some(v.into());
        self
    }

    /// Builder method: set number
    pub fn number(mut self, v: impl Into<String>) -> Self {
        self.number = Some(v.into());
        self
    }

    /// Builder method: set object description
    pub fn object_description(mut self, v: impl Into<String>) -> Self {
        self.object_description = Some(v.into());
        self
    }

    /// Builder method: set object name
    pub fn object_name(mut self, v: impl Into<String>) -> Self {
        self.object_name = Some(v.into());
        self
    }

    /// Builder method: set unit
    pub fn unit(mut self, v: impl Into<String>) -> Self {
        self.unit = Some(v.into());
        self
    }

    /// Builder method: set scale
    pub fn scale(mut self, scale: i64) -> Self {
        self.scale = scale;
        self
    }

    pub fn raster(&self) -> RasterSpec {
        RasterSpec::new(self.raster_size, self.raster_unit.clone())
    }

    /// Recompute the id from the identifying fields
    pub fn derived_id(&self) -> SeriesId {
        identifier::derive(
            &self.msr,
            &self.msr_attribute,
            &self.start_date,
            &self.end_date,
            self.raster_size,
            &self.raster_unit,
        )
    }

    /// Human-readable one-line label used by selection lists
    pub fn label(&self) -> String {
        format!(
            "{} - {} ({} | {} - {} | {}.{})",
            self.object_description.as_deref().unwrap_or(""),
            self.object_name.as_deref().unwrap_or(""),
            self.unit.as_deref().unwrap_or(""),
            self.start_date,
            self.end_date,
            self.msr,
            self.msr_attribute
        )
    }
}

/// One stored row of the Data relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned surrogate key; higher ids were written later
    pub data_id: i64,
    pub series_id: SeriesId,
    #[serde(with = "timestamp_serde")]
    pub date: NaiveDateTime,
    pub mean: Option<f64>,
    pub status: Option<String>,
}

/// A Data row before the store assigns it a `data_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(with = "timestamp_serde")]
    pub date: NaiveDateTime,
    pub mean: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewRecord {
    pub fn new(date: NaiveDateTime, mean: f64) -> Self {
        Self {
            date,
            mean: Some(mean),
            status: None,
        }
    }

    /// A record with no value, e.g. a gap reported as "MISSING"
    pub fn missing(date: NaiveDateTime) -> Self {
        Self {
            date,
            mean: None,
            status: Some("MISSING".to_string()),
        }
    }

    /// Builder method: set quality status
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Inclusive date filter, either a bare date or a full timestamp
///
/// Comparison is textual against the stored `YYYY-MM-DD HH:MM:SS` form, so a
/// bare end date `2023-03-01` admits nothing from March 1st itself while a
/// bare start date admits all of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBound {
    text: String,
}

impl DateBound {
    /// Validate a bound; accepts `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let raw = raw.trim();
        let ok = (raw.len() == 10 && NaiveDate::parse_from_str(raw, DATE_FORMAT).is_ok())
            || (raw.len() == 19 && NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).is_ok());
        if ok {
            Ok(Self {
                text: raw.to_string(),
            })
        } else {
            Err(StoreError::InvalidArgument(format!(
                "malformed date bound '{}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                raw
            )))
        }
    }

    /// Parse an optional bound, treating blank input as unbounded
    pub fn parse_opt(raw: Option<&str>) -> StoreResult<Option<Self>> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True if `ts` is at or after this bound
    pub fn admits_from(&self, ts: &NaiveDateTime) -> bool {
        format_timestamp(ts).as_str() >= self.text.as_str()
    }

    /// True if `ts` is at or before this bound
    pub fn admits_until(&self, ts: &NaiveDateTime) -> bool {
        format_timestamp(ts).as_str() <= self.text.as_str()
    }
}

/// Check that a start bound does not lie after an end bound
pub fn validate_window(start: Option<&DateBound>, end: Option<&DateBound>) -> StoreResult<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if s.as_str() > e.as_str() {
            return Err(StoreError::InvalidArgument(format!(
                "start {} is after end {}",
                s.as_str(),
                e.as_str()
            )));
        }
    }
    Ok(())
}

/// How records sharing one timestamp within a series are reduced to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the value written last (highest `data_id`)
    #[default]
    Last,
    /// Average the non-missing values
    Mean,
    /// Fail with `DuplicateTimestamp`
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "mean" => Ok(Self::Mean),
            "reject" => Ok(Self::Reject),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown duplicate policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Last => write!(f, "last"),
            Self::Mean => write!(f, "mean"),
            Self::Reject => write!(f, "reject"),
        }
    }
}
