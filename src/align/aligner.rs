//! Aligner
//!
//! Reads series from the store and puts them on one time axis. Column names
//! and descriptor order follow input order exactly, whatever order the series
//! are stored in.

use super::reshape::{hourly_profile, PivotGrid, ProfilePoint};
use super::table::{SeriesColumn, WideTable};
use crate::storage::{
    DateBound, Descriptor, DuplicatePolicy, MeasurementStore, MetadataCatalog, SeriesId, StoreError, StoreResult,
};
use serde::Serialize;
use std::collections::HashSet;

/// Descriptor of one aligned series, tagged with its column name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedDescriptor {
    /// Column of the wide table holding this series
    pub name: String,
    #[serde(flatten)]
    pub descriptor: Descriptor,
}

/// Result of aligning several series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub table: WideTable,
    pub descriptors: Vec<AlignedDescriptor>,
}

/// Synthetic column name of input position `i`
pub fn column_name(i: usize) -> String {
    format!("m_{}", i)
}

/// Joins and reshapes series read from the store
#[derive(Debug, Clone)]
pub struct Aligner {
    catalog: MetadataCatalog,
    store: MeasurementStore,
    policy: DuplicatePolicy,
}

impl Aligner {
    pub fn new(catalog: MetadataCatalog, store: MeasurementStore) -> Self {
        Self {
            catalog,
            store,
            policy: DuplicatePolicy::default(),
        }
    }

    /// Builder method: set how duplicate timestamps are reduced
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    fn descriptor(&self, id: &SeriesId) -> StoreResult<Descriptor> {
        self.catalog
            .find_by_series_id(id)?
            .ok_or_else(|| StoreError::NotFound(format!("series {}", id)))
    }

    /// Outer-join `series` onto one axis, naming columns `m_0`, `m_1`, ...
    pub fn align(
        &self,
        series: &[SeriesId],
        start: Option<&DateBound>,
        end: Option<&DateBound>,
    ) -> StoreResult<Alignment> {
        if series.is_empty() {
            return Err(StoreError::InvalidArgument("series list is empty".to_string()));
        }

        let mut named = Vec::with_capacity(series.len());
        for (i, id) in series.iter().enumerate() {
            named.push((column_name(i), self.descriptor(id)?));
        }
        self.join(named, start, end)
    }

    /// [`align`](Self::align) with unvalidated bound text
    pub fn align_window(&self, series: &[SeriesId], start: Option<&str>, end: Option<&str>) -> StoreResult<Alignment> {
        let start = DateBound::parse_opt(start)?;
        let end = DateBound::parse_opt(end)?;
        self.align(series, start.as_ref(), end.as_ref())
    }

    /// Align series looked up by measurement point, naming each column after its `msr`
    ///
    /// Every `msr` must resolve to exactly one descriptor.
    pub fn align_measurements(
        &self,
        msrs: &[&str],
        start: Option<&DateBound>,
        end: Option<&DateBound>,
    ) -> StoreResult<Alignment> {
        if msrs.is_empty() {
            return Err(StoreError::InvalidArgument("measurement list is empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut named = Vec::with_capacity(msrs.len());
        for msr in msrs {
            if !seen.insert(*msr) {
                return Err(StoreError::InvalidArgument(format!(
                    "measurement '{}' listed twice",
                    msr
                )));
            }
            named.push((msr.to_string(), self.catalog.find_by_measurement(msr)?));
        }
        self.join(named, start, end)
    }

    fn join(
        &self,
        named: Vec<(String, Descriptor)>,
        start: Option<&DateBound>,
        end: Option<&DateBound>,
    ) -> StoreResult<Alignment> {
        let mut columns = Vec::with_capacity(named.len());
        let mut descriptors = Vec::with_capacity(named.len());

        for (name, descriptor) in named {
            let records = self.store.query(&descriptor.series_id, start, end)?;
            columns.push(SeriesColumn::from_records(name.clone(), &records, self.policy)?);
            descriptors.push(AlignedDescriptor { name, descriptor });
        }

        let table = WideTable::align(columns);
        tracing::debug!(
            series = descriptors.len(),
            rows = table.len(),
            "Aligned series"
        );

        Ok(Alignment { table, descriptors })
    }

    /// Hour-of-day by calendar-day grid of one series
    pub fn pivot_hour_by_day(
        &self,
        series: &SeriesId,
        start: Option<&DateBound>,
        end: Option<&DateBound>,
    ) -> StoreResult<PivotGrid> {
        self.descriptor(series)?;
        let records = self.store.query(series, start, end)?;
        PivotGrid::from_records(&records, self.policy)
    }

    /// Average value per time of day, across all days in the window
    pub fn hourly_profile(
        &self,
        series: &SeriesId,
        start: Option<&DateBound>,
        end: Option<&DateBound>,
    ) -> StoreResult<Vec<ProfilePoint>> {
        self.descriptor(series)?;
        let records = self.store.query(series, start, end)?;
        Ok(hourly_profile(&records))
    }
}
