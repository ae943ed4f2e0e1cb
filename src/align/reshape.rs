//! Reshaping a single series for heatmaps and daily profiles
//!
//! Both reshapes key records by fractional hour of day (`hour + minute/60`).
//! Seconds are ignored, so two records in the same minute of the same day
//! land in one pivot cell and are reduced by the duplicate policy.

use super::table::reduce_duplicates;
use crate::storage::{DuplicatePolicy, Record, StoreResult};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Minute of the day, the integer form of a fractional hour
fn minute_of_day(ts: &NaiveDateTime) -> u32 {
    ts.hour() * 60 + ts.minute()
}

fn fractional_hour(minute: u32) -> f64 {
    minute as f64 / 60.0
}

/// Values of one series laid out as hour-of-day rows by calendar-day columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotGrid {
    /// Row labels, ascending
    pub hours: Vec<f64>,
    /// Column labels, ascending
    pub days: Vec<NaiveDate>,
    /// `cells[row][col]`, `None` where the series has no value
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PivotGrid {
    /// Build the grid from chronologically sorted records
    pub fn from_records(records: &[Record], policy: DuplicatePolicy) -> StoreResult<Self> {
        let mut groups: BTreeMap<(u32, NaiveDate), Vec<&Record>> = BTreeMap::new();
        for record in records {
            groups
                .entry((minute_of_day(&record.date), record.date.date()))
                .or_default()
                .push(record);
        }

        let minutes: Vec<u32> = groups
            .keys()
            .map(|(m, _)| *m)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let days: Vec<NaiveDate> = groups
            .keys()
            .map(|(_, d)| *d)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells = vec![vec![None; days.len()]; minutes.len()];
        for ((minute, day), group) in &groups {
            let value = reduce_duplicates(group, policy)?;
            // Both lookups succeed: the label sets were built from these keys
            if let (Ok(row), Ok(col)) = (minutes.binary_search(minute), days.binary_search(day)) {
                cells[row][col] = value;
            }
        }

        Ok(Self {
            hours: minutes.into_iter().map(fractional_hour).collect(),
            days,
            cells,
        })
    }

    /// Value at a given fractional hour and day
    pub fn get(&self, hour: f64, day: NaiveDate) -> Option<f64> {
        let row = self.hours.iter().position(|h| (h - hour).abs() < 1e-9)?;
        let col = self.days.iter().position(|d| *d == day)?;
        self.cells[row][col]
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}

/// Average value of a series at one time of day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePoint {
    /// Fractional hour of day
    pub hour: f64,
    /// Mean over all days; `None` if every record at this hour is missing
    pub mean: Option<f64>,
    /// Number of non-missing values averaged
    pub count: usize,
}

/// Typical daily curve: records grouped by hour of day across all dates
pub fn hourly_profile(records: &[Record]) -> Vec<ProfilePoint> {
    let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(minute_of_day(&record.date)).or_insert((0.0, 0));
        if let Some(v) = record.mean {
            entry.0 += v;
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(minute, (sum, count))| ProfilePoint {
            hour: fractional_hour(minute),
            mean: if count == 0 { None } else { Some(sum / count as f64) },
            count,
        })
        .collect()
}
