//! Wide table: one row per timestamp, one column per aligned series
//!
//! Built by folding pairwise outer joins over an ordered list of series, so
//! column `i` always belongs to input position `i`.

use crate::storage::{format_timestamp, DateBound, DuplicatePolicy, Record, StoreError, StoreResult};
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::io::Write;

/// One named column of a wide table; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// A single series reduced to one value per timestamp, ready to be joined
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesColumn {
    pub name: String,
    /// Strictly ascending timestamps; `from_records` guarantees this for
    /// store output, and `outer_join` checks it in debug builds
    pub points: Vec<(NaiveDateTime, Option<f64>)>,
}

impl SeriesColumn {
    /// Reduce chronologically sorted records to one value per timestamp
    ///
    /// Records must be ordered by `(date, data_id)`, as the store returns them.
    pub fn from_records(
        name: impl Into<String>,
        records: &[Record],
        policy: DuplicatePolicy,
    ) -> StoreResult<Self> {
        let mut points: Vec<(NaiveDateTime, Option<f64>)> = Vec::with_capacity(records.len());
        let mut group: Vec<&Record> = Vec::new();

        for record in records {
            if let Some(first) = group.first() {
                if first.date != record.date {
                    points.push(reduce_group(&group, policy)?);
                    group.clear();
                }
            }
            group.push(record);
        }
        if !group.is_empty() {
            points.push(reduce_group(&group, policy)?);
        }

        Ok(Self {
            name: name.into(),
            points,
        })
    }
}

/// Collapse records sharing one timestamp according to `policy`
fn reduce_group(group: &[&Record], policy: DuplicatePolicy) -> StoreResult<(NaiveDateTime, Option<f64>)> {
    Ok((group[0].date, reduce_duplicates(group, policy)?))
}

/// Single value for a non-empty group of records that share one slot
///
/// The slot is a timestamp when aligning and a pivot cell when reshaping.
pub(crate) fn reduce_duplicates(group: &[&Record], policy: DuplicatePolicy) -> StoreResult<Option<f64>> {
    if let [only] = group {
        return Ok(only.mean);
    }

    match policy {
        DuplicatePolicy::Last => Ok(group.iter().max_by_key(|r| r.data_id).and_then(|r| r.mean)),
        DuplicatePolicy::Mean => Ok(mean_of(group.iter().map(|r| r.mean))),
        DuplicatePolicy::Reject => Err(StoreError::DuplicateTimestamp {
            series_id: group[0].series_id.to_string(),
            date: format_timestamp(&group[0].date),
        }),
    }
}

/// Average of the present values, `None` if there are none
pub(crate) fn mean_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values.flatten().fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn serialize_dates<S: Serializer>(dates: &[NaiveDateTime], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(dates.iter().map(format_timestamp))
}

/// Outer-joined table of several series on a shared timestamp axis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WideTable {
    #[serde(serialize_with = "serialize_dates")]
    dates: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl WideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold pairwise outer joins over `series`, in order
    pub fn align(series: impl IntoIterator<Item = SeriesColumn>) -> Self {
        series.into_iter().fold(Self::new(), Self::outer_join)
    }

    /// Outer-join one more series onto this table, appending it as the last column
    ///
    /// Timestamps present on only one side are kept; the other side's cells are
    /// `None`. The result's timestamp axis stays sorted.
    pub fn outer_join(self, series: SeriesColumn) -> Self {
        debug_assert!(
            series.points.windows(2).all(|w| w[0].0 < w[1].0),
            "series '{}' timestamps must be strictly ascending",
            series.name
        );
        let width = self.columns.len();
        let capacity = self.dates.len().max(series.points.len());

        let mut dates = Vec::with_capacity(capacity);
        let mut left: Vec<Vec<Option<f64>>> = (0..width).map(|_| Vec::with_capacity(capacity)).collect();
        let mut right = Vec::with_capacity(capacity);

        let mut i = 0;
        let mut j = 0;
        while i < self.dates.len() || j < series.points.len() {
            let order = match (self.dates.get(i), series.points.get(j)) {
                (Some(l), Some((r, _))) => l.cmp(r),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };

            match order {
                Ordering::Less => {
                    dates.push(self.dates[i]);
                    for (c, col) in left.iter_mut().enumerate() {
                        col.push(self.columns[c].values[i]);
                    }
                    right.push(None);
                    i += 1;
                }
                Ordering::Greater => {
                    dates.push(series.points[j].0);
                    for col in left.iter_mut() {
                        col.push(None);
                    }
                    right.push(series.points[j].1);
                    j += 1;
                }
                Ordering::Equal => {
                    dates.push(self.dates[i]);
                    for (c, col) in left.iter_mut().enumerate() {
                        col.push(self.columns[c].values[i]);
                    }
                    right.push(series.points[j].1);
                    i += 1;
                    j += 1;
                }
            }
        }

        let mut columns: Vec<Column> = self
            .columns
            .into_iter()
            .zip(left)
            .map(|(col, values)| Column { name: col.name, values })
            .collect();
        columns.push(Column {
            name: series.name,
            values: right,
        });

        Self { dates, columns }
    }

    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Append a derived column aligned row-for-row with this table
    pub fn push_column(&mut self, column: Column) -> StoreResult<()> {
        if column.values.len() != self.dates.len() {
            return Err(StoreError::InvalidArgument(format!(
                "column '{}' has {} rows, table has {}",
                column.name,
                column.values.len(),
                self.dates.len()
            )));
        }
        if self.column(&column.name).is_some() {
            return Err(StoreError::InvalidArgument(format!(
                "column '{}' already exists",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Rows whose timestamp lies within the inclusive bounds
    pub fn filter_range(&self, start: Option<&DateBound>, end: Option<&DateBound>) -> Self {
        let keep: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, ts)| {
                start.map_or(true, |b| b.admits_from(ts)) && end.map_or(true, |b| b.admits_until(ts))
            })
            .map(|(i, _)| i)
            .collect();

        Self {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|col| Column {
                    name: col.name.clone(),
                    values: keep.iter().map(|&i| col.values[i]).collect(),
                })
                .collect(),
        }
    }

    /// Write the table as CSV with a leading `date` column; missing cells are empty
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["date"];
        header.extend(self.column_names());
        wtr.write_record(&header)?;

        for (row, ts) in self.dates.iter().enumerate() {
            let mut fields = Vec::with_capacity(self.columns.len() + 1);
            fields.push(format_timestamp(ts));
            for col in &self.columns {
                fields.push(col.values[row].map(|v| v.to_string()).unwrap_or_default());
            }
            wtr.write_record(&fields)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// CSV rendering as a string
    pub fn to_csv_string(&self) -> StoreResult<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        String::from_utf8(buf).map_err(|e| StoreError::Corruption(e.to_string()))
    }
}
