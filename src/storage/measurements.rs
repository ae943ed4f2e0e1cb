//! Measurement store
//!
//! Time-stamped values belonging to a series. Date filters are always bound
//! as parameters, and results come back in chronological order (ties broken
//! by write order).

use super::database::Database;
use super::error::{StoreError, StoreResult};
use super::types::{format_timestamp, parse_timestamp, validate_window, DateBound, NewRecord, Record, SeriesId};
use rusqlite::{params, OptionalExtension, Transaction};

/// Delete every Data row of a series inside an open transaction
pub(crate) fn delete_in(tx: &Transaction<'_>, id: &SeriesId) -> StoreResult<usize> {
    Ok(tx.execute("DELETE FROM Data WHERE series_id = ?1", params![id.as_str()])?)
}

/// Row as read from SQLite, before the timestamp is decoded
struct RawRecord {
    data_id: i64,
    date: Option<String>,
    mean: Option<f64>,
    status: Option<String>,
}

impl RawRecord {
    fn into_record(self, series_id: &SeriesId) -> StoreResult<Record> {
        let date = self.date.ok_or_else(|| {
            StoreError::Corruption(format!("record {} of series {} has no date", self.data_id, series_id))
        })?;
        Ok(Record {
            data_id: self.data_id,
            series_id: series_id.clone(),
            date: parse_timestamp(&date)?,
            mean: self.mean,
            status: self.status,
        })
    }
}

/// Store of measurement records
#[derive(Debug, Clone)]
pub struct MeasurementStore {
    db: Database,
}

impl MeasurementStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append records to an existing series in one transaction
    ///
    /// Fails with `NotFound` if the series has no descriptor.
    pub fn append(&self, id: &SeriesId, records: &[NewRecord]) -> StoreResult<usize> {
        self.db.locks().with_lock(id, || {
            let mut conn = self.db.connect()?;
            let tx = conn.transaction()?;

            let known: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM Metadata WHERE series_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if known.is_none() {
                return Err(StoreError::NotFound(format!("series {}", id)));
            }

            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO Data (series_id, date, mean, status) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for record in records {
                    stmt.execute(params![
                        id.as_str(),
                        format_timestamp(&record.date),
                        record.mean,
                        record.status,
                    ])?;
                }
            }

            tx.commit()?;
            tracing::debug!(series_id = %id, count = records.len(), "Appended records");
            Ok(records.len())
        })
    }

    /// Records of a series within inclusive, optional bounds
    ///
    /// An unknown series yields an empty vector.
    pub fn query(
        &self,
        id: &SeriesId,
        start: Option<&DateBound>,
        end: Option<&DateBound>,
    ) -> StoreResult<Vec<Record>> {
        validate_window(start, end)?;

        let conn = self.db.connect()?;
        let mut stmt = conn.prepare_cached(
            "SELECT data_id, date, mean, status FROM Data
             WHERE series_id = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date, data_id",
        )?;

        let raw = stmt
            .query_map(
                params![id.as_str(), start.map(DateBound::as_str), end.map(DateBound::as_str)],
                |row| {
                    Ok(RawRecord {
                        data_id: row.get(0)?,
                        date: row.get(1)?,
                        mean: row.get(2)?,
                        status: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let records = raw
            .into_iter()
            .map(|r| r.into_record(id))
            .collect::<StoreResult<Vec<_>>>()?;

        tracing::debug!(
            series_id = %id,
            start = start.map(DateBound::as_str),
            end = end.map(DateBound::as_str),
            rows = records.len(),
            "Queried records"
        );
        Ok(records)
    }

    /// Like [`query`](Self::query) but with raw, unvalidated bound text
    pub fn query_window(
        &self,
        id: &SeriesId,
        start: Option<&str>,
        end: Option<&str>,
    ) -> StoreResult<Vec<Record>> {
        let start = DateBound::parse_opt(start)?;
        let end = DateBound::parse_opt(end)?;
        self.query(id, start.as_ref(), end.as_ref())
    }

    /// Delete every record of a series, leaving its descriptor in place
    pub fn delete_by_series_id(&self, id: &SeriesId) -> StoreResult<usize> {
        self.db.locks().with_lock(id, || {
            let mut conn = self.db.connect()?;
            let tx = conn.transaction()?;
            let removed = delete_in(&tx, id)?;
            tx.commit()?;

            tracing::info!(series_id = %id, removed, "Deleted records");
            Ok(removed)
        })
    }

    /// Number of stored records of a series
    pub fn count(&self, id: &SeriesId) -> StoreResult<usize> {
        let conn = self.db.connect()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM Data WHERE series_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}
