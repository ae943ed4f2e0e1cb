//! Metadata catalog
//!
//! CRUD over series descriptors, one row per series. The compound delete
//! removes a descriptor together with all of its measurement records inside a
//! single transaction.

use super::database::Database;
use super::error::{StoreError, StoreResult};
use super::measurements;
use super::types::{Descriptor, RasterSpec, SeriesId};
use super::identifier;
use rusqlite::{params, OptionalExtension, Row};

const DESCRIPTOR_COLUMNS: &str = "series_id, msr, msr_attribute, object_id, object_type, cfg, \
     device, number, object_description, object_name, unit, start_date, end_date, \
     raster_size, raster_unit, scale";

fn descriptor_from_row(row: &Row<'_>) -> rusqlite::Result<Descriptor> {
    Ok(Descriptor {
        series_id: SeriesId::from_digest(row.get(0)?),
        msr: row.get(1)?,
        msr_attribute: row.get(2)?,
        object_id: row.get(3)?,
        object_type: row.get(4)?,
        cfg: row.get(5)?,
        device: row.get(6)?,
        number: row.get(7)?,
        object_description: row.get(8)?,
        object_name: row.get(9)?,
        unit: row.get(10)?,
        start_date: row.get(11)?,
        end_date: row.get(12)?,
        raster_size: row.get(13)?,
        raster_unit: row.get(14)?,
        scale: row.get(15)?,
    })
}

/// Catalog of series descriptors
#[derive(Debug, Clone)]
pub struct MetadataCatalog {
    db: Database,
}

impl MetadataCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create the Metadata and Data relations if absent
    pub fn ensure_schema(&self) -> StoreResult<()> {
        self.db.ensure_schema()
    }

    /// Drop both relations
    pub fn drop_schema(&self) -> StoreResult<()> {
        self.db.drop_schema()
    }

    /// Every descriptor, in store-native order
    pub fn list_all(&self) -> StoreResult<Vec<Descriptor>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM Metadata", DESCRIPTOR_COLUMNS))?;
        let descriptors = stmt
            .query_map([], descriptor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = descriptors.len(), "Listed descriptors");
        Ok(descriptors)
    }

    /// Look up one descriptor by id
    pub fn find_by_series_id(&self, id: &SeriesId) -> StoreResult<Option<Descriptor>> {
        let conn = self.db.connect()?;
        let descriptor = conn
            .query_row(
                &format!("SELECT {} FROM Metadata WHERE series_id = ?1", DESCRIPTOR_COLUMNS),
                params![id.as_str()],
                descriptor_from_row,
            )
            .optional()?;
        Ok(descriptor)
    }

    /// Resolve a measurement point name to exactly one descriptor
    ///
    /// Fails with `NotFound` when nothing matches and `AmbiguousLookup` when
    /// several series share the `msr`.
    pub fn find_by_measurement(&self, msr: &str) -> StoreResult<Descriptor> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM Metadata WHERE msr = ?1 LIMIT 2",
            DESCRIPTOR_COLUMNS
        ))?;
        let mut matches = stmt
            .query_map(params![msr], descriptor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        match matches.len() {
            0 => Err(StoreError::NotFound(format!("measurement '{}'", msr))),
            1 => Ok(matches.remove(0)),
            _ => {
                let count: usize = conn.query_row(
                    "SELECT COUNT(*) FROM Metadata WHERE msr = ?1",
                    params![msr],
                    |row| row.get::<_, i64>(0),
                )? as usize;
                Err(StoreError::AmbiguousLookup {
                    msr: msr.to_string(),
                    count,
                })
            }
        }
    }

    /// Look up the series defined by the six identifying fields
    pub fn find_by_definition(
        &self,
        msr: &str,
        msr_attribute: &str,
        start_date: &str,
        end_date: &str,
        raster: &RasterSpec,
    ) -> StoreResult<Option<Descriptor>> {
        let id = identifier::derive(
            msr,
            msr_attribute,
            start_date,
            end_date,
            raster.size,
            &raster.unit,
        );
        self.find_by_series_id(&id)
    }

    /// Insert a descriptor
    ///
    /// Returns `false` when a descriptor with the same id already exists; the
    /// id is the de-duplication key so the existing row is left untouched.
    pub fn insert(&self, descriptor: &Descriptor) -> StoreResult<bool> {
        if descriptor.series_id != descriptor.derived_id() {
            return Err(StoreError::InvalidArgument(format!(
                "series id {} does not match the definition of '{}.{}'",
                descriptor.series_id, descriptor.msr, descriptor.msr_attribute
            )));
        }

        let conn = self.db.connect()?;
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO Metadata ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                DESCRIPTOR_COLUMNS
            ),
            params![
                descriptor.series_id.as_str(),
                descriptor.msr,
                descriptor.msr_attribute,
                descriptor.object_id,
                descriptor.object_type,
                descriptor.cfg,
                descriptor.device,
                descriptor.number,
                descriptor.object_description,
                descriptor.object_name,
                descriptor.unit,
                descriptor.start_date,
                descriptor.end_date,
                descriptor.raster_size,
                descriptor.raster_unit,
                descriptor.scale,
            ],
        )? == 1;

        if inserted {
            tracing::info!(series_id = %descriptor.series_id, msr = %descriptor.msr, "Inserted descriptor");
        } else {
            tracing::debug!(series_id = %descriptor.series_id, "Descriptor already present");
        }
        Ok(inserted)
    }

    /// Delete a descriptor and all of its records as one transaction
    ///
    /// Returns whether the descriptor existed. A missing id is not an error.
    pub fn delete(&self, id: &SeriesId) -> StoreResult<bool> {
        let existed = self.db.locks().with_lock(id, || {
            let mut conn = self.db.connect()?;
            let tx = conn.transaction()?;
            let records = measurements::delete_in(&tx, id)?;
            let descriptors = tx.execute("DELETE FROM Metadata WHERE series_id = ?1", params![id.as_str()])?;
            tx.commit()?;

            tracing::info!(series_id = %id, records, descriptors, "Deleted series");
            Ok(descriptors > 0)
        })?;
        self.db.locks().prune();

        if !existed {
            tracing::warn!(series_id = %id, "Delete requested for unknown series");
        }
        Ok(existed)
    }
}
