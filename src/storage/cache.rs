//! Caller-owned descriptor cache
//!
//! Selection lists read the full descriptor list often and change it rarely.
//! The cache belongs to whoever holds it (the API state, a CLI session); it is
//! dropped on every mutating call made through it and refetched lazily.

use super::catalog::MetadataCatalog;
use super::error::StoreResult;
use super::types::{Descriptor, SeriesId};

#[derive(Debug, Default)]
pub struct CatalogCache {
    descriptors: Option<Vec<Descriptor>>,
    /// Bumped on every invalidation
    generation: u64,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached descriptors, fetching them if the cache is cold
    pub fn descriptors(&mut self, catalog: &MetadataCatalog) -> StoreResult<&[Descriptor]> {
        if self.descriptors.is_none() {
            self.descriptors = Some(catalog.list_all()?);
        }
        Ok(self.descriptors.as_deref().unwrap_or_default())
    }

    /// Find a cached descriptor by id
    pub fn get(&mut self, catalog: &MetadataCatalog, id: &SeriesId) -> StoreResult<Option<Descriptor>> {
        Ok(self
            .descriptors(catalog)?
            .iter()
            .find(|d| &d.series_id == id)
            .cloned())
    }

    /// Drop the cached list; the next read refetches
    pub fn invalidate(&mut self) {
        self.descriptors = None;
        self.generation += 1;
    }

    pub fn is_warm(&self) -> bool {
        self.descriptors.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Delete a series through the catalog and invalidate
    pub fn delete(&mut self, catalog: &MetadataCatalog, id: &SeriesId) -> StoreResult<bool> {
        let result = catalog.delete(id);
        self.invalidate();
        result
    }

    /// Insert a descriptor through the catalog and invalidate
    pub fn insert(&mut self, catalog: &MetadataCatalog, descriptor: &Descriptor) -> StoreResult<bool> {
        let result = catalog.insert(descriptor);
        self.invalidate();
        result
    }
}
