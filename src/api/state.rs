//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::align::Aligner;
use crate::config::ApiConfig;
use crate::storage::{CatalogCache, Database, DuplicatePolicy, MeasurementStore, MetadataCatalog, StoreError, StoreResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Series descriptors
    pub catalog: MetadataCatalog,
    /// Measurement records
    pub store: MeasurementStore,
    /// Joins and reshapes series for the analysis routes
    pub aligner: Aligner,
    /// Descriptor list shown by `/series`; dropped on delete
    pub cache: Arc<Mutex<CatalogCache>>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: Database, policy: DuplicatePolicy, config: ApiConfig) -> Self {
        let catalog = MetadataCatalog::new(db.clone());
        let store = MeasurementStore::new(db);
        let aligner = Aligner::new(catalog.clone(), store.clone()).with_policy(policy);

        Self {
            catalog,
            store,
            aligner,
            cache: Arc::new(Mutex::new(CatalogCache::new())),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Lock the descriptor cache; must be called from a blocking task
    pub fn lock_cache(&self) -> StoreResult<MutexGuard<'_, CatalogCache>> {
        self.cache
            .lock()
            .map_err(|_| StoreError::Lock("catalog cache poisoned".to_string()))
    }
}
