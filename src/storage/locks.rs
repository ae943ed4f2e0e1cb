//! Per-series write serialization
//!
//! Writers to the same series (append, delete) run one at a time inside this
//! process. Readers never take these locks; SQLite transactions keep them
//! from seeing half-applied writes.

use super::error::{StoreError, StoreResult};
use super::types::SeriesId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry of one mutex per series id
#[derive(Debug, Default)]
pub struct SeriesLocks {
    locks: Mutex<HashMap<SeriesId, Arc<Mutex<()>>>>,
}

impl SeriesLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &SeriesId) -> StoreResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| StoreError::Lock(format!("series lock registry poisoned: {}", e)))?;
        Ok(Arc::clone(locks.entry(id.clone()).or_default()))
    }

    /// Run `f` while holding the write lock of `id`
    pub fn with_lock<T>(&self, id: &SeriesId, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let handle = self.handle(id)?;
        let _guard = handle
            .lock()
            .map_err(|e| StoreError::Lock(format!("series {} lock poisoned: {}", id, e)))?;
        f()
    }

    /// Forget locks nobody is holding or waiting on
    pub fn prune(&self) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.retain(|_, handle| Arc::strong_count(handle) > 1);
        }
    }

    /// Number of tracked series
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::identifier::derive;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_with_lock_returns_value() {
        let locks = SeriesLocks::new();
        let id = derive("a", "b", "c", "d", 1, "e");
        let v = locks.with_lock(&id, || Ok(42)).unwrap();
        assert_eq!(v, 42);
        assert_eq!(locks.len(), 1);

        locks.prune();
        assert!(locks.is_empty());
    }

    #[test]
    fn test_same_series_is_serialized() {
        let locks = Arc::new(SeriesLocks::new());
        let id = derive("a", "b", "c", "d", 1, "e");
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let id = id.clone();
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks
                        .with_lock(&id, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(2));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();

        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
