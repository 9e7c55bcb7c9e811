use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::defaults::seed_records;
use super::record::CriteriaRecord;

/// Shared handle to the criteria collection.
///
/// Cloning shares the same underlying records, so the handle can be injected
/// wherever it is needed instead of living in a process-wide singleton.
/// Reads hand out snapshots, never live views; `replace` is an atomic whole
/// collection swap. A single mutating run at a time is assumed; nothing here
/// arbitrates between two concurrent writers.
#[derive(Clone, Default)]
pub struct CriteriaStore {
    records: Arc<RwLock<Vec<CriteriaRecord>>>,
}

impl CriteriaStore {
    pub fn new(records: Vec<CriteriaRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Store seeded with the built-in network criteria profiles.
    pub fn with_defaults() -> Self {
        Self::new(seed_records())
    }

    pub fn snapshot(&self) -> Vec<CriteriaRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn replace(&self, records: Vec<CriteriaRecord>) {
        *self.write() = records;
    }

    pub fn append(&self, record: CriteriaRecord) {
        self.write().push(record);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CriteriaRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CriteriaRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
