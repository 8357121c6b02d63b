//! In-process record store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::store::{RecordStore, StoreError};
use crate::data::{Record, RecordKey};

/// Keeps records in a `HashMap` behind a read-write lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKey, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(key).cloned())
    }

    async fn upsert(&self, record: Record) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(record.key.clone(), record);
        Ok(())
    }
}
