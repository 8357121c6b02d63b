use async_trait::async_trait;
use thiserror::Error;

use crate::data::{Record, RecordKey};

/// Errors raised by a record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read/write failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No cache directory could be determined for this platform
    #[error("No cache directory available")]
    NoCacheDir,

    /// Background write task died before finishing
    #[error("Cache write task failed: {0}")]
    Task(String),
}

/// Key → record mapping used by the refresh orchestrator
///
/// Implementations must allow concurrent reads and serialize writes; an upsert
/// either replaces the whole record or leaves the previous one untouched.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError>;

    async fn upsert(&self, record: Record) -> Result<(), StoreError>;
}
