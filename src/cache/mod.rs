//! Durable storage for fetched payloads
//!
//! Records are keyed by base currency (rate tables) or by the catalogue
//! singleton key. The disk-backed [`CacheManager`] persists one JSON file per
//! key; [`MemoryStore`] keeps everything in process for embedding and tests.

mod manager;
mod memory;
mod store;

pub use manager::CacheManager;
pub use memory::MemoryStore;
pub use store::{RecordStore, StoreError};
