//! Generic caching layer for fast cold starts and offline support.
//!
//! This module is domain-agnostic. It provides:
//! - A key/value storage capability with persistent, in-memory and no-op backends
//! - A read-through cache that stores one serialized value plus an expiry
//! - An injectable clock so expiry can be tested deterministically

mod layer;
mod storage;
mod traits;

pub use layer::ReadThroughCache;
pub use storage::{open_store, KeyValueStore, MemoryStore, NoopStore, SqliteStore, StorageBackend};
pub use traits::{CacheEntry, Clock, DataSource, ManualClock, SystemClock};
