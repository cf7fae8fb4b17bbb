//! Read-through cache over a key/value store.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use super::traits::{CacheEntry, Clock};

/// Bounded-staleness cache for one value under one namespace.
///
/// The value is stored as JSON under `"{namespace}_cache"` and its expiry, in
/// epoch milliseconds, under `"{namespace}_cache_expiry"`. Every operation
/// absorbs storage and codec failures: a broken cache reads as empty and a
/// failed write is only logged.
pub struct ReadThroughCache<V> {
  namespace: String,
  duration: Duration,
  store: Arc<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
  _value: PhantomData<fn() -> V>,
}

impl<V> ReadThroughCache<V>
where
  V: Serialize + DeserializeOwned,
{
  pub fn new(
    namespace: impl Into<String>,
    duration: Duration,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      namespace: namespace.into(),
      duration,
      store,
      clock,
      _value: PhantomData,
    }
  }

  /// Key holding the serialized value.
  pub fn key(&self) -> String {
    format!("{}_cache", self.namespace)
  }

  /// Key holding the expiry timestamp.
  pub fn expiry_key(&self) -> String {
    format!("{}_cache_expiry", self.namespace)
  }

  /// Load the cached value if present and not expired.
  pub async fn load(&self) -> Option<V> {
    self.load_entry().await.map(|entry| entry.value)
  }

  /// Load the cached value with its timestamps.
  pub async fn load_entry(&self) -> Option<CacheEntry<V>> {
    let expiry_raw = match self.store.get(&self.expiry_key()).await {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        debug!(namespace = %self.namespace, "Cache miss");
        return None;
      }
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "Failed to read cache expiry");
        return None;
      }
    };

    let expires_at_ms: i64 = match expiry_raw.trim().parse() {
      Ok(ms) => ms,
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "Unparseable cache expiry");
        return None;
      }
    };

    let raw = match self.store.get(&self.key()).await {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "Failed to read cache");
        return None;
      }
    };

    let value = match serde_json::from_str(&raw) {
      Ok(value) => value,
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "Corrupt cache payload");
        return None;
      }
    };

    let entry = CacheEntry {
      value,
      stored_at_ms: expires_at_ms - self.duration.num_milliseconds(),
      expires_at_ms,
    };
    if !entry.is_fresh(self.clock.now_ms()) {
      debug!(namespace = %self.namespace, "Cache expired");
      return None;
    }

    debug!(namespace = %self.namespace, "Cache hit");
    Some(entry)
  }

  /// Write `value` through to the store with a fresh expiry.
  pub async fn store(&self, value: &V) {
    let payload = match serde_json::to_string(value) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(namespace = %self.namespace, error = %e, "Failed to serialize cache payload");
        return;
      }
    };
    let expires_at_ms = self.clock.now_ms() + self.duration.num_milliseconds();

    if let Err(e) = self.store.set(&self.key(), &payload).await {
      warn!(namespace = %self.namespace, error = %e, "Failed to write cache");
      return;
    }
    if let Err(e) = self
      .store
      .set(&self.expiry_key(), &expires_at_ms.to_string())
      .await
    {
      warn!(namespace = %self.namespace, error = %e, "Failed to write cache expiry");
    }
  }

  /// Remove both keys.
  pub async fn clear(&self) {
    for key in [self.key(), self.expiry_key()] {
      if let Err(e) = self.store.remove(&key).await {
        warn!(namespace = %self.namespace, key = %key, error = %e, "Failed to clear cache");
      }
    }
  }
}

impl<V> Clone for ReadThroughCache<V> {
  fn clone(&self) -> Self {
    Self {
      namespace: self.namespace.clone(),
      duration: self.duration,
      store: Arc::clone(&self.store),
      clock: Arc::clone(&self.clock),
      _value: PhantomData,
    }
  }
}
