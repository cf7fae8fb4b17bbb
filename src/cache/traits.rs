//! Core traits and types for the caching system.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time, in milliseconds since the Unix epoch.
///
/// Expiry decisions go through this trait so tests can pin the clock.
pub trait Clock: Send + Sync {
  fn now_ms(&self) -> i64;
}

/// Wall clock backed by chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> i64 {
    Utc::now().timestamp_millis()
  }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: AtomicI64,
}

impl ManualClock {
  pub fn new(now_ms: i64) -> Self {
    Self {
      now: AtomicI64::new(now_ms),
    }
  }

  pub fn set(&self, now_ms: i64) {
    self.now.store(now_ms, Ordering::SeqCst);
  }

  pub fn advance(&self, by_ms: i64) {
    self.now.fetch_add(by_ms, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now_ms(&self) -> i64 {
    self.now.load(Ordering::SeqCst)
  }
}

/// A cached value together with its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
  /// The cached value
  pub value: T,
  /// When the value was written (derived from the expiry on load)
  pub stored_at_ms: i64,
  /// First instant at which the value is no longer served
  pub expires_at_ms: i64,
}

impl<T> CacheEntry<T> {
  /// Whether the entry is still servable at `now_ms`.
  pub fn is_fresh(&self, now_ms: i64) -> bool {
    now_ms < self.expires_at_ms
  }
}

/// Indicates where a provider's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
  /// Fresh data from network
  Network,
  /// Data from the persistent cache, a background refresh was started
  Cache,
  /// Provider was already initialized; in-memory state was left as is
  Memory,
  /// Nothing cached and the network failed; state is empty
  Unavailable,
}
