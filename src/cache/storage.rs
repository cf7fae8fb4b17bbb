//! Key/value storage trait and its backends.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::config::Config;

/// Trait for persistent string key/value backends.
///
/// All operations are async and fallible. Callers that treat the store as an
/// optimization (the read-through cache) are expected to absorb the errors.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  async fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Delete `key`. Deleting a missing key is not an error.
  async fn remove(&self, key: &str) -> Result<()>;
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
  /// Pick based on the runtime platform
  #[default]
  Auto,
  /// In-process map, lost on exit
  Memory,
  /// SQLite file in the user data directory
  Sqlite,
  /// No caching at all
  Disabled,
}

impl StorageBackend {
  /// Resolve `Auto` to a concrete backend for the current platform.
  ///
  /// Web targets get the synchronous in-process store, everything else gets
  /// the persistent SQLite store.
  pub fn resolve(self) -> Self {
    match self {
      Self::Auto if cfg!(target_family = "wasm") => Self::Memory,
      Self::Auto => Self::Sqlite,
      other => other,
    }
  }
}

/// Open the configured backend. Called once at startup.
///
/// `scope` namespaces the on-disk database (typically the API base URL) so
/// that caches for different servers never mix.
pub fn open_store(
  backend: StorageBackend,
  path: Option<&Path>,
  scope: &str,
) -> Result<Arc<dyn KeyValueStore>> {
  let backend = backend.resolve();
  info!(?backend, "Selected cache storage backend");

  let store: Arc<dyn KeyValueStore> = match backend {
    StorageBackend::Memory => Arc::new(MemoryStore::new()),
    StorageBackend::Disabled => Arc::new(NoopStore),
    StorageBackend::Sqlite | StorageBackend::Auto => {
      let path = match path {
        Some(p) => p.to_path_buf(),
        None => SqliteStore::default_path(scope)?,
      };
      Arc::new(SqliteStore::open(&path)?)
    }
  };

  Ok(store)
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

#[async_trait]
impl KeyValueStore for NoopStore {
  async fn get(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  async fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }

  async fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

/// In-process synchronous map.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of keys currently held.
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }
}

/// SQLite-based key/value store.
pub struct SqliteStore {
  conn: Arc<Mutex<Connection>>,
}

/// Schema for the key/value table.
const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStore {
  /// Open (or create) the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;
    debug!(path = %path.display(), "Opened cache database");

    Self::from_connection(conn)
  }

  /// Open a throwaway in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(KV_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
    })
  }

  /// Get the default database path for a given scope.
  pub fn default_path(scope: &str) -> Result<PathBuf> {
    Ok(Config::data_dir()?.join(format!("cache-{}.db", scope_hash(scope))))
  }

  /// Run a blocking closure against the connection off the async runtime.
  async fn with_conn<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&Connection) -> Result<R> + Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let conn = conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
      f(&conn)
    })
    .await
    .map_err(|e| eyre!("Cache storage task failed: {}", e))?
  }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        conn
          .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
            row.get(0)
          })
          .optional()
          .map_err(|e| eyre!("Failed to read cache key {}: {}", key, e))
      })
      .await
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    let key = key.to_string();
    let value = value.to_string();
    self
      .with_conn(move |conn| {
        conn
          .execute(
            "INSERT OR REPLACE INTO kv (key, value, written_at) VALUES (?, ?, datetime('now'))",
            params![key, value],
          )
          .map_err(|e| eyre!("Failed to write cache key {}: {}", key, e))?;
        Ok(())
      })
      .await
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        conn
          .execute("DELETE FROM kv WHERE key = ?", params![key])
          .map_err(|e| eyre!("Failed to delete cache key {}: {}", key, e))?;
        Ok(())
      })
      .await
  }
}

/// Short stable hash used to scope database files.
fn scope_hash(scope: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(scope.trim_end_matches('/').as_bytes());
  let digest = hex::encode(hasher.finalize());
  digest[..16].to_string()
}
