//! Observable state held by each provider.

use tokio::task::JoinHandle;
use tracing::warn;

use crate::cache::DataSource;

/// Lifecycle of a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
  /// Not mounted yet
  #[default]
  Uninitialized,
  /// First load in progress, nothing to show yet
  Loading,
  /// Data (possibly stale or empty) is available
  Ready,
}

/// Snapshot of a provider's state.
///
/// `data` is `Vec<T>` for list domains and `Option<UserProfile>` for the
/// profile.
#[derive(Debug, Clone, Default)]
pub struct ProviderState<D> {
  pub data: D,
  /// True while at least one fetch is outstanding
  pub is_loading: bool,
  pub phase: Phase,
  in_flight: usize,
}

impl<D> ProviderState<D> {
  pub(crate) fn begin_fetch(&mut self) {
    self.in_flight += 1;
    self.is_loading = true;
  }

  pub(crate) fn end_fetch(&mut self) {
    self.in_flight = self.in_flight.saturating_sub(1);
    self.is_loading = self.in_flight > 0;
  }

  /// Replace the data with a fetched or cached value.
  pub(crate) fn settle(&mut self, data: D) {
    self.data = data;
    self.phase = Phase::Ready;
  }
}

/// Outcome of `initialize()`.
#[derive(Debug)]
pub struct Initialized {
  /// Where the initial data came from
  pub source: DataSource,
  /// Background refresh started after a cache hit
  pub revalidation: Option<JoinHandle<()>>,
}

impl Initialized {
  pub(crate) fn immediate(source: DataSource) -> Self {
    Self {
      source,
      revalidation: None,
    }
  }

  /// Wait for the background refresh, if one was started.
  pub async fn revalidated(self) {
    if let Some(handle) = self.revalidation {
      if let Err(e) = handle.await {
        warn!(error = %e, "Background refresh task did not complete");
      }
    }
  }
}
