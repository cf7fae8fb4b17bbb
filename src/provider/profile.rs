//! State provider for the singleton user profile.

use color_eyre::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::state::{Initialized, Phase, ProviderState};
use crate::api::RemoteProfile;
use crate::cache::{CacheEntry, Clock, DataSource, KeyValueStore, ReadThroughCache};
use crate::domain::{Domain, MutationPolicy, ProfileDraft, UserProfile};

/// Same protocol as [`super::CollectionProvider`], for a single object.
#[derive(Clone)]
pub struct ProfileProvider {
  inner: Arc<Inner>,
}

struct Inner {
  remote: Arc<dyn RemoteProfile>,
  cache: ReadThroughCache<UserProfile>,
  state: watch::Sender<ProviderState<Option<UserProfile>>>,
  mounted: AtomicBool,
}

impl ProfileProvider {
  pub fn new(
    remote: Arc<dyn RemoteProfile>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let domain = Domain::Profile;
    let cache = ReadThroughCache::new(domain.namespace(), domain.cache_duration(), store, clock);
    let (state, _) = watch::channel(ProviderState::default());

    Self {
      inner: Arc::new(Inner {
        remote,
        cache,
        state,
        mounted: AtomicBool::new(false),
      }),
    }
  }

  pub async fn initialize(&self) -> Initialized {
    if self.inner.mounted.swap(true, Ordering::SeqCst) {
      return Initialized::immediate(DataSource::Memory);
    }

    self.inner.state.send_modify(|s| {
      s.phase = Phase::Loading;
      s.begin_fetch();
    });

    if let Some(profile) = self.inner.cache.load().await {
      debug!("Serving cached profile");
      self.inner.state.send_modify(|s| {
        s.settle(Some(profile));
        s.end_fetch();
      });

      let this = self.clone();
      let revalidation = tokio::spawn(async move {
        if let Err(e) = this.refresh().await {
          warn!(error = %e, "Background profile refresh failed, keeping cached profile");
        }
      });

      return Initialized {
        source: DataSource::Cache,
        revalidation: Some(revalidation),
      };
    }

    match self.inner.remote.fetch().await {
      Ok(profile) => {
        self.inner.state.send_modify(|s| {
          s.settle(Some(profile.clone()));
          s.end_fetch();
        });
        self.inner.cache.store(&profile).await;
        Initialized::immediate(DataSource::Network)
      }
      Err(e) => {
        warn!(error = %e, "Profile load failed with nothing cached");
        self.inner.state.send_modify(|s| {
          s.phase = Phase::Ready;
          s.end_fetch();
        });
        Initialized::immediate(DataSource::Unavailable)
      }
    }
  }

  pub async fn refresh(&self) -> Result<UserProfile> {
    self.inner.state.send_modify(ProviderState::begin_fetch);

    match self.inner.remote.fetch().await {
      Ok(profile) => {
        self.inner.state.send_modify(|s| {
          s.settle(Some(profile.clone()));
          s.end_fetch();
        });
        self.inner.cache.store(&profile).await;
        Ok(profile)
      }
      Err(e) => {
        self.inner.state.send_modify(ProviderState::end_fetch);
        Err(e)
      }
    }
  }

  pub fn profile(&self) -> Option<UserProfile> {
    self.inner.state.borrow().data.clone()
  }

  pub fn snapshot(&self) -> ProviderState<Option<UserProfile>> {
    self.inner.state.borrow().clone()
  }

  pub fn is_loading(&self) -> bool {
    self.inner.state.borrow().is_loading
  }

  pub fn subscribe(&self) -> watch::Receiver<ProviderState<Option<UserProfile>>> {
    self.inner.state.subscribe()
  }

  /// Update the profile; the server's response replaces local state.
  pub async fn update(&self, data: &ProfileDraft) -> Result<UserProfile> {
    let updated = self.inner.remote.update(data).await?;

    self
      .inner
      .state
      .send_modify(|s| s.settle(Some(updated.clone())));

    match Domain::Profile.mutation_policy() {
      MutationPolicy::StorePatched => self.inner.cache.store(&updated).await,
      MutationPolicy::Clear => self.inner.cache.clear().await,
    }

    Ok(updated)
  }

  pub async fn invalidate(&self) {
    self.inner.cache.clear().await;
  }

  pub async fn cached_entry(&self) -> Option<CacheEntry<UserProfile>> {
    self.inner.cache.load_entry().await
  }
}
