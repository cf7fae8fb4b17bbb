//! The full set of providers for one signed-in API session.

use color_eyre::Result;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::cache::{open_store, Clock, KeyValueStore, SystemClock};
use crate::config::Config;
use crate::domain::{Alert, Category, CategoryRule, Domain, Merchant, Receipt};
use crate::provider::{
  AlertProvider, CategoryProvider, Initialized, MerchantProvider, ProfileProvider,
  ReceiptProvider, RuleProvider,
};

/// One provider per domain, sharing a store and a clock.
#[derive(Clone)]
pub struct Session {
  pub categories: CategoryProvider,
  pub merchants: MerchantProvider,
  pub receipts: ReceiptProvider,
  pub rules: RuleProvider,
  pub alerts: AlertProvider,
  pub profile: ProfileProvider,
}

impl Session {
  /// Wire every provider to the HTTP API.
  pub fn new(api: &ApiClient, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
    Self {
      categories: CategoryProvider::new(
        Arc::new(api.collection::<Category>()),
        store.clone(),
        clock.clone(),
      ),
      merchants: MerchantProvider::new(
        Arc::new(api.collection::<Merchant>()),
        store.clone(),
        clock.clone(),
      ),
      receipts: ReceiptProvider::new(
        Arc::new(api.collection::<Receipt>()),
        store.clone(),
        clock.clone(),
      ),
      rules: RuleProvider::new(
        Arc::new(api.collection::<CategoryRule>()),
        store.clone(),
        clock.clone(),
      ),
      alerts: AlertProvider::new(
        Arc::new(api.collection::<Alert>()),
        store.clone(),
        clock.clone(),
      ),
      profile: ProfileProvider::new(Arc::new(api.clone()), store, clock),
    }
  }

  /// Build the API client and pick the storage backend from configuration.
  pub fn from_config(config: &Config) -> Result<Self> {
    let api = ApiClient::new(&config.api)?;
    let store = open_store(
      config.storage.backend,
      config.storage.path.as_deref(),
      &config.api.base_url,
    )?;
    Ok(Self::new(&api, store, Arc::new(SystemClock)))
  }

  /// Mount every provider concurrently.
  pub async fn initialize_all(&self) -> Vec<(Domain, Initialized)> {
    let (categories, merchants, receipts, rules, alerts, profile) = futures::join!(
      self.categories.initialize(),
      self.merchants.initialize(),
      self.receipts.initialize(),
      self.rules.initialize(),
      self.alerts.initialize(),
      self.profile.initialize(),
    );

    vec![
      (Domain::Categories, categories),
      (Domain::Merchants, merchants),
      (Domain::Receipts, receipts),
      (Domain::Rules, rules),
      (Domain::Alerts, alerts),
      (Domain::Profile, profile),
    ]
  }

  /// Drop the persistent cache of one domain.
  pub async fn invalidate(&self, domain: Domain) {
    match domain {
      Domain::Categories => self.categories.invalidate().await,
      Domain::Merchants => self.merchants.invalidate().await,
      Domain::Receipts => self.receipts.invalidate().await,
      Domain::Rules => self.rules.invalidate().await,
      Domain::Alerts => self.alerts.invalidate().await,
      Domain::Profile => self.profile.invalidate().await,
    }
  }

  /// Drop every persistent cache, e.g. on sign-out.
  pub async fn invalidate_all(&self) {
    futures::future::join_all(Domain::ALL.into_iter().map(|d| self.invalidate(d))).await;
  }

  /// Expiry of the cached snapshot for `domain`, if one is fresh.
  pub async fn cache_expiry(&self, domain: Domain) -> Option<(i64, usize)> {
    match domain {
      Domain::Categories => entry_summary(self.categories.cached_entry().await),
      Domain::Merchants => entry_summary(self.merchants.cached_entry().await),
      Domain::Receipts => entry_summary(self.receipts.cached_entry().await),
      Domain::Rules => entry_summary(self.rules.cached_entry().await),
      Domain::Alerts => entry_summary(self.alerts.cached_entry().await),
      Domain::Profile => self
        .profile
        .cached_entry()
        .await
        .map(|e| (e.expires_at_ms, 1)),
    }
  }
}

fn entry_summary<T>(entry: Option<crate::cache::CacheEntry<Vec<T>>>) -> Option<(i64, usize)> {
  entry.map(|e| (e.expires_at_ms, e.value.len()))
}
