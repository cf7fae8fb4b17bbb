//! State provider for list domains.

use color_eyre::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{Initialized, Phase, ProviderState};
use crate::api::{ListParams, RemoteCollection};
use crate::cache::{CacheEntry, Clock, DataSource, KeyValueStore, ReadThroughCache};
use crate::domain::{Entity, EntityId, MutationPolicy};

/// Holds the in-memory list for one domain and is the only writer of both
/// that list and the domain's persistent cache.
///
/// Cloning is cheap and every clone shares the same state.
pub struct CollectionProvider<T: Entity> {
  inner: Arc<Inner<T>>,
}

struct Inner<T: Entity> {
  remote: Arc<dyn RemoteCollection<T>>,
  cache: ReadThroughCache<Vec<T>>,
  policy: MutationPolicy,
  state: watch::Sender<ProviderState<Vec<T>>>,
  mounted: AtomicBool,
}

impl<T: Entity> Clone for CollectionProvider<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T: Entity> CollectionProvider<T> {
  pub fn new(
    remote: Arc<dyn RemoteCollection<T>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let domain = T::DOMAIN;
    let cache = ReadThroughCache::new(domain.namespace(), domain.cache_duration(), store, clock);
    let (state, _) = watch::channel(ProviderState::default());

    Self {
      inner: Arc::new(Inner {
        remote,
        cache,
        policy: domain.mutation_policy(),
        state,
        mounted: AtomicBool::new(false),
      }),
    }
  }

  /// Mount the provider. Only the first call does anything.
  ///
  /// 1. Cache hit: publish the cached list now and revalidate in the background
  /// 2. Cache miss: fetch from the network before returning
  /// 3. Miss and network failure: publish an empty list, not an error
  pub async fn initialize(&self) -> Initialized {
    if self.inner.mounted.swap(true, Ordering::SeqCst) {
      return Initialized::immediate(DataSource::Memory);
    }

    let domain = T::DOMAIN;
    self.inner.state.send_modify(|s| {
      s.phase = Phase::Loading;
      s.begin_fetch();
    });

    if let Some(items) = self.inner.cache.load().await {
      debug!(%domain, count = items.len(), "Serving cached list");
      self.inner.state.send_modify(|s| {
        s.settle(items);
        s.end_fetch();
      });

      let this = self.clone();
      let revalidation = tokio::spawn(async move {
        if let Err(e) = this.refresh(&ListParams::default()).await {
          warn!(%domain, error = %e, "Background refresh failed, keeping cached data");
        }
      });

      return Initialized {
        source: DataSource::Cache,
        revalidation: Some(revalidation),
      };
    }

    match self.inner.remote.list(&ListParams::default()).await {
      Ok(items) => {
        info!(%domain, count = items.len(), "Loaded from network");
        self.inner.state.send_modify(|s| {
          s.settle(items.clone());
          s.end_fetch();
        });
        self.inner.cache.store(&items).await;
        Initialized::immediate(DataSource::Network)
      }
      Err(e) => {
        warn!(%domain, error = %e, "Initial load failed with nothing cached");
        self.inner.state.send_modify(|s| {
          s.phase = Phase::Ready;
          s.end_fetch();
        });
        Initialized::immediate(DataSource::Unavailable)
      }
    }
  }

  /// Fetch from the network, replace the list and write it through.
  ///
  /// Overlapping calls are not serialized: whichever resolves last wins.
  /// On error the current list is kept and the error is returned.
  pub async fn refresh(&self, params: &ListParams) -> Result<Vec<T>> {
    self.inner.state.send_modify(ProviderState::begin_fetch);

    match self.inner.remote.list(params).await {
      Ok(items) => {
        debug!(domain = %T::DOMAIN, count = items.len(), "Refreshed");
        self.inner.state.send_modify(|s| {
          s.settle(items.clone());
          s.end_fetch();
        });
        self.inner.cache.store(&items).await;
        Ok(items)
      }
      Err(e) => {
        self.inner.state.send_modify(ProviderState::end_fetch);
        Err(e)
      }
    }
  }

  /// Look up an entity in the current list. No I/O.
  pub fn get(&self, id: EntityId) -> Option<T> {
    self
      .inner
      .state
      .borrow()
      .data
      .iter()
      .find(|item| item.id() == id)
      .cloned()
  }

  /// Fetch one entity straight from the API without touching state.
  pub async fn fetch_by_id(&self, id: EntityId) -> Result<T> {
    self.inner.remote.get(id).await
  }

  pub fn items(&self) -> Vec<T> {
    self.inner.state.borrow().data.clone()
  }

  pub fn snapshot(&self) -> ProviderState<Vec<T>> {
    self.inner.state.borrow().clone()
  }

  pub fn is_loading(&self) -> bool {
    self.inner.state.borrow().is_loading
  }

  pub fn phase(&self) -> Phase {
    self.inner.state.borrow().phase
  }

  /// Receive every state change. Dropping the receiver is always fine.
  pub fn subscribe(&self) -> watch::Receiver<ProviderState<Vec<T>>> {
    self.inner.state.subscribe()
  }

  /// Create an entity and append it to the list.
  pub async fn create(&self, data: &T::Draft) -> Result<T> {
    let captured = self.items();
    let created = self.inner.remote.create(data).await?;

    self
      .inner
      .state
      .send_modify(|s| s.data.push(created.clone()));

    let mut patched = captured;
    patched.push(created.clone());
    self.write_back(patched).await;

    Ok(created)
  }

  /// Update an entity and replace it in the list.
  pub async fn update(&self, id: EntityId, data: &T::Draft) -> Result<T> {
    let captured = self.items();
    let updated = self.inner.remote.update(id, data).await?;

    self.inner.state.send_modify(|s| {
      if let Some(slot) = s.data.iter_mut().find(|item| item.id() == id) {
        *slot = updated.clone();
      }
    });

    let patched: Vec<T> = captured
      .into_iter()
      .map(|item| {
        if item.id() == id {
          updated.clone()
        } else {
          item
        }
      })
      .collect();
    self.write_back(patched).await;

    Ok(updated)
  }

  /// Delete an entity and remove it from the list.
  pub async fn delete(&self, id: EntityId) -> Result<()> {
    let captured = self.items();
    self.inner.remote.delete(id).await?;

    self
      .inner
      .state
      .send_modify(|s| s.data.retain(|item| item.id() != id));

    let patched: Vec<T> = captured.into_iter().filter(|item| item.id() != id).collect();
    self.write_back(patched).await;

    Ok(())
  }

  /// Drop the persistent cache. In-memory state is untouched.
  pub async fn invalidate(&self) {
    self.inner.cache.clear().await;
  }

  /// The current persisted snapshot, if fresh.
  pub async fn cached_entry(&self) -> Option<CacheEntry<Vec<T>>> {
    self.inner.cache.load_entry().await
  }

  /// Mirror a mutation into the persistent cache per the domain's policy.
  ///
  /// `patched` is built from the list captured when the mutation started.
  async fn write_back(&self, patched: Vec<T>) {
    match self.inner.policy {
      MutationPolicy::StorePatched => self.inner.cache.store(&patched).await,
      MutationPolicy::Clear => self.inner.cache.clear().await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{ManualClock, MemoryStore};
  use crate::domain::{
    Alert, Category, CategoryDraft, CategoryKind, CategoryRule, Merchant, MerchantDraft, Receipt,
    ReceiptDraft, RuleDraft,
  };
  use crate::testing::{FailingStore, FakeRemote};

  const T0: i64 = 1_700_000_000_000;

  struct Harness<T: Entity> {
    provider: CollectionProvider<T>,
    remote: Arc<FakeRemote<T>>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
  }

  fn harness<T: Entity>() -> Harness<T> {
    let remote = Arc::new(FakeRemote::<T>::new());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let provider = CollectionProvider::<T>::new(remote.clone(), store.clone(), clock.clone());
    Harness {
      provider,
      remote,
      store,
      clock,
    }
  }

  /// A second cache over the same store, to seed or inspect what the provider sees.
  fn peer_cache<T: Entity>(h: &Harness<T>) -> ReadThroughCache<Vec<T>> {
    ReadThroughCache::new(
      T::DOMAIN.namespace(),
      T::DOMAIN.cache_duration(),
      h.store.clone(),
      h.clock.clone(),
    )
  }

  fn category(id: EntityId, name: &str) -> Category {
    Category {
      id,
      name: name.to_string(),
      kind: CategoryKind::Expense,
      color: None,
      icon: None,
    }
  }

  fn alert(id: EntityId, is_read: bool) -> Alert {
    Alert {
      id,
      title: format!("Alert {}", id),
      message: String::new(),
      severity: Default::default(),
      is_read,
      created_at: None,
    }
  }

  fn merchant(id: EntityId, name: &str) -> Merchant {
    Merchant {
      id,
      name: name.to_string(),
      category: None,
      website: None,
    }
  }

  fn receipt(id: EntityId, amount: &str) -> Receipt {
    Receipt {
      id,
      merchant: Some(1),
      merchant_name: None,
      amount: amount.to_string(),
      currency: None,
      date: None,
      image_url: None,
      notes: None,
    }
  }

  fn rule(id: EntityId, pattern: &str) -> CategoryRule {
    CategoryRule {
      id,
      pattern: pattern.to_string(),
      category: 1,
      priority: 0,
      is_active: true,
    }
  }

  #[tokio::test]
  async fn test_cold_start_then_delete() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);

    let init = h.provider.initialize().await;
    assert_eq!(init.source, DataSource::Network);
    assert!(init.revalidation.is_none());
    assert_eq!(h.provider.items(), vec![category(1, "Groceries")]);
    assert_eq!(h.provider.phase(), Phase::Ready);
    assert!(!h.provider.is_loading());

    let entry = h.provider.cached_entry().await.unwrap();
    assert_eq!(entry.value, vec![category(1, "Groceries")]);
    assert_eq!(entry.expires_at_ms, T0 + 5 * 60 * 1000);

    h.provider.delete(1).await.unwrap();
    assert!(h.provider.items().is_empty());
    assert_eq!(h.remote.deleted(), vec![1]);
    // Categories write the patched list back
    assert_eq!(peer_cache(&h).load().await, Some(Vec::new()));
  }

  #[tokio::test]
  async fn test_stale_while_revalidate() {
    let h = harness::<Category>();
    peer_cache(&h).store(&vec![category(1, "Old")]).await;
    let reply = h.remote.push_pending_list();

    let init = h.provider.initialize().await;
    assert_eq!(init.source, DataSource::Cache);
    assert_eq!(h.provider.items(), vec![category(1, "Old")]);
    assert_eq!(h.provider.phase(), Phase::Ready);

    reply.send(Ok(vec![category(1, "New")])).unwrap();
    init.revalidated().await;

    assert_eq!(h.provider.items(), vec![category(1, "New")]);
    assert_eq!(peer_cache(&h).load().await, Some(vec![category(1, "New")]));
    assert!(!h.provider.is_loading());
  }

  #[tokio::test]
  async fn test_background_refresh_failure_keeps_cached_value() {
    let h = harness::<Merchant>();
    peer_cache(&h).store(&vec![merchant(3, "Corner Shop")]).await;
    h.remote.push_list_error("network down");

    let init = h.provider.initialize().await;
    init.revalidated().await;

    assert_eq!(h.provider.items(), vec![merchant(3, "Corner Shop")]);
    assert!(!h.provider.is_loading());
    assert_eq!(h.remote.list_calls(), 1);
  }

  #[tokio::test]
  async fn test_cold_start_network_failure_yields_empty_ready_state() {
    let h = harness::<Receipt>();
    h.remote.push_list_error("network down");

    let init = h.provider.initialize().await;
    assert_eq!(init.source, DataSource::Unavailable);

    let state = h.provider.snapshot();
    assert!(state.data.is_empty());
    assert!(!state.is_loading);
    assert_eq!(state.phase, Phase::Ready);
    assert!(h.store.is_empty());
  }

  #[tokio::test]
  async fn test_expired_cache_goes_to_network() {
    let h = harness::<Alert>();
    peer_cache(&h).store(&Vec::new()).await;
    // Alerts expire after two minutes
    h.clock.advance(2 * 60 * 1000);
    h.remote.push_list(Vec::new());

    let init = h.provider.initialize().await;
    assert_eq!(init.source, DataSource::Network);
  }

  #[tokio::test]
  async fn test_initialize_runs_once() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);

    h.provider.initialize().await;
    let again = h.provider.initialize().await;

    assert_eq!(again.source, DataSource::Memory);
    assert_eq!(h.remote.list_calls(), 1);
  }

  #[tokio::test]
  async fn test_unreadable_cache_falls_back_to_network() {
    let remote = Arc::new(FakeRemote::<Category>::new());
    remote.push_list(vec![category(4, "Fuel")]);
    let provider: CollectionProvider<Category> = CollectionProvider::new(
      remote.clone(),
      Arc::new(FailingStore),
      Arc::new(ManualClock::new(T0)),
    );

    let init = provider.initialize().await;
    assert_eq!(init.source, DataSource::Network);
    assert_eq!(provider.items(), vec![category(4, "Fuel")]);
  }

  #[tokio::test]
  async fn test_refresh_error_propagates_and_keeps_items() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);
    h.provider.initialize().await;

    h.remote.push_list_error("503 Service Unavailable");
    let result = h.provider.refresh(&ListParams::new()).await;

    assert!(result.is_err());
    assert_eq!(h.provider.items(), vec![category(1, "Groceries")]);
    assert!(!h.provider.is_loading());
  }

  #[tokio::test]
  async fn test_later_resolving_refresh_wins() {
    let h = harness::<Category>();
    let reply_a = h.remote.push_pending_list();
    let reply_b = h.remote.push_pending_list();

    let first = h.provider.clone();
    let task_a = tokio::spawn(async move { first.refresh(&ListParams::new()).await });
    while h.remote.list_calls() < 1 {
      tokio::task::yield_now().await;
    }
    let second = h.provider.clone();
    let task_b = tokio::spawn(async move { second.refresh(&ListParams::new()).await });
    while h.remote.list_calls() < 2 {
      tokio::task::yield_now().await;
    }
    assert!(h.provider.is_loading());

    reply_b.send(Ok(vec![category(2, "B")])).unwrap();
    task_b.await.unwrap().unwrap();
    assert_eq!(h.provider.items(), vec![category(2, "B")]);
    assert!(h.provider.is_loading());

    reply_a.send(Ok(vec![category(1, "A")])).unwrap();
    task_a.await.unwrap().unwrap();

    assert_eq!(h.provider.items(), vec![category(1, "A")]);
    assert_eq!(peer_cache(&h).load().await, Some(vec![category(1, "A")]));
    assert!(!h.provider.is_loading());
  }

  #[tokio::test]
  async fn test_get_is_a_pure_lookup() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries"), category(2, "Rent")]);
    h.provider.initialize().await;

    assert_eq!(h.provider.get(2), Some(category(2, "Rent")));
    assert_eq!(h.provider.get(99), None);
    assert_eq!(h.remote.list_calls(), 1);
  }

  #[tokio::test]
  async fn test_category_create_stores_patched_list() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);
    h.provider.initialize().await;

    h.remote.push_entity(category(2, "Salary"));
    let draft = CategoryDraft {
      name: Some("Salary".into()),
      kind: Some(CategoryKind::Income),
      ..Default::default()
    };
    let created = h.provider.create(&draft).await.unwrap();

    assert_eq!(created.id, 2);
    let expected = vec![category(1, "Groceries"), category(2, "Salary")];
    assert_eq!(h.provider.items(), expected);
    assert_eq!(peer_cache(&h).load().await, Some(expected));
  }

  #[tokio::test]
  async fn test_merchant_update_stores_patched_list() {
    let h = harness::<Merchant>();
    h.remote
      .push_list(vec![merchant(1, "Corner Shop"), merchant(2, "Gas & Go")]);
    h.provider.initialize().await;

    h.remote.push_entity(merchant(2, "Gas and Go"));
    let draft = MerchantDraft {
      name: Some("Gas and Go".into()),
      ..Default::default()
    };
    h.provider.update(2, &draft).await.unwrap();

    let expected = vec![merchant(1, "Corner Shop"), merchant(2, "Gas and Go")];
    assert_eq!(h.provider.items(), expected);
    assert_eq!(peer_cache(&h).load().await, Some(expected));
  }

  #[tokio::test]
  async fn test_receipt_create_clears_cache() {
    let h = harness::<Receipt>();
    h.remote.push_list(vec![receipt(1, "9.99")]);
    h.provider.initialize().await;
    assert!(peer_cache(&h).load().await.is_some());

    h.remote.push_entity(receipt(2, "20.00"));
    h.provider
      .create(&ReceiptDraft {
        amount: Some("20.00".into()),
        ..Default::default()
      })
      .await
      .unwrap();

    assert_eq!(h.provider.items().len(), 2);
    assert_eq!(peer_cache(&h).load().await, None);
    assert!(h.store.is_empty());
  }

  #[tokio::test]
  async fn test_alert_mark_read_and_delete_clear_cache() {
    let h = harness::<Alert>();
    let seeded = vec![alert(1, false), alert(2, false)];
    peer_cache(&h).store(&seeded).await;
    h.remote.push_list(seeded);

    let init = h.provider.initialize().await;
    assert_eq!(init.source, DataSource::Cache);
    init.revalidated().await;
    assert!(peer_cache(&h).load().await.is_some());

    h.remote.push_entity(alert(1, true));
    h.provider.mark_read(1).await.unwrap();

    assert!(h.provider.get(1).unwrap().is_read);
    assert_eq!(peer_cache(&h).load().await, None);
    assert!(h.store.is_empty());

    peer_cache(&h).store(&h.provider.items()).await;
    h.provider.delete(2).await.unwrap();

    assert_eq!(h.provider.items().len(), 1);
    assert_eq!(peer_cache(&h).load().await, None);
    assert!(h.store.is_empty());
  }

  #[tokio::test]
  async fn test_rule_update_and_delete_clear_cache() {
    let h = harness::<CategoryRule>();
    h.remote.push_list(vec![rule(1, "uber"), rule(2, "netflix")]);
    h.provider.initialize().await;

    h.remote.push_entity(rule(1, "uber eats"));
    h.provider
      .update(
        1,
        &RuleDraft {
          pattern: Some("uber eats".into()),
          ..Default::default()
        },
      )
      .await
      .unwrap();
    assert_eq!(h.provider.get(1), Some(rule(1, "uber eats")));
    assert_eq!(peer_cache(&h).load().await, None);

    // Repopulate, then delete
    h.remote.push_list(vec![rule(1, "uber eats"), rule(2, "netflix")]);
    h.provider.refresh(&ListParams::new()).await.unwrap();
    assert!(peer_cache(&h).load().await.is_some());

    h.provider.delete(2).await.unwrap();
    assert_eq!(h.provider.items(), vec![rule(1, "uber eats")]);
    assert_eq!(peer_cache(&h).load().await, None);
  }

  #[tokio::test]
  async fn test_failed_mutations_leave_state_and_cache_alone() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);
    h.provider.initialize().await;

    h.remote.push_entity_error("400 Bad Request");
    assert!(h
      .provider
      .create(&CategoryDraft::default())
      .await
      .is_err());

    h.remote.push_entity_error("404 Not Found");
    assert!(h
      .provider
      .update(1, &CategoryDraft::default())
      .await
      .is_err());

    h.remote.push_delete_error("500 Internal Server Error");
    assert!(h.provider.delete(1).await.is_err());

    assert_eq!(h.provider.items(), vec![category(1, "Groceries")]);
    assert_eq!(
      peer_cache(&h).load().await,
      Some(vec![category(1, "Groceries")])
    );
    assert!(h.remote.deleted().is_empty());
  }

  #[tokio::test]
  async fn test_update_of_unknown_id_leaves_list() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);
    h.provider.initialize().await;

    h.remote.push_entity(category(7, "Elsewhere"));
    h.provider
      .update(7, &CategoryDraft::default())
      .await
      .unwrap();
    assert_eq!(h.provider.items(), vec![category(1, "Groceries")]);
  }

  #[tokio::test]
  async fn test_subscribers_see_updates() {
    let h = harness::<Category>();
    let mut rx = h.provider.subscribe();
    h.remote.push_list(vec![category(1, "Groceries")]);

    h.provider.initialize().await;
    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.data, vec![category(1, "Groceries")]);
    assert_eq!(state.phase, Phase::Ready);

    drop(rx);
    // No subscribers left; updates still apply
    h.remote.push_list(Vec::new());
    h.provider.refresh(&ListParams::new()).await.unwrap();
    assert!(h.provider.items().is_empty());
  }

  #[tokio::test]
  async fn test_invalidate_clears_cache_only() {
    let h = harness::<Category>();
    h.remote.push_list(vec![category(1, "Groceries")]);
    h.provider.initialize().await;

    h.provider.invalidate().await;
    assert!(h.provider.cached_entry().await.is_none());
    assert_eq!(h.provider.items(), vec![category(1, "Groceries")]);
  }

  #[tokio::test]
  async fn test_fetch_by_id_does_not_touch_state() {
    let h = harness::<Category>();
    h.remote.push_entity(category(5, "Travel"));

    let fetched = h.provider.fetch_by_id(5).await.unwrap();
    assert_eq!(fetched, category(5, "Travel"));
    assert!(h.provider.items().is_empty());
    assert_eq!(h.provider.phase(), Phase::Uninitialized);
  }
}
