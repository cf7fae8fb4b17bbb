//! Test doubles for the storage and remote service seams.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::api::{ListParams, RemoteCollection, RemoteProfile};
use crate::cache::KeyValueStore;
use crate::domain::{Entity, EntityId, ProfileDraft, UserProfile};

/// Store whose every operation fails, like a full or unavailable disk.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    Err(eyre!("storage unavailable reading {}", key))
  }

  async fn set(&self, key: &str, _value: &str) -> Result<()> {
    Err(eyre!("quota exceeded writing {}", key))
  }

  async fn remove(&self, key: &str) -> Result<()> {
    Err(eyre!("storage unavailable removing {}", key))
  }
}

pub type Reply<T> = std::result::Result<T, String>;

enum Scripted<T> {
  Ready(Reply<T>),
  Pending(oneshot::Receiver<Reply<T>>),
}

impl<T> Scripted<T> {
  async fn resolve(self) -> Result<T> {
    let reply = match self {
      Scripted::Ready(reply) => reply,
      Scripted::Pending(rx) => rx.await.map_err(|_| eyre!("reply sender dropped"))?,
    };
    reply.map_err(|e| eyre!(e))
  }
}

/// Scripted list endpoint. Each call pops the next queued reply.
pub struct FakeRemote<T> {
  lists: Mutex<VecDeque<Scripted<Vec<T>>>>,
  entities: Mutex<VecDeque<Reply<T>>>,
  deletes: Mutex<VecDeque<Reply<()>>>,
  list_calls: AtomicUsize,
  deleted: Mutex<Vec<EntityId>>,
}

impl<T> Default for FakeRemote<T> {
  fn default() -> Self {
    Self {
      lists: Mutex::new(VecDeque::new()),
      entities: Mutex::new(VecDeque::new()),
      deletes: Mutex::new(VecDeque::new()),
      list_calls: AtomicUsize::new(0),
      deleted: Mutex::new(Vec::new()),
    }
  }
}

impl<T> FakeRemote<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_list(&self, items: Vec<T>) {
    self.lists.lock().unwrap().push_back(Scripted::Ready(Ok(items)));
  }

  pub fn push_list_error(&self, message: &str) {
    self
      .lists
      .lock()
      .unwrap()
      .push_back(Scripted::Ready(Err(message.to_string())));
  }

  /// Queue a list reply that resolves only when the returned sender fires.
  pub fn push_pending_list(&self) -> oneshot::Sender<Reply<Vec<T>>> {
    let (tx, rx) = oneshot::channel();
    self.lists.lock().unwrap().push_back(Scripted::Pending(rx));
    tx
  }

  /// Queue the entity returned by the next get/create/update.
  pub fn push_entity(&self, entity: T) {
    self.entities.lock().unwrap().push_back(Ok(entity));
  }

  pub fn push_entity_error(&self, message: &str) {
    self
      .entities
      .lock()
      .unwrap()
      .push_back(Err(message.to_string()));
  }

  pub fn push_delete_error(&self, message: &str) {
    self
      .deletes
      .lock()
      .unwrap()
      .push_back(Err(message.to_string()));
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }

  pub fn deleted(&self) -> Vec<EntityId> {
    self.deleted.lock().unwrap().clone()
  }

  fn next_entity(&self) -> Result<T> {
    self
      .entities
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err("no scripted entity".to_string()))
      .map_err(|e| eyre!(e))
  }
}

#[async_trait]
impl<T: Entity> RemoteCollection<T> for FakeRemote<T> {
  async fn list(&self, _params: &ListParams) -> Result<Vec<T>> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    let next = self.lists.lock().unwrap().pop_front();
    match next {
      Some(scripted) => scripted.resolve().await,
      None => Err(eyre!("no scripted list reply")),
    }
  }

  async fn get(&self, _id: EntityId) -> Result<T> {
    self.next_entity()
  }

  async fn create(&self, _data: &T::Draft) -> Result<T> {
    self.next_entity()
  }

  async fn update(&self, _id: EntityId, _data: &T::Draft) -> Result<T> {
    self.next_entity()
  }

  async fn delete(&self, id: EntityId) -> Result<()> {
    let reply = self.deletes.lock().unwrap().pop_front().unwrap_or(Ok(()));
    reply.map_err(|e| eyre!(e))?;
    self.deleted.lock().unwrap().push(id);
    Ok(())
  }
}

/// Scripted profile endpoint.
#[derive(Default)]
pub struct FakeProfile {
  replies: Mutex<VecDeque<Scripted<UserProfile>>>,
}

impl FakeProfile {
  pub fn push(&self, profile: UserProfile) {
    self
      .replies
      .lock()
      .unwrap()
      .push_back(Scripted::Ready(Ok(profile)));
  }

  pub fn push_error(&self, message: &str) {
    self
      .replies
      .lock()
      .unwrap()
      .push_back(Scripted::Ready(Err(message.to_string())));
  }

  async fn next(&self) -> Result<UserProfile> {
    let next = self.replies.lock().unwrap().pop_front();
    match next {
      Some(scripted) => scripted.resolve().await,
      None => Err(eyre!("no scripted profile reply")),
    }
  }
}

#[async_trait]
impl RemoteProfile for FakeProfile {
  async fn fetch(&self) -> Result<UserProfile> {
    self.next().await
  }

  async fn update(&self, _data: &ProfileDraft) -> Result<UserProfile> {
    self.next().await
  }
}
