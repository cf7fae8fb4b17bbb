//! Remote data service contracts consumed by the providers.

use async_trait::async_trait;
use color_eyre::Result;

use super::api_types::ListParams;
use crate::domain::{Entity, EntityId, ProfileDraft, UserProfile};

/// CRUD operations of one list endpoint.
///
/// Errors are returned as-is; providers decide whether to absorb them.
#[async_trait]
pub trait RemoteCollection<T: Entity>: Send + Sync {
  async fn list(&self, params: &ListParams) -> Result<Vec<T>>;

  async fn get(&self, id: EntityId) -> Result<T>;

  async fn create(&self, data: &T::Draft) -> Result<T>;

  async fn update(&self, id: EntityId, data: &T::Draft) -> Result<T>;

  async fn delete(&self, id: EntityId) -> Result<()>;
}

/// The signed-in user's profile endpoint.
#[async_trait]
pub trait RemoteProfile: Send + Sync {
  async fn fetch(&self) -> Result<UserProfile>;

  async fn update(&self, data: &ProfileDraft) -> Result<UserProfile>;
}
