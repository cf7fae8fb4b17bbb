//! Data domains mirrored from the API and their per-domain cache settings.

mod types;

pub use types::{
  Alert, AlertDraft, AlertSeverity, Category, CategoryDraft, CategoryKind, CategoryRule, Merchant,
  MerchantDraft, ProfileDraft, Receipt, ReceiptDraft, RuleDraft, UserProfile,
};

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};

/// Server-assigned identifier shared by every entity.
pub type EntityId = u64;

/// What a provider does with the persistent cache after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPolicy {
  /// Write the locally patched value back to the cache
  StorePatched,
  /// Drop the cache so the next cold start refetches
  Clear,
}

/// One category of persisted business entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
  Categories,
  Merchants,
  Receipts,
  Rules,
  Alerts,
  Profile,
}

impl Domain {
  pub const ALL: [Domain; 6] = [
    Domain::Categories,
    Domain::Merchants,
    Domain::Receipts,
    Domain::Rules,
    Domain::Alerts,
    Domain::Profile,
  ];

  /// Cache key namespace.
  pub fn namespace(self) -> &'static str {
    match self {
      Self::Categories => "categories",
      Self::Merchants => "merchants",
      Self::Receipts => "receipts",
      Self::Rules => "rules",
      Self::Alerts => "alerts",
      Self::Profile => "profile",
    }
  }

  /// REST path segment, relative to the API base URL.
  pub fn endpoint(self) -> &'static str {
    match self {
      Self::Categories => "categories/",
      Self::Merchants => "merchants/",
      Self::Receipts => "receipts/",
      Self::Rules => "category-rules/",
      Self::Alerts => "alerts/",
      Self::Profile => "profile/",
    }
  }

  /// How long a cached snapshot is served before it counts as missing.
  pub fn cache_duration(self) -> Duration {
    match self {
      Self::Alerts => Duration::minutes(2),
      Self::Profile => Duration::minutes(10),
      Self::Categories | Self::Merchants | Self::Receipts | Self::Rules => Duration::minutes(5),
    }
  }

  pub fn mutation_policy(self) -> MutationPolicy {
    match self {
      Self::Categories | Self::Merchants | Self::Profile => MutationPolicy::StorePatched,
      Self::Receipts | Self::Rules | Self::Alerts => MutationPolicy::Clear,
    }
  }

  /// Parse a namespace back into a domain.
  pub fn from_namespace(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|d| d.namespace() == name)
  }
}

impl std::fmt::Display for Domain {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.namespace())
  }
}

/// Trait for list entities a provider can hold and cache.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Payload for create and partial update requests.
  type Draft: Serialize + Send + Sync;

  /// Domain this entity belongs to.
  const DOMAIN: Domain;

  fn id(&self) -> EntityId;
}

impl Entity for Category {
  type Draft = CategoryDraft;
  const DOMAIN: Domain = Domain::Categories;

  fn id(&self) -> EntityId {
    self.id
  }
}

impl Entity for Merchant {
  type Draft = MerchantDraft;
  const DOMAIN: Domain = Domain::Merchants;

  fn id(&self) -> EntityId {
    self.id
  }
}

impl Entity for Receipt {
  type Draft = ReceiptDraft;
  const DOMAIN: Domain = Domain::Receipts;

  fn id(&self) -> EntityId {
    self.id
  }
}

impl Entity for CategoryRule {
  type Draft = RuleDraft;
  const DOMAIN: Domain = Domain::Rules;

  fn id(&self) -> EntityId {
    self.id
  }
}

impl Entity for Alert {
  type Draft = AlertDraft;
  const DOMAIN: Domain = Domain::Alerts;

  fn id(&self) -> EntityId {
    self.id
  }
}
