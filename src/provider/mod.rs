//! Domain state providers.
//!
//! A provider owns the in-memory state of one domain, loads it through the
//! read-through cache, revalidates it against the API and publishes every
//! change on a `watch` channel for whatever renders it.

mod collection;
mod profile;
mod queries;
mod state;

pub use collection::CollectionProvider;
pub use profile::ProfileProvider;
pub use state::{Initialized, Phase, ProviderState};

use crate::domain::{Alert, Category, CategoryRule, Merchant, Receipt};

pub type CategoryProvider = CollectionProvider<Category>;
pub type MerchantProvider = CollectionProvider<Merchant>;
pub type ReceiptProvider = CollectionProvider<Receipt>;
pub type RuleProvider = CollectionProvider<CategoryRule>;
pub type AlertProvider = CollectionProvider<Alert>;
