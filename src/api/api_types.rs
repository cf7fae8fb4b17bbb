//! Serde types matching API request and response shapes.
//!
//! These are kept apart from the domain types so wire quirks (envelopes,
//! query strings) never leak into providers.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

// ============================================================================
// List endpoint response
// ============================================================================

/// List endpoints return either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
  Page {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    count: Option<u64>,
  },
  Bare(Vec<T>),
}

impl<T> ListResponse<T> {
  /// Normalize to a plain list.
  pub fn into_items(self) -> Vec<T> {
    match self {
      ListResponse::Page { results, .. } => results,
      ListResponse::Bare(items) => items,
    }
  }

  /// Whether the server reported more pages than this one.
  pub fn has_more(&self) -> bool {
    matches!(self, ListResponse::Page { next: Some(_), .. })
  }
}

// ============================================================================
// Query parameters
// ============================================================================

/// Query string parameters for list requests, kept sorted for stable URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace a parameter.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.0.insert(key.into(), value.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

/// Parses `key=value`.
impl FromStr for ListParams {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    let (key, value) = s
      .split_once('=')
      .ok_or_else(|| eyre!("Expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
      return Err(eyre!("Empty parameter name in '{}'", s));
    }
    Ok(Self::new().with(key, value.trim()))
  }
}

impl FromIterator<ListParams> for ListParams {
  fn from_iter<I: IntoIterator<Item = ListParams>>(iter: I) -> Self {
    let mut merged = BTreeMap::new();
    for params in iter {
      merged.extend(params.0);
    }
    Self(merged)
  }
}
