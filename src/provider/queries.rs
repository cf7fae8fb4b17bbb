//! Domain-specific lookups and shortcuts on top of the generic provider.

use color_eyre::Result;
use std::cmp::Reverse;

use super::collection::CollectionProvider;
use crate::domain::{
  Alert, AlertDraft, Category, CategoryKind, CategoryRule, EntityId, Merchant, Receipt,
};

impl CollectionProvider<Category> {
  pub fn by_kind(&self, kind: CategoryKind) -> Vec<Category> {
    self
      .items()
      .into_iter()
      .filter(|c| c.kind == kind)
      .collect()
  }
}

impl CollectionProvider<Merchant> {
  /// Case-insensitive substring match on the merchant name.
  pub fn search(&self, query: &str) -> Vec<Merchant> {
    let query = query.trim().to_lowercase();
    self
      .items()
      .into_iter()
      .filter(|m| m.name.to_lowercase().contains(&query))
      .collect()
  }
}

impl CollectionProvider<CategoryRule> {
  /// Highest-priority active rule whose pattern occurs in `description`.
  /// Ties go to the rule listed first.
  pub fn match_description(&self, description: &str) -> Option<CategoryRule> {
    let description = description.to_lowercase();
    self
      .items()
      .into_iter()
      .filter(|r| r.is_active)
      .filter(|r| {
        let pattern = r.pattern.trim().to_lowercase();
        !pattern.is_empty() && description.contains(&pattern)
      })
      .min_by_key(|r| Reverse(r.priority))
  }
}

impl CollectionProvider<Alert> {
  pub fn unread_count(&self) -> usize {
    self.items().iter().filter(|a| !a.is_read).count()
  }

  pub async fn mark_read(&self, id: EntityId) -> Result<Alert> {
    let draft = AlertDraft {
      is_read: Some(true),
      ..Default::default()
    };
    self.update(id, &draft).await
  }
}

impl CollectionProvider<Receipt> {
  /// Sum of receipt amounts for a merchant, in cents.
  /// Amounts that don't parse as decimals are skipped. `None` on overflow.
  pub fn total_for(&self, merchant: EntityId) -> Option<i64> {
    self
      .items()
      .iter()
      .filter(|r| r.merchant == Some(merchant))
      .filter_map(|r| parse_cents(&r.amount))
      .try_fold(0i64, |total, cents| total.checked_add(cents))
  }
}

/// Parse a decimal string such as "12.5" or "-3.07" into cents.
fn parse_cents(amount: &str) -> Option<i64> {
  let amount = amount.trim();
  let (negative, digits) = match amount.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, amount),
  };

  let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
  if whole.is_empty() && fraction.is_empty() {
    return None;
  }
  if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }

  let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
  let fraction: i64 = match fraction.len() {
    0 => 0,
    1 => fraction.parse::<i64>().ok()? * 10,
    _ => fraction.parse().ok()?,
  };

  let cents = whole.checked_mul(100)?.checked_add(fraction)?;
  Some(if negative { -cents } else { cents })
}
