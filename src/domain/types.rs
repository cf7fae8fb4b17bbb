use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

/// Whether a category tracks money going out or coming in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
  #[default]
  Expense,
  Income,
}

/// Spending or income category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub id: EntityId,
  pub name: String,
  #[serde(rename = "type", default)]
  pub kind: CategoryKind,
  #[serde(default)]
  pub color: Option<String>,
  #[serde(default)]
  pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<CategoryKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
}

/// Counterparty of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
  pub id: EntityId,
  pub name: String,
  /// Default category for this merchant's transactions
  #[serde(default)]
  pub category: Option<EntityId>,
  #[serde(default)]
  pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MerchantDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub website: Option<String>,
}

/// Scanned or uploaded receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
  pub id: EntityId,
  #[serde(default)]
  pub merchant: Option<EntityId>,
  #[serde(default)]
  pub merchant_name: Option<String>,
  /// Decimal amount as sent by the API, e.g. "12.50"
  #[serde(default)]
  pub amount: String,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default)]
  pub date: Option<NaiveDate>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceiptDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub merchant: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amount: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub currency: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Auto-categorization rule: descriptions containing `pattern` go to `category`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
  pub id: EntityId,
  pub pattern: String,
  pub category: EntityId,
  #[serde(default)]
  pub priority: i32,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
  #[default]
  Info,
  Warning,
  Critical,
}

/// Budget or anomaly notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub id: EntityId,
  pub title: String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub severity: AlertSeverity,
  #[serde(default)]
  pub is_read: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub severity: Option<AlertSeverity>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_read: Option<bool>,
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: EntityId,
  pub name: String,
  pub email: String,
  #[serde(default = "default_currency")]
  pub currency: String,
  #[serde(default)]
  pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub currency: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timezone: Option<String>,
}

fn default_true() -> bool {
  true
}

fn default_currency() -> String {
  "USD".to_string()
}
