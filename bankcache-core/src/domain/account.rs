//! Account domain model

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A linked bank account as cached in the store
///
/// The id is the provider's account identifier, globally unique across users.
/// Metadata is overwritten on every upsert; nothing is merged.
/// Note: account_type/subtype are freeform strings using the provider's
/// nomenclature (e.g. "depository"/"checking", "credit"/"credit_card").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub institution: Option<String>,
    pub name: Option<String>,
    pub last_four: Option<String>,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub subtype: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }

    /// Name to show when the provider didn't send one
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
