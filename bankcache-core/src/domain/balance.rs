//! Balance domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// The most recently observed balance of an account
///
/// There is at most one of these per account. A new fetch replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub account_id: String,
    pub available: Option<Decimal>,
    pub ledger: Option<Decimal>,
    pub currency: Option<String>,
    /// When the value was fetched from the provider and persisted
    pub cached_at: DateTime<Utc>,
}
