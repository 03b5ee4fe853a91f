//! Account data provider port
//!
//! Defines the interface for fetching live account, balance and transaction
//! data from the aggregation API (Teller, demo data, test fakes).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;

/// Account metadata as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: Option<String>,
    pub institution: Option<String>,
    pub last_four: Option<String>,
    pub currency: Option<String>,
    pub account_type: Option<String>,
    pub subtype: Option<String>,
}

impl AccountSummary {
    /// Summary with only the id set
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            institution: None,
            last_four: None,
            currency: None,
            account_type: None,
            subtype: None,
        }
    }
}

/// A live balance reading for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_id: String,
    pub available: Option<Decimal>,
    pub ledger: Option<Decimal>,
    pub currency: Option<String>,
}

/// A transaction as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub running_balance: Option<Decimal>,
    pub transaction_type: Option<String>,
}

/// Live account data source
///
/// Implementations are blocking and must bound every call with a timeout;
/// a timed-out call is reported as [`Error::Provider`](crate::Error::Provider)
/// with no status. The cache layer uses this trait without knowing which
/// provider is behind it.
pub trait AccountDataProvider: Send + Sync {
    /// Provider name (e.g., "teller", "demo")
    fn name(&self) -> &str;

    /// List the accounts the access token can see
    fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSummary>>;

    /// Fetch the current balance of one account
    fn get_balance(&self, access_token: &str, account_id: &str) -> Result<BalanceSnapshot>;

    /// Fetch the most recent `count` transactions of one account
    fn get_transactions(
        &self,
        access_token: &str,
        account_id: &str,
        count: usize,
    ) -> Result<Vec<TransactionRecord>>;
}
