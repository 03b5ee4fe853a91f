//! Transaction domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A cached transaction record
///
/// Sign convention for `amount`: negative is a debit/outflow, positive a
/// credit/inflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub running_balance: Option<Decimal>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_outflow(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}
