//! Port definitions
//!
//! Ports define the interfaces for external dependencies. The cache layer
//! depends only on these traits, not on concrete provider clients.

mod data_provider;

pub use data_provider::{AccountDataProvider, AccountSummary, BalanceSnapshot, TransactionRecord};
