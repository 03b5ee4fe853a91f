//! Cache service - fetch live data from the provider and persist it
//!
//! Two call patterns: priming the cache for a fresh enrollment, and
//! refreshing one account on demand. Neither falls back to cached data on
//! provider failure; callers that want stale data read the repository.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Balance, Transaction, User};
use crate::ports::AccountDataProvider;

/// Transactions fetched per account while priming, unless configured otherwise
pub const DEFAULT_PRIME_TRANSACTION_COUNT: usize = 10;

/// How one account fared during enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountRefresh {
    Cached,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountOutcome {
    pub account_id: String,
    #[serde(flatten)]
    pub refresh: AccountRefresh,
}

/// Result of priming the cache for an enrollment
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentResult {
    pub user: User,
    pub accounts: Vec<Account>,
    /// Accounts whose balance or transactions could not be fetched
    pub partials: Vec<String>,
    pub outcomes: Vec<AccountOutcome>,
}

pub struct CacheService {
    repository: Arc<DuckDbRepository>,
    provider: Arc<dyn AccountDataProvider>,
    prime_transaction_count: usize,
}

impl CacheService {
    pub fn new(repository: Arc<DuckDbRepository>, provider: Arc<dyn AccountDataProvider>) -> Self {
        Self {
            repository,
            provider,
            prime_transaction_count: DEFAULT_PRIME_TRANSACTION_COUNT,
        }
    }

    pub fn with_prime_transaction_count(mut self, count: usize) -> Self {
        self.prime_transaction_count = count.max(1);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Cache everything a new enrollment can see
    ///
    /// The account list is fetched before anything is written, so a provider
    /// failure there leaves the store untouched. After that each account is
    /// fetched independently. A provider failure, or a record the store
    /// rejects, marks the account partial and moves on. A storage failure
    /// aborts the whole enrollment.
    pub fn prime_cache(
        &self,
        user_id: &str,
        access_token: &str,
        display_name: Option<&str>,
    ) -> Result<EnrollmentResult> {
        if user_id.trim().is_empty() || access_token.trim().is_empty() {
            return Err(Error::validation("user id and access token are required"));
        }

        tracing::info!(user_id, provider = self.provider.name(), "priming cache for enrollment");
        let summaries = self.provider.list_accounts(access_token)?;

        let user = self.repository.upsert_user(user_id, access_token, display_name)?;
        let accounts = self.repository.upsert_accounts(user_id, &summaries)?;

        let mut partials = Vec::new();
        let mut outcomes = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let refresh = self.prime_account(access_token, account)?;
            if let AccountRefresh::Failed { reason } = &refresh {
                tracing::warn!(account_id = %account.id, "account partially cached: {}", reason);
                partials.push(account.id.clone());
            }
            outcomes.push(AccountOutcome {
                account_id: account.id.clone(),
                refresh,
            });
        }

        tracing::info!(
            user_id,
            accounts = accounts.len(),
            partials = partials.len(),
            "enrollment cached"
        );

        Ok(EnrollmentResult {
            user,
            accounts,
            partials,
            outcomes,
        })
    }

    /// Balance first, then transactions; a failed balance does not skip transactions
    fn prime_account(&self, access_token: &str, account: &Account) -> Result<AccountRefresh> {
        let mut failures = Vec::new();

        let balance = self
            .provider
            .get_balance(access_token, &account.id)
            .and_then(|snapshot| {
                self.repository.upsert_balance(
                    &account.id,
                    snapshot.available,
                    snapshot.ledger,
                    snapshot.currency.as_deref().or(account.currency.as_deref()),
                    Utc::now(),
                )
            });
        if let Some(reason) = provider_failure(balance)? {
            failures.push(format!("balance: {reason}"));
        }

        let transactions = self
            .provider
            .get_transactions(access_token, &account.id, self.prime_transaction_count)
            .and_then(|records| {
                self.repository
                    .upsert_transactions(&account.id, &records, Utc::now())
            });
        if let Some(reason) = provider_failure(transactions)? {
            failures.push(format!("transactions: {reason}"));
        }

        Ok(if failures.is_empty() {
            AccountRefresh::Cached
        } else {
            AccountRefresh::Failed {
                reason: failures.join("; "),
            }
        })
    }

    /// Fetch and cache the live balance of one account
    pub fn refresh_balance(&self, account_id: &str) -> Result<Balance> {
        let (account, user) = self.owner_of(account_id)?;
        let snapshot = self.provider.get_balance(&user.access_token, account_id)?;

        let balance = self.repository.upsert_balance(
            account_id,
            snapshot.available,
            snapshot.ledger,
            snapshot.currency.as_deref().or(account.currency.as_deref()),
            Utc::now(),
        )?;
        tracing::info!(account_id, "balance refreshed");
        Ok(balance)
    }

    /// Fetch the newest `count` transactions of one account and cache them
    ///
    /// Returns the newest `count` cached rows after pruning.
    pub fn refresh_transactions(&self, account_id: &str, count: usize) -> Result<Vec<Transaction>> {
        if count == 0 {
            return Err(Error::validation("count must be at least 1"));
        }

        let (_, user) = self.owner_of(account_id)?;
        let records = self
            .provider
            .get_transactions(&user.access_token, account_id, count)?;

        self.repository
            .upsert_transactions(account_id, &records, Utc::now())?;
        tracing::info!(account_id, fetched = records.len(), "transactions refreshed");

        self.repository.get_transactions(account_id, count)
    }

    fn owner_of(&self, account_id: &str) -> Result<(Account, User)> {
        let account = self.repository.get_account(account_id)?;
        let user = self.repository.get_user(&account.user_id)?;
        Ok((account, user))
    }
}

/// Provider failures and provider data the store refuses become a reason;
/// anything else propagates
fn provider_failure<T>(result: Result<T>) -> Result<Option<String>> {
    match result {
        Ok(_) => Ok(None),
        Err(err @ (Error::Provider { .. } | Error::Validation(_))) => Ok(Some(err.to_string())),
        Err(err) => Err(err),
    }
}
