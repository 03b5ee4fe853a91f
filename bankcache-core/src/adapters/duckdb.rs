//! DuckDB repository
//!
//! The only code that writes to the cache. Every public mutation takes the
//! connection lock and runs in a single DuckDB transaction, so concurrent
//! refreshes of the same account serialize and a failed batch leaves nothing
//! behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use duckdb::{params, Connection, OptionalExt};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Balance, Transaction, User};
use crate::ports::{AccountSummary, TransactionRecord};
use crate::services::MigrationService;

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Transactions returned by [`DuckDbRepository::upsert_transactions`] unless configured otherwise
pub const DEFAULT_DISPLAY_LIMIT: usize = 10;

const ACCOUNT_COLUMNS: &str = "id, user_id, institution, name, last_four, currency, type, subtype,
     created_at::VARCHAR, updated_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "id, account_id, description, amount::VARCHAR, date::VARCHAR,
     running_balance::VARCHAR, type, cached_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock on file")
}

/// Row counts per cached table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub users: i64,
    pub accounts: i64,
    pub balances: i64,
    pub transactions: i64,
    /// Most recent `cached_at` across balances and transactions
    pub last_cached_at: Option<DateTime<Utc>>,
}

pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    display_limit: usize,
}

impl DuckDbRepository {
    /// Open (or create) the database file and bring its schema up to date
    ///
    /// Opening retries with exponential backoff while another process holds
    /// the file lock, e.g. a CLI command racing a running server.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        let conn = loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => break conn,
                Err(e) if attempt + 1 < MAX_RETRIES && is_retryable_error(&e.to_string()) => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        path = %db_path.display(),
                        attempt = attempt + 1,
                        max_attempts = MAX_RETRIES,
                        "database busy, retrying in {}ms: {}",
                        delay.as_millis(),
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let repo = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path.to_path_buf()),
            display_limit: DEFAULT_DISPLAY_LIMIT,
        };
        repo.ensure_schema()?;
        Ok(repo)
    }

    /// In-memory database, used by tests and the demo server
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let repo = Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: None,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        };
        repo.ensure_schema()?;
        Ok(repo)
    }

    /// Change how many rows `upsert_transactions` returns
    pub fn with_display_limit(mut self, display_limit: usize) -> Self {
        self.display_limit = display_limit;
        self
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Autoloaded extensions from ~/.duckdb can fail signature checks on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Run pending schema migrations
    pub fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.lock()?;
        MigrationService::new(&mut conn).run_pending()?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("database connection lock poisoned"))
    }

    // === User operations ===

    /// Insert or update a user by provider id
    ///
    /// The access token is always overwritten. A `None` display name keeps
    /// whatever name was stored before.
    pub fn upsert_user(
        &self,
        external_id: &str,
        access_token: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = format_timestamp(&now_micros());

        tx.execute(
            "INSERT INTO users (id, access_token, name, created_at, updated_at)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
             ON CONFLICT (id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                name = COALESCE(EXCLUDED.name, users.name),
                updated_at = EXCLUDED.updated_at",
            params![external_id, access_token, display_name, now, now],
        )?;

        let user = query_user(&tx, external_id)?;
        tx.commit()?;
        Ok(user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        let conn = self.lock()?;
        query_user(&conn, user_id)
            .map_err(|e| remap_not_found(e, || format!("user {user_id}")))
    }

    /// Resolve a bearer token to the user it was issued for
    ///
    /// If two users somehow hold the same token the most recently updated wins.
    pub fn get_user_by_token(&self, access_token: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, access_token, name, created_at::VARCHAR FROM users
                 WHERE access_token = ? ORDER BY updated_at DESC LIMIT 1",
                [access_token],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_domain).transpose()
    }

    // === Account operations ===

    /// Insert or update accounts for a user
    ///
    /// Accounts missing from `accounts` are left alone. Existing accounts are
    /// re-pointed at `user_id` and their metadata replaced. Returns the stored
    /// rows in input order, one per distinct id.
    pub fn upsert_accounts(&self, user_id: &str, accounts: &[AccountSummary]) -> Result<Vec<Account>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if !exists(&tx, "SELECT COUNT(*) FROM users WHERE id = ?", user_id)? {
            return Err(Error::not_found(format!("user {user_id}")));
        }

        let now = format_timestamp(&now_micros());
        let mut seen = HashSet::new();
        let mut stored = Vec::new();

        for summary in accounts.iter().filter(|a| seen.insert(a.id.as_str())) {
            let currency = summary.currency.as_deref().map(Account::normalize_currency);
            tx.execute(
                "INSERT INTO accounts (id, user_id, institution, name, last_four, currency, type, subtype,
                                       created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
                 ON CONFLICT (id) DO UPDATE SET
                    user_id = EXCLUDED.user_id,
                    institution = EXCLUDED.institution,
                    name = EXCLUDED.name,
                    last_four = EXCLUDED.last_four,
                    currency = EXCLUDED.currency,
                    type = EXCLUDED.type,
                    subtype = EXCLUDED.subtype,
                    updated_at = EXCLUDED.updated_at",
                params![
                    summary.id,
                    user_id,
                    summary.institution,
                    summary.name,
                    summary.last_four,
                    currency,
                    summary.account_type,
                    summary.subtype,
                    now,
                    now,
                ],
            )?;
            stored.push(query_account(&tx, &summary.id)?);
        }

        tx.commit()?;
        tracing::debug!(user_id, count = stored.len(), "upserted accounts");
        Ok(stored)
    }

    /// Accounts owned by a user, oldest first; empty if the user is unknown
    pub fn get_accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ? ORDER BY created_at, id"
        ))?;
        let rows = stmt
            .query_map([user_id], AccountRow::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        rows.into_iter().map(AccountRow::into_domain).collect()
    }

    pub fn get_account(&self, account_id: &str) -> Result<Account> {
        let conn = self.lock()?;
        query_account(&conn, account_id)
            .map_err(|e| remap_not_found(e, || format!("account {account_id}")))
    }

    /// Remove an account together with its balance and transactions
    pub fn delete_account(&self, account_id: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // No foreign keys in the schema, children go first by convention
        let transactions = tx.execute("DELETE FROM transactions WHERE account_id = ?", [account_id])?;
        tx.execute("DELETE FROM balances WHERE account_id = ?", [account_id])?;
        let removed = tx.execute("DELETE FROM accounts WHERE id = ?", [account_id])?;
        if removed == 0 {
            return Err(Error::not_found(format!("account {account_id}")));
        }

        tx.commit()?;
        tracing::info!(account_id, transactions, "deleted account");
        Ok(())
    }

    // === Balance operations ===

    /// Replace the cached balance of an account
    pub fn upsert_balance(
        &self,
        account_id: &str,
        available: Option<Decimal>,
        ledger: Option<Decimal>,
        currency: Option<&str>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Balance> {
        check_cents("available", available)?;
        check_cents("ledger", ledger)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        ensure_account(&tx, account_id)?;

        let currency = currency.map(Account::normalize_currency);
        tx.execute(
            "INSERT INTO balances (account_id, available, ledger, currency, cached_at)
             VALUES (?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)), ?, CAST(? AS TIMESTAMP))
             ON CONFLICT (account_id) DO UPDATE SET
                available = EXCLUDED.available,
                ledger = EXCLUDED.ledger,
                currency = EXCLUDED.currency,
                cached_at = EXCLUDED.cached_at",
            params![
                account_id,
                available.map(|d| d.to_string()),
                ledger.map(|d| d.to_string()),
                currency,
                format_timestamp(&fetched_at.trunc_subsecs(6)),
            ],
        )?;

        let balance = query_balance(&tx, account_id)?;
        tx.commit()?;
        Ok(balance)
    }

    /// Cached balance of an account; `NotFound` if it was never fetched
    pub fn get_balance(&self, account_id: &str) -> Result<Balance> {
        let conn = self.lock()?;
        query_balance(&conn, account_id)
            .map_err(|e| remap_not_found(e, || format!("balance for account {account_id}")))
    }

    // === Transaction operations ===

    /// Upsert a fetched batch of transactions and prune inside its window
    ///
    /// Rows of the account that are missing from `records` are deleted only
    /// when their date lies between the oldest and newest date of the batch.
    /// History outside that window is kept. An empty batch prunes nothing.
    /// Returns the newest rows of the account, capped at the display limit.
    ///
    /// A batch that reuses a transaction id cached under another account is
    /// rejected as a whole.
    pub fn upsert_transactions(
        &self,
        account_id: &str,
        records: &[TransactionRecord],
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        for record in records {
            check_cents("amount", Some(record.amount))?;
            check_cents("running_balance", record.running_balance)?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        ensure_account(&tx, account_id)?;

        let cached_at = format_timestamp(&fetched_at.trunc_subsecs(6));
        let mut incoming = HashSet::new();
        let batch: Vec<&TransactionRecord> = records
            .iter()
            .filter(|r| incoming.insert(r.id.as_str()))
            .collect();

        {
            let mut owner = tx.prepare("SELECT account_id FROM transactions WHERE id = ?")?;
            for record in &batch {
                let existing: Option<String> = owner
                    .query_row([record.id.as_str()], |row| row.get(0))
                    .optional()?;
                if let Some(other) = existing.filter(|other| other.as_str() != account_id) {
                    return Err(Error::validation(format!(
                        "transaction {} is already cached for account {other}",
                        record.id
                    )));
                }
            }
        }

        for record in &batch {
            tx.execute(
                "INSERT INTO transactions (id, account_id, description, amount, date, type,
                                           running_balance, cached_at)
                 VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DATE), ?,
                         CAST(? AS DECIMAL(18, 2)), CAST(? AS TIMESTAMP))
                 ON CONFLICT (id) DO UPDATE SET
                    description = EXCLUDED.description,
                    amount = EXCLUDED.amount,
                    date = EXCLUDED.date,
                    type = EXCLUDED.type,
                    running_balance = EXCLUDED.running_balance,
                    cached_at = EXCLUDED.cached_at",
                params![
                    record.id,
                    account_id,
                    record.description,
                    record.amount.to_string(),
                    record.date.to_string(),
                    record.transaction_type,
                    record.running_balance.map(|d| d.to_string()),
                    cached_at,
                ],
            )?;
        }

        let window = batch.iter().map(|r| r.date).min().zip(batch.iter().map(|r| r.date).max());
        let mut pruned = 0;
        if let Some((oldest, newest)) = window {
            let mut stmt = tx.prepare(
                "SELECT id FROM transactions
                 WHERE account_id = ? AND date >= CAST(? AS DATE) AND date <= CAST(? AS DATE)",
            )?;
            let in_window = stmt
                .query_map(
                    params![account_id, oldest.to_string(), newest.to_string()],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<duckdb::Result<Vec<_>>>()?;
            drop(stmt);

            for id in in_window.iter().filter(|id| !incoming.contains(id.as_str())) {
                pruned += tx.execute("DELETE FROM transactions WHERE id = ?", [id])?;
            }
        }

        let stored = query_transactions(&tx, account_id, self.display_limit)?;
        tx.commit()?;

        tracing::debug!(
            account_id,
            upserted = batch.len(),
            pruned,
            "upserted transactions"
        );
        Ok(stored)
    }

    /// Cached transactions, newest first, at most `limit` rows
    pub fn get_transactions(&self, account_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        query_transactions(&conn, account_id, limit)
    }

    // === Maintenance ===

    pub fn counts(&self) -> Result<StoreCounts> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };

        let last_cached_at: Option<String> = conn.query_row(
            "SELECT MAX(cached_at)::VARCHAR FROM (
                SELECT cached_at FROM balances UNION ALL SELECT cached_at FROM transactions
             )",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreCounts {
            users: count("users")?,
            accounts: count("accounts")?,
            balances: count("balances")?,
            transactions: count("transactions")?,
            last_cached_at: last_cached_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

// === Row mapping ===

struct UserRow {
    id: String,
    access_token: String,
    name: Option<String>,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            access_token: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_domain(self) -> Result<User> {
        Ok(User {
            id: self.id,
            access_token: self.access_token,
            name: self.name,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct AccountRow {
    id: String,
    user_id: String,
    institution: Option<String>,
    name: Option<String>,
    last_four: Option<String>,
    currency: Option<String>,
    account_type: Option<String>,
    subtype: Option<String>,
    created_at: String,
    updated_at: String,
}

impl AccountRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            institution: row.get(2)?,
            name: row.get(3)?,
            last_four: row.get(4)?,
            currency: row.get(5)?,
            account_type: row.get(6)?,
            subtype: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_domain(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            user_id: self.user_id,
            institution: self.institution,
            name: self.name,
            last_four: self.last_four,
            currency: self.currency,
            account_type: self.account_type,
            subtype: self.subtype,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct TransactionRow {
    id: String,
    account_id: String,
    description: Option<String>,
    amount: String,
    date: String,
    running_balance: Option<String>,
    transaction_type: Option<String>,
    cached_at: String,
}

impl TransactionRow {
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            date: row.get(4)?,
            running_balance: row.get(5)?,
            transaction_type: row.get(6)?,
            cached_at: row.get(7)?,
        })
    }

    fn into_domain(self) -> Result<Transaction> {
        Ok(Transaction {
            id: self.id,
            account_id: self.account_id,
            description: self.description,
            amount: parse_decimal(&self.amount)?,
            date: parse_date(&self.date)?,
            running_balance: self.running_balance.as_deref().map(parse_decimal).transpose()?,
            transaction_type: self.transaction_type,
            cached_at: parse_timestamp(&self.cached_at)?,
        })
    }
}

// === Queries shared by locked methods and open transactions ===

fn query_user(conn: &Connection, user_id: &str) -> Result<User> {
    conn.query_row(
        "SELECT id, access_token, name, created_at::VARCHAR FROM users WHERE id = ?",
        [user_id],
        UserRow::from_row,
    )?
    .into_domain()
}

fn query_account(conn: &Connection, account_id: &str) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"),
        [account_id],
        AccountRow::from_row,
    )?
    .into_domain()
}

fn query_balance(conn: &Connection, account_id: &str) -> Result<Balance> {
    let (account_id, available, ledger, currency, cached_at) = conn.query_row(
        "SELECT account_id, available::VARCHAR, ledger::VARCHAR, currency, cached_at::VARCHAR
         FROM balances WHERE account_id = ?",
        [account_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        },
    )?;

    Ok(Balance {
        account_id,
        available: available.as_deref().map(parse_decimal).transpose()?,
        ledger: ledger.as_deref().map(parse_decimal).transpose()?,
        currency,
        cached_at: parse_timestamp(&cached_at)?,
    })
}

fn query_transactions(conn: &Connection, account_id: &str, limit: usize) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions
         WHERE account_id = ?
         ORDER BY date DESC, cached_at DESC, id ASC
         LIMIT {limit}"
    ))?;
    let rows = stmt
        .query_map([account_id], TransactionRow::from_row)?
        .collect::<duckdb::Result<Vec<_>>>()?;
    rows.into_iter().map(TransactionRow::into_domain).collect()
}

fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(sql, [id], |row| row.get(0))?;
    Ok(count > 0)
}

fn ensure_account(conn: &Connection, account_id: &str) -> Result<()> {
    if exists(conn, "SELECT COUNT(*) FROM accounts WHERE id = ?", account_id)? {
        Ok(())
    } else {
        Err(Error::not_found(format!("account {account_id}")))
    }
}

/// Money columns are DECIMAL(18, 2); finer values would be rounded on insert
fn check_cents(field: &str, value: Option<Decimal>) -> Result<()> {
    match value {
        Some(value) if value.normalize().scale() > 2 => Err(Error::validation(format!(
            "{field} {value} has more than two decimal places"
        ))),
        _ => Ok(()),
    }
}

/// Give the generic "no rows" error a name
fn remap_not_found(err: Error, what: impl FnOnce() -> String) -> Error {
    if err.is_not_found() {
        Error::not_found(what())
    } else {
        err
    }
}

// === Value conversion ===

fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamps are stored as naive UTC
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    parse_naive_datetime(s).map(|naive| naive.and_utc())
}

fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| Error::storage(format!("invalid timestamp '{s}': {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::storage(format!("invalid date '{s}': {e}")))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str_exact(s)
        .or_else(|_| Decimal::from_str(s))
        .map_err(|e| Error::storage(format!("invalid decimal '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip_keeps_microseconds() {
        let ts = Utc::now().trunc_subsecs(6);
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_parse_timestamp_accepts_duckdb_output() {
        let parsed = parse_timestamp("2025-10-10 08:30:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-10-10T08:30:00+00:00");

        let parsed = parse_timestamp("2025-10-10 08:30:00.25").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_timestamp("yesterday"), Err(Error::Storage(_))));
        assert!(matches!(parse_date("10/10/2025"), Err(Error::Storage(_))));
        assert!(matches!(parse_decimal("12,50"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_decimal_parse_is_exact() {
        assert_eq!(parse_decimal("-42.50").unwrap(), Decimal::new(-4250, 2));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_in_memory_repository_starts_empty() {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        assert_eq!(repo.counts().unwrap(), StoreCounts::default());
        assert!(repo.db_path().is_none());
    }

    #[test]
    fn test_unknown_lookups_are_not_found() {
        let repo = DuckDbRepository::open_in_memory().unwrap();

        assert!(repo.get_user("nobody").unwrap_err().is_not_found());
        assert!(repo.get_account("acc_missing").unwrap_err().is_not_found());
        assert!(repo.get_balance("acc_missing").unwrap_err().is_not_found());
        assert!(repo.get_user_by_token("token").unwrap().is_none());
        assert!(repo.get_accounts_for_user("nobody").unwrap().is_empty());
    }
}
