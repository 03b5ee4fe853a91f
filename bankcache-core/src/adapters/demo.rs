//! Demo data provider
//!
//! Serves a fixed set of accounts with plausible balances and a daily stream
//! of transactions, so the CLI and server can run without Teller credentials.
//! Output is deterministic for a given day: the same ids come back on every
//! call, which keeps repeated refreshes idempotent.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::ports::{AccountDataProvider, AccountSummary, BalanceSnapshot, TransactionRecord};

/// Days of history the demo accounts have
const HISTORY_DAYS: i64 = 120;

struct DemoAccount {
    id: &'static str,
    name: &'static str,
    institution: &'static str,
    last_four: &'static str,
    account_type: &'static str,
    subtype: &'static str,
    /// Ledger balance in cents
    ledger_cents: i64,
    seed: u64,
}

const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        id: "demo_acc_checking",
        name: "Everyday Checking",
        institution: "Chase",
        last_four: "4821",
        account_type: "depository",
        subtype: "checking",
        ledger_cents: 482_347,
        seed: 11,
    },
    DemoAccount {
        id: "demo_acc_savings",
        name: "High-Yield Savings",
        institution: "Marcus by Goldman Sachs",
        last_four: "0937",
        account_type: "depository",
        subtype: "savings",
        ledger_cents: 1_875_000,
        seed: 23,
    },
    DemoAccount {
        id: "demo_acc_credit",
        name: "Sapphire Reserve",
        institution: "Chase",
        last_four: "7702",
        account_type: "credit",
        subtype: "credit_card",
        ledger_cents: -284_763,
        seed: 37,
    },
];

const MERCHANTS: &[&str] = &[
    "WHOLE FOODS MARKET",
    "SHELL OIL",
    "BLUE BOTTLE COFFEE",
    "AMAZON MKTPLACE",
    "UBER TRIP",
    "TRADER JOE'S",
    "NETFLIX.COM",
    "CVS PHARMACY",
];

/// Provider backed by generated data
#[derive(Debug, Default)]
pub struct DemoProvider {
    failing_accounts: HashSet<String>,
}

impl DemoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make balance and transaction calls for `account_id` fail with a 502
    pub fn with_failing_account(mut self, account_id: impl Into<String>) -> Self {
        self.failing_accounts.insert(account_id.into());
        self
    }

    fn account(&self, account_id: &str) -> Result<&'static DemoAccount> {
        if self.failing_accounts.contains(account_id) {
            return Err(Error::provider(Some(502), format!("institution unavailable for {account_id}")));
        }
        DEMO_ACCOUNTS
            .iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| Error::provider(Some(404), format!("account {account_id} not found")))
    }
}

impl AccountDataProvider for DemoProvider {
    fn name(&self) -> &str {
        "demo"
    }

    fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSummary>> {
        check_token(access_token)?;
        Ok(DEMO_ACCOUNTS
            .iter()
            .map(|a| AccountSummary {
                id: a.id.to_string(),
                name: Some(a.name.to_string()),
                institution: Some(a.institution.to_string()),
                last_four: Some(a.last_four.to_string()),
                currency: Some("USD".to_string()),
                account_type: Some(a.account_type.to_string()),
                subtype: Some(a.subtype.to_string()),
            })
            .collect())
    }

    fn get_balance(&self, access_token: &str, account_id: &str) -> Result<BalanceSnapshot> {
        check_token(access_token)?;
        let account = self.account(account_id)?;
        let ledger = Decimal::new(account.ledger_cents, 2);
        // Pending card activity holds back a little of the checking balance
        let available = match account.subtype {
            "checking" => ledger - Decimal::new(12_450, 2),
            _ => ledger,
        };

        Ok(BalanceSnapshot {
            account_id: account.id.to_string(),
            available: Some(available),
            ledger: Some(ledger),
            currency: Some("USD".to_string()),
        })
    }

    fn get_transactions(
        &self,
        access_token: &str,
        account_id: &str,
        count: usize,
    ) -> Result<Vec<TransactionRecord>> {
        check_token(access_token)?;
        let account = self.account(account_id)?;
        let mut transactions = generate_transactions(account, Utc::now().date_naive());
        transactions.truncate(count);
        Ok(transactions)
    }
}

fn check_token(access_token: &str) -> Result<()> {
    if access_token.trim().is_empty() {
        return Err(Error::provider(Some(401), "missing access token"));
    }
    Ok(())
}

/// Newest first, with running balances walking back from the ledger balance
fn generate_transactions(account: &DemoAccount, today: NaiveDate) -> Vec<TransactionRecord> {
    let mut rng = SimpleRng::new(account.seed);
    let mut running = Decimal::new(account.ledger_cents, 2);
    let mut transactions = Vec::new();

    for days_ago in 0..HISTORY_DAYS {
        let date = today - Duration::days(days_ago);
        let mut day: Vec<(Decimal, String, &str)> = Vec::new();

        match account.subtype {
            "checking" => {
                if date.day() == 1 || date.day() == 15 {
                    day.push((Decimal::new(425_000, 2), "ACME CORP PAYROLL".to_string(), "ach"));
                }
                if date.day() == 5 {
                    day.push((Decimal::new(-225_000, 2), "APARTMENT RENT".to_string(), "ach"));
                }
                if rng.next_below(3) == 0 {
                    let merchant = MERCHANTS[rng.next_below(MERCHANTS.len() as u64) as usize];
                    let cents = 300 + rng.next_below(9_000) as i64;
                    day.push((Decimal::new(-cents, 2), merchant.to_string(), "card_payment"));
                }
            }
            "savings" => {
                if date.day() == 16 {
                    day.push((Decimal::new(50_000, 2), "TRANSFER FROM CHECKING".to_string(), "transfer"));
                }
                if date.day() == 28 {
                    let cents = 5_000 + rng.next_below(2_000) as i64;
                    day.push((Decimal::new(cents, 2), "INTEREST PAYMENT".to_string(), "interest"));
                }
            }
            _ => {
                for _ in 0..rng.next_below(3) {
                    let merchant = MERCHANTS[rng.next_below(MERCHANTS.len() as u64) as usize];
                    let cents = 500 + rng.next_below(15_000) as i64;
                    day.push((Decimal::new(-cents, 2), merchant.to_string(), "card_payment"));
                }
                if date.day() == 20 {
                    day.push((Decimal::new(150_000, 2), "PAYMENT THANK YOU".to_string(), "payment"));
                }
            }
        }

        for (n, (amount, description, kind)) in day.into_iter().enumerate() {
            transactions.push(TransactionRecord {
                id: format!("{}_{}_{}", account.id.replace("_acc_", "_txn_"), date.format("%Y%m%d"), n),
                description: Some(description),
                amount,
                date,
                running_balance: Some(running),
                transaction_type: Some(kind.to_string()),
            });
            running -= amount;
        }
    }

    transactions
}

/// Linear congruential generator with a fixed seed per account
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_below(&mut self, bound: u64) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 33) % bound.max(1)
    }
}
