//! Teller API client
//!
//! Blocking client for the Teller REST API. Requests are authenticated with
//! the application's mTLS certificate and HTTP Basic auth carrying the
//! enrollment access token as username.
//!
//! API Documentation: https://teller.io/docs/api

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::{AccountDataProvider, AccountSummary, BalanceSnapshot, TransactionRecord};

/// Production API URL, used for every Teller environment
pub const TELLER_BASE_URL: &str = "https://api.teller.io";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// API Response Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct TellerAccount {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    institution: Option<TellerInstitution>,
    #[serde(default)]
    last_four: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, rename = "type")]
    account_type: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TellerInstitution {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TellerBalance {
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    available: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    ledger: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TellerTransaction {
    id: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    amount: Decimal,
    date: NaiveDate,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    running_balance: Option<Decimal>,
    #[serde(default, rename = "type")]
    transaction_type: Option<String>,
}

/// Teller sends amounts as strings; accept numbers too without going through f64
fn deserialize_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    decimal_from_json(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a decimal amount, got {value}")))
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => decimal_from_json(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a decimal amount, got {value}"))),
    }
}

fn decimal_from_json(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Teller HTTP Client
// =============================================================================

/// PEM material for Teller's mutual TLS
#[derive(Clone)]
pub struct TellerIdentity {
    pub certificate_pem: Vec<u8>,
    pub private_key_pem: Vec<u8>,
}

impl std::fmt::Debug for TellerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TellerIdentity").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct TellerClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl TellerClient {
    /// Client against the production API
    pub fn new(identity: Option<&TellerIdentity>, timeout: Duration) -> Result<Self> {
        Self::new_with_base_url(TELLER_BASE_URL, identity, timeout)
    }

    pub fn new_with_base_url(
        base_url: &str,
        identity: Option<&TellerIdentity>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid Teller base URL '{base_url}': {e}")))?;

        let mut builder = Client::builder().timeout(timeout);
        if let Some(identity) = identity {
            // rustls wants certificate and key in one PEM buffer
            let mut pem = identity.certificate_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(&identity.private_key_pem);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| Error::Config(format!("invalid Teller certificate or key: {e}")))?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn list_accounts(&self, access_token: &str) -> Result<Vec<TellerAccount>> {
        self.get(access_token, &["accounts"], None)
    }

    fn get_account_balances(&self, access_token: &str, account_id: &str) -> Result<TellerBalance> {
        self.get(access_token, &["accounts", account_id, "balances"], None)
    }

    fn get_account_transactions(
        &self,
        access_token: &str,
        account_id: &str,
        count: usize,
    ) -> Result<Vec<TellerTransaction>> {
        self.get(
            access_token,
            &["accounts", account_id, "transactions"],
            Some(("count", count.to_string())),
        )
    }

    fn get<T: DeserializeOwned>(
        &self,
        access_token: &str,
        segments: &[&str],
        query: Option<(&str, String)>,
    ) -> Result<T> {
        let url = self.url(segments, query)?;
        tracing::debug!(path = url.path(), "GET teller");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, basic_auth_header(access_token))
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| self.map_request_error(e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "teller request failed");
            return Err(Error::provider(Some(status.as_u16()), error_message(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::provider(Some(status.as_u16()), format!("unexpected Teller response: {e}"))
        })
    }

    fn url(&self, segments: &[&str], query: Option<(&str, String)>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Teller base URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, &value);
        }
        Ok(url)
    }

    /// No response was received: timeouts, refused connections, TLS failures
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::provider(None, format!("request timed out after {}s", self.timeout.as_secs_f32()))
        } else if error.is_connect() {
            Error::provider(None, format!("could not connect to Teller: {error}"))
        } else {
            Error::provider(None, error.to_string())
        }
    }
}

/// Turn a Teller access token into an HTTP Basic header value
///
/// The token is the username with an empty password. A `Bearer ` prefix is
/// stripped and an already-encoded `Basic ` value passes through unchanged.
pub fn basic_auth_header(token: &str) -> String {
    let token = token.trim();
    let prefixed = |prefix: &str| {
        token
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };

    if prefixed("basic ") {
        return token.to_string();
    }
    let token = if prefixed("bearer ") { token[7..].trim() } else { token };
    format!("Basic {}", BASE64.encode(format!("{token}:")))
}

/// Teller error bodies look like {"error": {"code": "...", "message": "..."}}
fn error_message(body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    match error {
        Some(JsonValue::Object(obj)) => {
            let code = obj.get("code").and_then(JsonValue::as_str);
            let message = obj.get("message").and_then(JsonValue::as_str);
            match (code, message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (Some(text), None) | (None, Some(text)) => text.to_string(),
                (None, None) => body.to_string(),
            }
        }
        Some(JsonValue::String(message)) => message.clone(),
        _ => body.trim().to_string(),
    }
}

// =============================================================================
// TellerProvider - implements AccountDataProvider
// =============================================================================

#[derive(Debug)]
pub struct TellerProvider {
    client: TellerClient,
}

impl TellerProvider {
    pub fn new(client: TellerClient) -> Self {
        Self { client }
    }
}

impl AccountDataProvider for TellerProvider {
    fn name(&self) -> &str {
        "teller"
    }

    fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSummary>> {
        let accounts = self.client.list_accounts(access_token)?;
        Ok(accounts.into_iter().map(map_account).collect())
    }

    fn get_balance(&self, access_token: &str, account_id: &str) -> Result<BalanceSnapshot> {
        let balance = self.client.get_account_balances(access_token, account_id)?;
        Ok(BalanceSnapshot {
            account_id: account_id.to_string(),
            available: balance.available,
            ledger: balance.ledger,
            currency: balance.currency,
        })
    }

    fn get_transactions(
        &self,
        access_token: &str,
        account_id: &str,
        count: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let transactions = self
            .client
            .get_account_transactions(access_token, account_id, count)?;
        Ok(transactions.into_iter().map(map_transaction).collect())
    }
}

fn map_account(account: TellerAccount) -> AccountSummary {
    // Prefer the institution's display name, fall back to its id
    let institution = account
        .institution
        .and_then(|inst| inst.name.filter(|n| !n.trim().is_empty()).or(inst.id));

    AccountSummary {
        id: account.id,
        name: account.name,
        institution,
        last_four: account.last_four,
        currency: account.currency,
        account_type: account.account_type,
        subtype: account.subtype,
    }
}

fn map_transaction(tx: TellerTransaction) -> TransactionRecord {
    TransactionRecord {
        id: tx.id,
        description: tx.description.filter(|d| !d.trim().is_empty()),
        amount: tx.amount,
        date: tx.date,
        running_balance: tx.running_balance,
        transaction_type: tx.transaction_type,
    }
}
