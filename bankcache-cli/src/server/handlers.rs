//! Route handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankcache_core::{Account, Balance, BankcacheContext, CoreResult, EnrollmentResult, Error, Transaction, User};

use super::{blocking, ServerError, ServerState};

/// Rows returned by the cached transactions route unless `limit` says otherwise
const DEFAULT_LIMIT: i64 = 10;
/// Upper bound for both `limit` and `count`
const MAX_PAGE: i64 = 100;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    environment: String,
    provider: String,
}

pub async fn healthz(State(state): State<ServerState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        environment: state.ctx.config.teller.environment.to_string(),
        provider: state.ctx.cache_service.provider_name().to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    application_id: Option<String>,
    environment: String,
    api_base_url: &'static str,
    demo_mode: bool,
}

pub async fn runtime_config(State(state): State<ServerState>) -> Json<RuntimeConfig> {
    let config = &state.ctx.config;
    Json(RuntimeConfig {
        application_id: config.teller.application_id.clone(),
        environment: config.teller.environment.to_string(),
        api_base_url: "/api",
        demo_mode: config.demo_mode,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPayload {
    #[serde(alias = "access_token")]
    access_token: Option<String>,
    #[serde(default)]
    user: EnrollmentUser,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollmentUser {
    id: Option<String>,
    name: Option<String>,
}

/// Teller Connect's `{enrollment: {...}}` envelope, or the same fields at top level
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    enrollment: Option<EnrollmentPayload>,
    #[serde(flatten)]
    flat: EnrollmentPayload,
}

pub async fn enroll(
    State(state): State<ServerState>,
    Json(request): Json<EnrollmentRequest>,
) -> Result<Json<EnrollmentResult>, ServerError> {
    let payload = request.enrollment.unwrap_or(request.flat);
    let (Some(access_token), Some(user_id)) = (
        payload.access_token.filter(|t| !t.trim().is_empty()),
        payload.user.id.filter(|id| !id.trim().is_empty()),
    ) else {
        return Err(ServerError::BadRequest(
            "accessToken and user.id are required".to_string(),
        ));
    };
    let name = payload.user.name;

    let result = blocking(&state, move |ctx| {
        ctx.cache_service
            .prime_cache(&user_id, &access_token, name.as_deref())
    })
    .await?;
    Ok(Json(result))
}

#[derive(Serialize)]
pub struct AccountsResponse {
    accounts: Vec<Account>,
}

pub async fn cached_accounts(
    State(state): State<ServerState>,
    Extension(user): Extension<User>,
) -> Result<Json<AccountsResponse>, ServerError> {
    let accounts = blocking(&state, move |ctx| ctx.repository.get_accounts_for_user(&user.id)).await?;
    Ok(Json(AccountsResponse { accounts }))
}

#[derive(Serialize)]
pub struct CachedBalanceResponse {
    account_id: String,
    cached_at: DateTime<Utc>,
    balance: Balance,
}

pub async fn cached_balance(
    State(state): State<ServerState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<String>,
) -> Result<Json<CachedBalanceResponse>, ServerError> {
    let balance = blocking(&state, move |ctx| {
        owned_account(ctx, &user, &account_id)?;
        ctx.repository.get_balance(&account_id)
    })
    .await?;

    Ok(Json(CachedBalanceResponse {
        account_id: balance.account_id.clone(),
        cached_at: balance.cached_at,
        balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    limit: Option<String>,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    account_id: String,
    transactions: Vec<Transaction>,
    cached_at: Option<DateTime<Utc>>,
}

pub async fn cached_transactions(
    State(state): State<ServerState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<TransactionsResponse>, ServerError> {
    let limit = parse_limit(params.limit.as_deref())?;

    let transactions = blocking(&state, {
        let account_id = account_id.clone();
        move |ctx| {
            owned_account(ctx, &user, &account_id)?;
            ctx.repository.get_transactions(&account_id, limit)
        }
    })
    .await?;

    Ok(Json(TransactionsResponse {
        account_id,
        cached_at: transactions.first().map(|t| t.cached_at),
        transactions,
    }))
}

#[derive(Serialize)]
pub struct LiveBalanceResponse {
    account_id: String,
    balance: Balance,
}

pub async fn live_balance(
    State(state): State<ServerState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<String>,
) -> Result<Json<LiveBalanceResponse>, ServerError> {
    let balance = blocking(&state, move |ctx| {
        owned_account(ctx, &user, &account_id)?;
        ctx.cache_service.refresh_balance(&account_id)
    })
    .await?;

    Ok(Json(LiveBalanceResponse {
        account_id: balance.account_id.clone(),
        balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CountParams {
    count: Option<String>,
}

pub async fn live_transactions(
    State(state): State<ServerState>,
    Extension(user): Extension<User>,
    Path(account_id): Path<String>,
    Query(params): Query<CountParams>,
) -> Result<Json<TransactionsResponse>, ServerError> {
    let count = parse_count(params.count.as_deref())?;

    let transactions = blocking(&state, {
        let account_id = account_id.clone();
        move |ctx| {
            owned_account(ctx, &user, &account_id)?;
            ctx.cache_service.refresh_transactions(&account_id, count)
        }
    })
    .await?;

    Ok(Json(TransactionsResponse {
        account_id,
        cached_at: transactions.first().map(|t| t.cached_at),
        transactions,
    }))
}

/// Accounts of other users look the same as missing ones
fn owned_account(ctx: &BankcacheContext, user: &User, account_id: &str) -> CoreResult<Account> {
    let account = ctx.repository.get_account(account_id)?;
    if account.user_id != user.id {
        return Err(Error::not_found(format!("account {account_id}")));
    }
    Ok(account)
}

/// Missing means the default, out of range is clamped, garbage is rejected
fn parse_limit(raw: Option<&str>) -> Result<usize, ServerError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_LIMIT as usize);
    };
    let limit: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ServerError::BadRequest("limit must be an integer".to_string()))?;
    Ok(limit.clamp(1, MAX_PAGE) as usize)
}

fn parse_count(raw: Option<&str>) -> Result<usize, ServerError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_LIMIT as usize);
    };
    match raw.trim().parse::<i64>() {
        Ok(count) if (1..=MAX_PAGE).contains(&count) => Ok(count as usize),
        _ => Err(ServerError::BadRequest(format!(
            "count must be between 1 and {MAX_PAGE}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), 10);
        assert_eq!(parse_limit(Some("25")).unwrap(), 25);
        assert_eq!(parse_limit(Some("1000")).unwrap(), 100);
        assert_eq!(parse_limit(Some("0")).unwrap(), 1);
        assert_eq!(parse_limit(Some("-3")).unwrap(), 1);
        assert!(parse_limit(Some("ten")).is_err());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(None).unwrap(), 10);
        assert_eq!(parse_count(Some("100")).unwrap(), 100);
        assert!(parse_count(Some("0")).is_err());
        assert!(parse_count(Some("101")).is_err());
        assert!(parse_count(Some("1.5")).is_err());
    }
}
