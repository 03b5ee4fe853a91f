//! Balance command - cached or live balance of one account

use anyhow::Result;
use colored::Colorize;

use bankcache_core::adapters::duckdb::DuckDbRepository;
use bankcache_core::Balance;

use super::get_context;
use crate::output;

pub fn run(account_id: &str, live: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let balance = if live {
        Some(ctx.cache_service.refresh_balance(account_id)?)
    } else {
        cached_balance(&ctx.repository, account_id)?
    };

    let Some(balance) = balance else {
        if json {
            return output::print_json(&serde_json::Value::Null);
        }
        output::warning(&format!("No balance cached for '{}'. Try --live.", account_id));
        return Ok(());
    };

    if json {
        return output::print_json(&balance);
    }

    let mut table = output::create_table();
    table.set_header(vec!["Account", "Available", "Ledger", "Currency"]);
    table.add_row(vec![
        comfy_table::Cell::new(&balance.account_id),
        output::amount_cell(balance.available),
        output::amount_cell(balance.ledger),
        comfy_table::Cell::new(balance.currency.as_deref().unwrap_or("")),
    ]);
    println!("{table}");
    println!(
        "{}",
        format!("Cached at {}", output::format_cached_at(&balance.cached_at)).dimmed()
    );

    Ok(())
}

/// `None` when the account exists but its balance was never fetched
fn cached_balance(repository: &DuckDbRepository, account_id: &str) -> Result<Option<Balance>> {
    // Surface an unknown account before reporting an empty cache
    repository.get_account(account_id)?;
    match repository.get_balance(account_id) {
        Ok(balance) => Ok(Some(balance)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankcache_core::ports::AccountSummary;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn repo_with_account() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.upsert_user("u1", "tok", None).unwrap();
        repo.upsert_accounts("u1", &[AccountSummary::new("a1")]).unwrap();
        repo
    }

    #[test]
    fn test_missing_balance_is_none() {
        let repo = repo_with_account();
        assert!(cached_balance(&repo, "a1").unwrap().is_none());
    }

    #[test]
    fn test_unknown_account_is_an_error() {
        let repo = repo_with_account();
        assert!(cached_balance(&repo, "nope").is_err());
    }

    #[test]
    fn test_cached_balance_is_returned() {
        let repo = repo_with_account();
        repo.upsert_balance("a1", Some(Decimal::new(1250, 2)), None, Some("usd"), Utc::now())
            .unwrap();

        let balance = cached_balance(&repo, "a1").unwrap().unwrap();
        assert_eq!(balance.available, Some(Decimal::new(1250, 2)));
    }
}
