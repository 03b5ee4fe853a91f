//! Refresh command - refresh several accounts at once
//!
//! Each account gets its own thread. Provider failures are reported per
//! account; a storage failure aborts the command.

use std::thread;

use anyhow::{anyhow, Result};
use colored::Colorize;

use bankcache_core::services::{AccountOutcome, CacheService};
use bankcache_core::{AccountRefresh, CoreResult, Error};

use super::get_context;
use crate::output;

pub fn run(account_ids: &[String], count: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let outcomes = refresh_all(&ctx.cache_service, account_ids, count)?;

    if json {
        return output::print_json(&outcomes);
    }

    for outcome in &outcomes {
        match &outcome.refresh {
            AccountRefresh::Cached => println!("{} {}", "Refreshed:".green(), outcome.account_id),
            AccountRefresh::Failed { reason } => {
                println!("{} {} - {}", "Failed:".red(), outcome.account_id, reason)
            }
        }
    }

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o.refresh, AccountRefresh::Failed { .. }))
        .count();
    if failed > 0 {
        return Err(anyhow!("{} of {} accounts failed to refresh", failed, outcomes.len()));
    }
    Ok(())
}

/// Outcomes come back in the order of `account_ids`
pub fn refresh_all(service: &CacheService, account_ids: &[String], count: usize) -> CoreResult<Vec<AccountOutcome>> {
    thread::scope(|scope| {
        let handles: Vec<_> = account_ids
            .iter()
            .map(|id| scope.spawn(move || refresh_one(service, id, count)))
            .collect();

        handles
            .into_iter()
            .zip(account_ids)
            .map(|(handle, id)| {
                let refresh = handle
                    .join()
                    .map_err(|_| Error::storage(format!("refresh thread for {id} panicked")))??;
                Ok(AccountOutcome {
                    account_id: id.clone(),
                    refresh,
                })
            })
            .collect()
    })
}

fn refresh_one(service: &CacheService, account_id: &str, count: usize) -> CoreResult<AccountRefresh> {
    let mut failures = Vec::new();

    match service.refresh_balance(account_id) {
        Ok(_) => {}
        Err(e @ (Error::Provider { .. } | Error::NotFound(_))) => failures.push(format!("balance: {e}")),
        Err(e) => return Err(e),
    }
    match service.refresh_transactions(account_id, count) {
        Ok(_) => {}
        Err(e @ (Error::Provider { .. } | Error::NotFound(_))) => failures.push(format!("transactions: {e}")),
        Err(e) => return Err(e),
    }

    Ok(if failures.is_empty() {
        AccountRefresh::Cached
    } else {
        AccountRefresh::Failed {
            reason: failures.join("; "),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bankcache_core::adapters::demo::DemoProvider;
    use bankcache_core::adapters::duckdb::DuckDbRepository;

    fn primed_service(provider: DemoProvider) -> (Arc<DuckDbRepository>, CacheService) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        let service = CacheService::new(Arc::clone(&repo), Arc::new(provider));
        service.prime_cache("u1", "demo", None).unwrap();
        (repo, service)
    }

    #[test]
    fn test_refresh_all_keeps_order_and_isolates_failures() {
        let (_, service) = primed_service(DemoProvider::new());
        let ids = vec![
            "demo_acc_credit".to_string(),
            "missing".to_string(),
            "demo_acc_checking".to_string(),
        ];

        let outcomes = refresh_all(&service, &ids, 5).unwrap();

        let order: Vec<_> = outcomes.iter().map(|o| o.account_id.as_str()).collect();
        assert_eq!(order, vec!["demo_acc_credit", "missing", "demo_acc_checking"]);
        assert_eq!(outcomes[0].refresh, AccountRefresh::Cached);
        assert!(matches!(outcomes[1].refresh, AccountRefresh::Failed { .. }));
        assert_eq!(outcomes[2].refresh, AccountRefresh::Cached);
    }

    #[test]
    fn test_refresh_all_reports_provider_failure() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        CacheService::new(Arc::clone(&repo), Arc::new(DemoProvider::new()))
            .prime_cache("u1", "demo", None)
            .unwrap();
        let failing = CacheService::new(
            Arc::clone(&repo),
            Arc::new(DemoProvider::new().with_failing_account("demo_acc_savings")),
        );

        let outcomes = refresh_all(&failing, &["demo_acc_savings".to_string()], 5).unwrap();

        match &outcomes[0].refresh {
            AccountRefresh::Failed { reason } => {
                assert!(reason.contains("balance:"));
                assert!(reason.contains("transactions:"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // The earlier cached balance is still there
        assert!(repo.get_balance("demo_acc_savings").is_ok());
    }
}
