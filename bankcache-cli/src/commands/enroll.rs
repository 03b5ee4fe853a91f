//! Enroll command - store a user and prime the cache

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use bankcache_core::AccountRefresh;

use super::get_context;
use crate::output;

pub fn run(user_id: &str, token: &str, name: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.cache_service.prime_cache(user_id, token, name)?;

    if json {
        return output::print_json(&result);
    }

    println!(
        "{} {} with {}",
        "Enrolled".green(),
        result.user.name.as_deref().unwrap_or(&result.user.id),
        ctx.cache_service.provider_name()
    );
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Account", "Institution", "Name", "Last four", "Cache"]);
    for (account, outcome) in result.accounts.iter().zip(&result.outcomes) {
        let cache = match &outcome.refresh {
            AccountRefresh::Cached => "cached".green().to_string(),
            AccountRefresh::Failed { .. } => "partial".yellow().to_string(),
        };
        table.add_row(vec![
            Cell::new(&account.id),
            Cell::new(account.institution.as_deref().unwrap_or("")),
            Cell::new(account.display_name()),
            Cell::new(account.last_four.as_deref().unwrap_or("")),
            Cell::new(cache),
        ]);
    }
    println!("{table}");

    for outcome in &result.outcomes {
        if let AccountRefresh::Failed { reason } = &outcome.refresh {
            output::warning(&format!("{}: {}", outcome.account_id, reason));
        }
    }
    if !result.partials.is_empty() {
        println!(
            "{}",
            "Run 'bankcache refresh' for the partial accounts once the provider recovers.".dimmed()
        );
    }

    Ok(())
}
