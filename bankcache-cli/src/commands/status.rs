//! Status command - show what the cache holds

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        return output::print_json(&status);
    }

    println!("{}", "Cache Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Provider", &status.provider]);
    table.add_row(vec!["Users", &status.counts.users.to_string()]);
    table.add_row(vec!["Accounts", &status.counts.accounts.to_string()]);
    table.add_row(vec!["Balances", &status.counts.balances.to_string()]);
    table.add_row(vec!["Transactions", &status.counts.transactions.to_string()]);
    table.add_row(vec!["Display limit", &status.display_limit.to_string()]);

    println!("{}", table);
    println!();

    if let Some(last) = &status.counts.last_cached_at {
        println!("Last cached: {}", output::format_cached_at(last));
    } else {
        println!("{}", "Nothing cached yet. Use 'bankcache enroll' to add a user.".yellow());
    }
    if let Some(database) = &status.database {
        println!("{}", format!("Database: {}", database).dimmed());
    }

    Ok(())
}
