//! Transactions command - cached or live transactions of one account

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use super::get_context;
use crate::output;

pub fn run(account_id: &str, live: bool, limit: Option<usize>, count: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let transactions = if live {
        ctx.cache_service.refresh_transactions(account_id, count)?
    } else {
        ctx.repository.get_account(account_id)?;
        let limit = limit.unwrap_or_else(|| ctx.repository.display_limit()).max(1);
        ctx.repository.get_transactions(account_id, limit)?
    };

    if json {
        return output::print_json(&serde_json::json!({
            "account_id": account_id,
            "transactions": transactions,
            "cached_at": transactions.first().map(|t| t.cached_at),
        }));
    }

    if transactions.is_empty() {
        output::warning(&format!("No transactions cached for '{}'", account_id));
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Amount", "Type"]);
    for tx in &transactions {
        table.add_row(vec![
            Cell::new(tx.date),
            Cell::new(tx.description.as_deref().unwrap_or("")),
            output::amount_cell(Some(tx.amount)),
            Cell::new(tx.transaction_type.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");

    if let Some(newest) = transactions.iter().map(|t| t.cached_at).max() {
        println!(
            "{}",
            format!(
                "{} transactions, cached at {}",
                transactions.len(),
                output::format_cached_at(&newest)
            )
            .dimmed()
        );
    }

    Ok(())
}
