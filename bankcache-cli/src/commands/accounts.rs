//! Accounts command - list cached accounts of a user

use anyhow::Result;
use serde_json::json;

use super::get_context;
use crate::output;

pub fn run(user_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let accounts = ctx.repository.get_accounts_for_user(user_id)?;

    if json {
        return output::print_json(&json!({ "accounts": accounts }));
    }

    if accounts.is_empty() {
        output::warning(&format!("No accounts cached for user '{}'", user_id));
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Account", "Institution", "Name", "Last four", "Type", "Currency"]);
    for account in &accounts {
        table.add_row(vec![
            account.id.as_str(),
            account.institution.as_deref().unwrap_or(""),
            account.display_name(),
            account.last_four.as_deref().unwrap_or(""),
            account.subtype.as_deref().or(account.account_type.as_deref()).unwrap_or(""),
            account.currency.as_deref().unwrap_or(""),
        ]);
    }
    println!("{table}");

    Ok(())
}
