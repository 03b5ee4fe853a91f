//! Remove command - delete an account and its cached data

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_context;

pub fn run(account_id: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;

    let account = match ctx.repository.get_account(account_id) {
        Ok(account) => account,
        Err(e) if e.is_not_found() => {
            anyhow::bail!("Account '{}' not found", account_id);
        }
        Err(e) => return Err(e.into()),
    };

    // Confirm removal unless --force
    if !force {
        println!(
            "\n{}",
            format!("This will remove '{}' ({}).", account.display_name(), account.id).yellow()
        );
        println!("{}\n", "Its cached balance and transactions are deleted too.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.repository.delete_account(&account.id)?;
    println!("\n{} Account '{}' removed\n", "✓".green(), account.id);

    Ok(())
}
