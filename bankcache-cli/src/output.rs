//! Output formatting utilities

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned amount cell, outflows in red
pub fn amount_cell(amount: Option<Decimal>) -> Cell {
    let text = match amount {
        Some(value) if value.is_sign_negative() && !value.is_zero() => value.to_string().red().to_string(),
        Some(value) => value.to_string(),
        None => "-".dimmed().to_string(),
    };
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Cache timestamp in local time
pub fn format_cached_at(cached_at: &DateTime<Utc>) -> String {
    cached_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_cell_marks_missing_values() {
        colored::control::set_override(false);
        assert_eq!(amount_cell(None).content(), "-");
        assert_eq!(amount_cell(Some(Decimal::new(-4250, 2))).content(), "-42.50");
        assert_eq!(amount_cell(Some(Decimal::new(100, 0))).content(), "100");
    }
}
