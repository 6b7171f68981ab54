//! Output formatting utilities

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
    eprintln!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned money cell
pub fn amount_cell(amount: Decimal) -> Cell {
    Cell::new(format_amount(amount)).set_alignment(CellAlignment::Right)
}

/// Format money with two decimal places
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Format a balance change with an explicit sign
pub fn format_signed(amount: Decimal) -> String {
    if amount.is_sign_negative() {
        format_amount(amount)
    } else {
        format!("+{}", format_amount(amount))
    }
}
