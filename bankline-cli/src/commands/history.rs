//! History command - list an account's transactions

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use bankline_core::AccountId;

use super::get_context;
use crate::output;

pub fn run(account_id: AccountId, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.account_service.get_account(account_id)?;
    let records = ctx.account_service.transaction_history(account_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Account {} ({})", account.id, account.full_name).bold()
    );

    if records.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Type", "Amount", "From", "To", "Effect", "Date"]);
    for record in &records {
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(record.kind),
            output::amount_cell(record.amount),
            Cell::new(record.source_account_id),
            Cell::new(
                record
                    .target_account_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(output::format_signed(record.balance_effect(account_id))),
            Cell::new(record.created_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{}", table);
    println!("Balance: {}", output::format_amount(account.balance));

    Ok(())
}
