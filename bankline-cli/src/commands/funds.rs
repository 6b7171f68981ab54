//! Deposit, withdraw and transfer commands

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use bankline_core::api::{FundsRequest, TransferFundsRequest};
use bankline_core::{AccountId, TransactionRecord};

use super::get_context;
use crate::output;

pub fn run_deposit(account_id: AccountId, amount: Decimal, json: bool) -> Result<()> {
    FundsRequest { funds: amount }.validate()?;

    let ctx = get_context()?;
    let record = ctx.balance_service.deposit(account_id, amount)?;
    let balance = ctx.account_service.get_account(account_id)?.balance;

    print_result(&record, &[(account_id, balance)], json)
}

pub fn run_withdraw(account_id: AccountId, amount: Decimal, json: bool) -> Result<()> {
    FundsRequest { funds: amount }.validate()?;

    let ctx = get_context()?;
    let record = ctx.balance_service.withdraw(account_id, amount)?;
    let balance = ctx.account_service.get_account(account_id)?.balance;

    print_result(&record, &[(account_id, balance)], json)
}

pub fn run_transfer(from: AccountId, to: AccountId, amount: Decimal, json: bool) -> Result<()> {
    let request = TransferFundsRequest {
        source_account_id: from,
        target_account_id: to,
        funds: amount,
    };
    request.validate()?;

    let ctx = get_context()?;
    let record = ctx.balance_service.transfer(
        request.source_account_id,
        request.target_account_id,
        request.funds,
    )?;
    let from_balance = ctx.account_service.get_account(from)?.balance;
    let to_balance = ctx.account_service.get_account(to)?.balance;

    print_result(&record, &[(from, from_balance), (to, to_balance)], json)
}

/// Print the committed record followed by the balances it touched.
/// Balances are read after commit and may already include later changes.
fn print_result(
    record: &TransactionRecord,
    balances: &[(AccountId, Decimal)],
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    output::success(&format!(
        "{} of {} recorded (transaction {})",
        record.kind,
        output::format_amount(record.amount),
        record.id
    ));
    for (account_id, balance) in balances {
        println!(
            "  {} {}",
            format!("Account {} balance:", account_id).bold(),
            output::format_amount(*balance)
        );
    }

    Ok(())
}
