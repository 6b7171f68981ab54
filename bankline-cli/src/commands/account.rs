//! Account command - open, show and list accounts

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Input;
use rust_decimal::Decimal;

use bankline_core::api::{AccountView, CreateAccountRequest};
use bankline_core::AccountId;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account holder's full name
        #[arg(long)]
        name: Option<String>,
        /// Opening balance, must be positive
        #[arg(long)]
        balance: Option<Decimal>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one account
    Get {
        /// Account number
        account_id: AccountId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl AccountCommands {
    pub fn json(&self) -> bool {
        match self {
            AccountCommands::Create { json, .. }
            | AccountCommands::Get { json, .. }
            | AccountCommands::List { json } => *json,
        }
    }
}

pub fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Create { name, balance, json } => run_create(name, balance, json),
        AccountCommands::Get { account_id, json } => run_get(account_id, json),
        AccountCommands::List { json } => run_list(json),
    }
}

fn run_create(name: Option<String>, balance: Option<Decimal>, json: bool) -> Result<()> {
    // Get name interactively if not provided
    let full_name = match name {
        Some(n) => n,
        None => Input::new()
            .with_prompt("Full name")
            .interact_text()?,
    };

    // Get balance interactively if not provided
    let initial_balance = match balance {
        Some(b) => b,
        None => {
            let input: String = Input::new()
                .with_prompt("Opening balance")
                .interact_text()?;
            input
                .trim()
                .parse()
                .with_context(|| format!("Invalid balance amount: {}", input))?
        }
    };

    let request = CreateAccountRequest {
        full_name,
        initial_balance,
    };
    request.validate()?;

    let ctx = get_context()?;
    let account = ctx
        .account_service
        .create_account(&request.full_name, request.initial_balance)?;
    let view = AccountView::from(&account);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        output::success("Account created");
        print_account(&view);
    }

    Ok(())
}

fn run_get(account_id: AccountId, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let view = AccountView::from(&ctx.account_service.get_account(account_id)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_account(&view);
    }

    Ok(())
}

fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let views: Vec<AccountView> = ctx
        .account_service
        .list_accounts()?
        .iter()
        .map(AccountView::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No accounts yet. Open one with `bank account create`.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Account #", "Name", "Balance"]);
    for view in &views {
        table.add_row(vec![
            comfy_table::Cell::new(view.account_number),
            comfy_table::Cell::new(&view.full_name),
            output::amount_cell(view.balance),
        ]);
    }
    println!("{}", table);

    Ok(())
}

fn print_account(view: &AccountView) {
    println!("  {} {}", "Account #:".bold(), view.account_number);
    println!("  {} {}", "Name:".bold(), view.full_name);
    println!("  {} {}", "Balance:".bold(), output::format_amount(view.balance));
}
