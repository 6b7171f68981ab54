//! Bankline CLI - accounts and transfers from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use bankline_core::config::{Config, DEFAULT_LOG_FILTER};
use bankline_core::AccountId;

mod commands;
mod output;

use commands::{account, funds, history};

/// Bankline - accounts, deposits, withdrawals and transfers
#[derive(Parser)]
#[command(name = "bank", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open, show and list accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Deposit funds into an account
    Deposit {
        /// Account number
        account_id: AccountId,
        /// Amount to deposit
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw funds from an account
    Withdraw {
        /// Account number
        account_id: AccountId,
        /// Amount to withdraw
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transfer funds between two accounts
    Transfer {
        /// Source account number
        #[arg(long)]
        from: AccountId,
        /// Target account number
        #[arg(long)]
        to: AccountId,
        /// Amount to transfer
        #[arg(long)]
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the transaction history of an account
    History {
        /// Account number
        account_id: AccountId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Account { command } => command.json(),
            Commands::Deposit { json, .. }
            | Commands::Withdraw { json, .. }
            | Commands::Transfer { json, .. }
            | Commands::History { json, .. } => *json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let json = cli.command.json();
    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::report_error(&e, json);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Account { command } => account::run(command),
        Commands::Deposit { account_id, amount, json } => funds::run_deposit(account_id, amount, json),
        Commands::Withdraw { account_id, amount, json } => {
            funds::run_withdraw(account_id, amount, json)
        }
        Commands::Transfer { from, to, amount, json } => funds::run_transfer(from, to, amount, json),
        Commands::History { account_id, json } => history::run(account_id, json),
    }
}

/// Log to stderr using `BANKLINE_LOG`, else the configured filter
fn init_tracing() {
    let filter = commands::get_data_dir()
        .ok()
        .and_then(|dir| Config::load(&dir).ok())
        .map(|config| config.log_filter)
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
