//! CLI command implementations

pub mod account;
pub mod funds;
pub mod history;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use bankline_core::api::{ErrorCategory, ErrorResponse};
use bankline_core::BanklineContext;

use crate::output;

/// Get the bankline directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".bankline"))
}

/// Open the bankline context for the data directory
pub fn get_context() -> Result<BanklineContext> {
    let data_dir = get_data_dir()?;
    BanklineContext::new(&data_dir)
        .with_context(|| format!("Failed to open bankline data in {:?}", data_dir))
}

/// Print a failed command as an error body (JSON) or a red message
pub fn report_error(err: &anyhow::Error, json: bool) {
    let core_error = err.downcast_ref::<bankline_core::Error>();

    if json {
        let response = match core_error {
            Some(e) => ErrorResponse::from(e),
            None => ErrorResponse {
                error_message: format!("{:#}", err),
                timestamp: Utc::now(),
                category: Some(ErrorCategory::Internal),
            },
        };
        match serde_json::to_string_pretty(&response) {
            Ok(body) => println!("{}", body),
            Err(_) => output::error(&format!("Error: {:#}", err)),
        }
        return;
    }

    output::error(&format!("Error: {:#}", err));
    if core_error.is_some_and(|e| e.is_retryable()) {
        output::warning("Nothing was changed; the command can be retried.");
    }
}
