//! Request and response shapes at the boundary of the core library
//!
//! Everything here serializes as camelCase JSON. Requests validate
//! themselves before any storage is touched; responses are plain
//! conversions from domain values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{validate_amount, validate_full_name, Account, AccountId};

/// Open a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub full_name: String,
    pub initial_balance: Decimal,
}

impl CreateAccountRequest {
    pub fn validate(&self) -> Result<()> {
        validate_full_name(&self.full_name)?;
        validate_amount(self.initial_balance)?;
        Ok(())
    }
}

/// Deposit into or withdraw from a single account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsRequest {
    pub funds: Decimal,
}

impl FundsRequest {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.funds)?;
        Ok(())
    }
}

/// Move funds between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFundsRequest {
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub funds: Decimal,
}

impl TransferFundsRequest {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.funds)?;
        if self.source_account_id == self.target_account_id {
            return Err(Error::validation(
                "source and target account must be different",
            ));
        }
        Ok(())
    }
}

/// Account as shown to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub full_name: String,
    pub account_number: AccountId,
    pub balance: Decimal,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            full_name: account.full_name.clone(),
            account_number: account.id,
            balance: account.balance,
        }
    }
}

/// Coarse classification of failures for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Unknown account or invalid input
    BadRequest,
    InsufficientFunds,
    /// Transient storage conflict; the same request may be retried
    Conflict,
    Internal,
}

impl ErrorCategory {
    /// HTTP-style status for transports that want one
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCategory::BadRequest | ErrorCategory::InsufficientFunds => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Internal => 500,
        }
    }
}

impl From<&Error> for ErrorCategory {
    fn from(err: &Error) -> Self {
        match err {
            Error::AccountNotFound(_) | Error::Validation(_) => ErrorCategory::BadRequest,
            Error::InsufficientFunds { .. } => ErrorCategory::InsufficientFunds,
            Error::StorageConflict(_) => ErrorCategory::Conflict,
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Failure body returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub category: Option<ErrorCategory>,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            error_message: err.to_string(),
            timestamp: Utc::now(),
            category: Some(ErrorCategory::from(err)),
        }
    }
}
