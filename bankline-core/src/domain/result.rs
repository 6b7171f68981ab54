//! Result and error types for the core library

use rust_decimal::Decimal;
use thiserror::Error;

use super::AccountId;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Insufficient funds on account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Transient failure at the storage layer (lock timeout, write conflict).
    /// The operation had no effect and may be retried as-is.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::StorageConflict(msg.into())
    }

    /// Whether the caller may retry the failed operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(Error::conflict("lock timeout").is_retryable());
        assert!(!Error::AccountNotFound(7).is_retryable());
        assert!(!Error::validation("bad input").is_retryable());
        assert!(!Error::InsufficientFunds {
            account_id: 1,
            balance: Decimal::new(500, 2),
            requested: Decimal::new(1000, 2),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::AccountNotFound(42).to_string(), "Account not found: 42");
        let err = Error::InsufficientFunds {
            account_id: 3,
            balance: Decimal::new(500, 2),
            requested: Decimal::new(1000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds on account 3: balance 5.00, requested 10.00"
        );
    }
}
