//! Transaction log domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::result::Error;

/// Numeric key of a transaction log entry
pub type TransactionId = i64;

/// Kind of fund movement recorded in the transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionKind::Deposit),
            "WITHDRAW" => Ok(TransactionKind::Withdraw),
            "TRANSFER" => Ok(TransactionKind::Transfer),
            other => Err(Error::database(format!("unknown transaction kind '{}'", other))),
        }
    }
}

/// A completed fund movement. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub source_account_id: AccountId,
    /// Present only for transfers
    pub target_account_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Whether the record touches the given account on either side
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.source_account_id == account_id || self.target_account_id == Some(account_id)
    }

    /// Signed effect of this record on the given account's balance
    pub fn balance_effect(&self, account_id: AccountId) -> Decimal {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdraw => -self.amount,
            TransactionKind::Transfer if self.source_account_id == account_id => -self.amount,
            TransactionKind::Transfer => self.amount,
        }
    }
}
