//! Account domain model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Numeric account key, assigned by the store on creation
pub type AccountId = i64;

/// Number of fractional digits kept for every monetary value
pub const MONEY_SCALE: u32 = 2;

/// A customer account holding a single non-negative balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub full_name: String,
    pub balance: Decimal,
}

impl Account {
    pub fn new(id: AccountId, full_name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            balance,
        }
    }

    /// Whether the balance covers `amount`. An exact match is sufficient.
    pub fn has_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Add `amount` to the balance
    ///
    /// Fails with a validation error and leaves the balance untouched when
    /// the sum no longer fits with `MONEY_SCALE` fractional digits.
    pub fn credit(&mut self, amount: Decimal) -> Result<()> {
        let balance = self
            .balance
            .checked_add(amount)
            .and_then(to_money_scale)
            .ok_or_else(|| {
                Error::validation(format!(
                    "crediting {} would exceed the largest balance account {} can hold",
                    amount, self.id
                ))
            })?;
        self.balance = balance;
        Ok(())
    }

    /// Subtract `amount` from the balance
    ///
    /// Fails with `InsufficientFunds` and leaves the balance untouched when
    /// the account cannot cover the amount.
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        if !self.has_funds(amount) {
            return Err(Error::InsufficientFunds {
                account_id: self.id,
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Validate account data
    pub fn validate(&self) -> Result<()> {
        validate_full_name(&self.full_name)?;
        if self.balance < Decimal::ZERO {
            return Err(Error::validation("balance cannot be negative"));
        }
        Ok(())
    }
}

/// Check that a holder name is usable
pub fn validate_full_name(full_name: &str) -> Result<()> {
    if full_name.trim().is_empty() {
        return Err(Error::validation("full name cannot be empty"));
    }
    Ok(())
}

/// Check a monetary amount and bring it to the fixed money scale
///
/// Amounts must be strictly positive and must not carry more fractional
/// digits than `MONEY_SCALE`. Extra precision is rejected, never rounded.
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "amount must be strictly positive, got {}",
            amount
        )));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(Error::validation(format!(
            "amount {} has more than {} decimal places",
            amount, MONEY_SCALE
        )));
    }
    to_money_scale(amount).ok_or_else(|| {
        Error::validation(format!(
            "amount {} is too large to hold {} decimal places",
            amount, MONEY_SCALE
        ))
    })
}

/// `value` with exactly `MONEY_SCALE` fractional digits, if it fits
fn to_money_scale(value: Decimal) -> Option<Decimal> {
    let mut scaled = value;
    // rescale leaves the scale lower when the mantissa would overflow
    scaled.rescale(MONEY_SCALE);
    (scaled.scale() == MONEY_SCALE).then_some(scaled)
}
