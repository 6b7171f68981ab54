//! Balance service - the only place account balances change
//!
//! Every operation follows the same shape inside one unit of work: locked
//! read, validate, mutate, log, commit. Any failure rolls the unit back, so
//! balances and the transaction log move together or not at all.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::result::{Error, Result};
use crate::domain::{validate_amount, Account, AccountId, TransactionKind, TransactionRecord};
use crate::ports::{AccountStore, Repository, TransactionLogStore, UnitOfWork};

/// Balance service for deposits, withdrawals and transfers
pub struct BalanceService<R: Repository> {
    repository: Arc<R>,
}

impl<R: Repository> BalanceService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Add funds to an account
    pub fn deposit(&self, account_id: AccountId, amount: Decimal) -> Result<TransactionRecord> {
        let amount = validate_amount(amount)?;

        let record = self.repository.begin()?.run(|work| {
            let mut account = work.get_with_lock(account_id)?;
            account.credit(amount)?;
            work.save(&account)?;
            work.append(TransactionKind::Deposit, amount, &account, None)
        })?;

        info!(transaction_id = record.id, account_id, %amount, "deposit committed");
        Ok(record)
    }

    /// Take funds out of an account
    ///
    /// Withdrawing the exact balance is allowed and leaves zero.
    pub fn withdraw(&self, account_id: AccountId, amount: Decimal) -> Result<TransactionRecord> {
        let amount = validate_amount(amount)?;

        let record = self.repository.begin()?.run(|work| {
            let mut account = work.get_with_lock(account_id)?;
            account.debit(amount)?;
            work.save(&account)?;
            work.append(TransactionKind::Withdraw, amount, &account, None)
        })?;

        info!(transaction_id = record.id, account_id, %amount, "withdrawal committed");
        Ok(record)
    }

    /// Move funds between two distinct accounts
    ///
    /// Both rows are locked in a single request, so opposite transfers
    /// between the same pair cannot deadlock.
    pub fn transfer(
        &self,
        source_id: AccountId,
        target_id: AccountId,
        amount: Decimal,
    ) -> Result<TransactionRecord> {
        let amount = validate_amount(amount)?;
        if source_id == target_id {
            return Err(Error::validation(format!(
                "source and target account must differ, got {} twice",
                source_id
            )));
        }

        let record = self.repository.begin()?.run(|work| {
            let locked = work.get_many_with_lock(&[source_id, target_id])?;
            let mut source = take_account(&locked, source_id)?;
            let mut target = take_account(&locked, target_id)?;

            source.debit(amount)?;
            target.credit(amount)?;

            work.save_many(&[source.clone(), target.clone()])?;
            work.append(TransactionKind::Transfer, amount, &source, Some(&target))
        })?;

        info!(
            transaction_id = record.id,
            source_id,
            target_id,
            %amount,
            "transfer committed"
        );
        Ok(record)
    }
}

fn take_account(accounts: &[Account], id: AccountId) -> Result<Account> {
    accounts
        .iter()
        .find(|account| account.id == id)
        .cloned()
        .ok_or(Error::AccountNotFound(id))
}
