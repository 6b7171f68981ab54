//! Account service - opening accounts and reading account state

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::result::Result;
use crate::domain::{validate_amount, validate_full_name, Account, AccountId, TransactionRecord};
use crate::ports::{AccountStore, Repository, TransactionLogStore, UnitOfWork};

/// Account service for creating and querying accounts
pub struct AccountService<R: Repository> {
    repository: Arc<R>,
}

impl<R: Repository> AccountService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Open a new account with a strictly positive opening balance
    pub fn create_account(&self, full_name: &str, initial_balance: Decimal) -> Result<Account> {
        validate_full_name(full_name)?;
        let initial_balance = validate_amount(initial_balance)?;

        let account = self
            .repository
            .begin()?
            .run(|work| work.create(full_name, initial_balance))?;

        info!(account_id = account.id, balance = %account.balance, "account created");
        Ok(account)
    }

    /// Get account by key
    pub fn get_account(&self, id: AccountId) -> Result<Account> {
        self.repository.begin()?.run(|work| work.get(id))
    }

    /// List all accounts, ordered by key
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        self.repository.begin()?.run(|work| work.list_all())
    }

    /// Transactions where the account is source or target, oldest first
    pub fn transaction_history(&self, id: AccountId) -> Result<Vec<TransactionRecord>> {
        self.repository.begin()?.run(|work| {
            work.get(id)?;
            work.list_for_account(id)
        })
    }
}
