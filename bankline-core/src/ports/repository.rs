//! Repository port - storage abstraction for accounts and the transaction log
//!
//! Every read and write happens inside a unit of work. Locked reads keep
//! their rows exclusively reserved until the unit of work commits or rolls
//! back, so the services never see a balance another unit is about to change.

use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::result::Result;
use crate::domain::{Account, AccountId, TransactionKind, TransactionRecord};

/// Keyed account storage
pub trait AccountStore {
    /// Persist a new account and return it with its assigned key
    ///
    /// `initial_balance` must be strictly positive.
    fn create(&mut self, full_name: &str, initial_balance: Decimal) -> Result<Account>;

    /// Get account by key, failing with `AccountNotFound` if absent
    fn get(&mut self, id: AccountId) -> Result<Account>;

    /// Get all accounts, ordered by key
    fn list_all(&mut self) -> Result<Vec<Account>>;

    /// Get account by key and hold an exclusive lock on it until the unit
    /// of work ends
    fn get_with_lock(&mut self, id: AccountId) -> Result<Account>;

    /// Lock every key in `ids` in a single round and return the rows that
    /// exist, ordered by key
    ///
    /// Missing keys are silently absent from the result; callers must
    /// check for them.
    fn get_many_with_lock(&mut self, ids: &[AccountId]) -> Result<Vec<Account>>;

    /// Persist the account's current state
    fn save(&mut self, account: &Account) -> Result<()>;

    /// Persist several accounts
    fn save_many(&mut self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.save(account)?;
        }
        Ok(())
    }
}

/// Append-only log of completed fund movements
pub trait TransactionLogStore {
    /// Record a fund movement
    ///
    /// Only storage-level failures are possible here.
    fn append(
        &mut self,
        kind: TransactionKind,
        amount: Decimal,
        source: &Account,
        target: Option<&Account>,
    ) -> Result<TransactionRecord>;

    /// All records where the account is source or target, oldest first
    fn list_for_account(&mut self, account_id: AccountId) -> Result<Vec<TransactionRecord>>;
}

/// A single atomic unit of storage work
///
/// Dropping a unit of work without committing rolls it back.
pub trait UnitOfWork: AccountStore + TransactionLogStore {
    /// Make every write of this unit durable and visible, then release locks
    fn commit(self) -> Result<()>;

    /// Discard every write of this unit, then release locks
    fn rollback(self) -> Result<()>;

    /// Run `op` inside this unit of work
    ///
    /// Commits when `op` succeeds. On failure the unit is rolled back and the
    /// error from `op` is returned; a failed rollback is only logged.
    fn run<T>(mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T>
    where
        Self: Sized,
    {
        match op(&mut self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Database repository abstraction
///
/// Implementations (adapters) provide the actual storage and locking.
pub trait Repository: Send + Sync {
    type Work<'a>: UnitOfWork
    where
        Self: 'a;

    /// Open a new unit of work
    fn begin(&self) -> Result<Self::Work<'_>>;
}
