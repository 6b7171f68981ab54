//! DuckDB repository implementation
//!
//! One root connection owns the database; every unit of work runs on its own
//! cloned connection taken from a small idle pool. Row locks come from the
//! shared [`RowLockTable`] and are always granted before the unit's storage
//! transaction starts, so a locked read sees the latest committed balance.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::row_locks::{LockOwner, RowLockTable};
use crate::domain::result::{Error, Result};
use crate::domain::{
    validate_amount, validate_full_name, Account, AccountId, TransactionKind, TransactionRecord,
    MONEY_SCALE,
};
use crate::ports::{AccountStore, Repository, TransactionLogStore, UnitOfWork};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_SELECT: &str =
    "SELECT account_id, full_name, CAST(balance AS VARCHAR) FROM sys_accounts";

const TRANSACTION_SELECT: &str = "SELECT transaction_id, transaction_type, CAST(funds AS VARCHAR),
            source_account_id, target_account_id, created_at
     FROM sys_transactions";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock on file")
        || lower.contains("database is locked")
}

/// Check if an error message is DuckDB reporting a write-write conflict
/// between two open transactions
fn is_conflict_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("conflict") || lower.contains("transactioncontext error")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        if is_conflict_error(&msg) {
            Error::StorageConflict(msg)
        } else {
            Error::Database(msg)
        }
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
    locks: RowLockTable,
    lock_timeout: Duration,
    next_account_id: AtomicI64,
    next_transaction_id: AtomicI64,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process still holds the database open.
    pub fn new(db_path: &Path, lock_timeout: Duration) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self::with_connection(
                        conn,
                        Some(db_path.to_path_buf()),
                        lock_timeout,
                    ));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    // Non-retryable error or max retries reached
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!(
                "Failed to open database after {} retries",
                MAX_RETRIES
            ))
        }))
    }

    /// Open a private in-memory database
    pub fn open_in_memory(lock_timeout: Duration) -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self::with_connection(conn, None, lock_timeout))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extensions are never needed; autoloading would reach for ~/.duckdb
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: Mutex::new(conn),
            idle: Mutex::new(Vec::new()),
            locks: RowLockTable::new(),
            lock_timeout,
            next_account_id: AtomicI64::new(0),
            next_transaction_id: AtomicI64::new(0),
            db_path,
        }
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock_root()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists and seed key allocation
    ///
    /// Must be called once before the first unit of work.
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;

        let conn = self.lock_root()?;
        let max_account: i64 = conn.query_row(
            "SELECT COALESCE(MAX(account_id), 0) FROM sys_accounts",
            [],
            |row| row.get(0),
        )?;
        let max_transaction: i64 = conn.query_row(
            "SELECT COALESCE(MAX(transaction_id), 0) FROM sys_transactions",
            [],
            |row| row.get(0),
        )?;
        self.next_account_id.fetch_max(max_account, Ordering::SeqCst);
        self.next_transaction_id
            .fetch_max(max_transaction, Ordering::SeqCst);
        Ok(())
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// How long a unit of work waits for a row lock before giving up
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Number of account rows currently locked by open units of work
    pub fn locked_row_count(&self) -> usize {
        self.locks.held_count()
    }

    fn allocate_account_id(&self) -> AccountId {
        self.next_account_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn allocate_transaction_id(&self) -> i64 {
        self.next_transaction_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_root(&self) -> Result<MutexGuard<'_, Connection>> {
        self.root
            .lock()
            .map_err(|_| Error::database("root connection lock poisoned"))
    }

    fn checkout(&self) -> Result<Connection> {
        let pooled = self
            .idle
            .lock()
            .map_err(|_| Error::database("connection pool lock poisoned"))?
            .pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => Ok(self.lock_root()?.try_clone()?),
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn);
        }
    }
}

impl Repository for DuckDbRepository {
    type Work<'a> = DuckDbUnitOfWork<'a>;

    fn begin(&self) -> Result<DuckDbUnitOfWork<'_>> {
        let conn = self.checkout()?;
        let owner = self.locks.new_owner();
        debug!(owner, "unit of work opened");
        Ok(DuckDbUnitOfWork {
            repo: self,
            conn: Some(conn),
            owner,
            locked: Vec::new(),
            state: WorkState::Pending,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkState {
    /// No statement has run yet
    Pending,
    /// The storage transaction is open
    Active,
    /// Committed or rolled back
    Finished,
}

/// A unit of work on one pooled DuckDB connection
///
/// Holds its row locks until it is committed, rolled back, or dropped.
pub struct DuckDbUnitOfWork<'a> {
    repo: &'a DuckDbRepository,
    conn: Option<Connection>,
    owner: LockOwner,
    locked: Vec<AccountId>,
    state: WorkState,
}

impl DuckDbUnitOfWork<'_> {
    /// Connection with the storage transaction started
    fn conn(&mut self) -> Result<&Connection> {
        if self.state == WorkState::Finished {
            return Err(Error::database("unit of work already finished"));
        }
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::database("unit of work has no connection"))?;
        if self.state == WorkState::Pending {
            conn.execute_batch("BEGIN TRANSACTION")?;
            self.state = WorkState::Active;
        }
        Ok(conn)
    }

    /// Reserve rows for this unit of work
    ///
    /// Locks taken after the storage transaction started guard against other
    /// writers, but the snapshot may predate them; a stale write then fails
    /// at commit as a storage conflict.
    fn lock(&mut self, ids: &[AccountId]) -> Result<()> {
        let granted = self
            .repo
            .locks
            .acquire(self.owner, ids, self.repo.lock_timeout)?;
        debug!(owner = self.owner, accounts = ?granted, "row locks granted");
        self.locked.extend(granted);
        Ok(())
    }

    fn query_accounts(&mut self, filter: &str, ids: &[AccountId]) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let sql = format!("{} {} ORDER BY account_id", ACCOUNT_SELECT, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter().copied()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            let (id, full_name, balance) = row?;
            accounts.push(Account::new(id, full_name, parse_decimal(&balance)?));
        }
        Ok(accounts)
    }

    fn finish(&mut self, statement: &str) -> Result<()> {
        if self.state == WorkState::Active {
            if let Some(conn) = self.conn.as_ref() {
                conn.execute_batch(statement)?;
            }
        }
        self.state = WorkState::Finished;
        Ok(())
    }
}

impl AccountStore for DuckDbUnitOfWork<'_> {
    fn create(&mut self, full_name: &str, initial_balance: Decimal) -> Result<Account> {
        validate_full_name(full_name)?;
        let balance = validate_amount(initial_balance)?;
        let full_name = full_name.trim();

        let id = self.repo.allocate_account_id();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_accounts (account_id, full_name, balance, created_at)
             VALUES (?, ?, CAST(? AS DECIMAL(38, 2)), ?)",
            params![id, full_name, balance.to_string(), Utc::now().to_rfc3339()],
        )?;

        Ok(Account::new(id, full_name, balance))
    }

    fn get(&mut self, id: AccountId) -> Result<Account> {
        self.query_accounts("WHERE account_id = ?", &[id])?
            .pop()
            .ok_or(Error::AccountNotFound(id))
    }

    fn list_all(&mut self) -> Result<Vec<Account>> {
        self.query_accounts("", &[])
    }

    fn get_with_lock(&mut self, id: AccountId) -> Result<Account> {
        self.lock(&[id])?;
        self.get(id)
    }

    fn get_many_with_lock(&mut self, ids: &[AccountId]) -> Result<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.lock(ids)?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.query_accounts(&format!("WHERE account_id IN ({})", placeholders), ids)
    }

    fn save(&mut self, account: &Account) -> Result<()> {
        account.validate()?;
        if account.balance.normalize().scale() > MONEY_SCALE {
            return Err(Error::validation(format!(
                "balance {} has more than {} decimal places",
                account.balance, MONEY_SCALE
            )));
        }
        if !self.locked.contains(&account.id) {
            return Err(Error::database(format!(
                "account {} must be locked before it is saved",
                account.id
            )));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sys_accounts
             SET full_name = ?, balance = CAST(? AS DECIMAL(38, 2))
             WHERE account_id = ?",
            params![account.full_name, account.balance.to_string(), account.id],
        )?;
        if updated == 0 {
            return Err(Error::AccountNotFound(account.id));
        }
        Ok(())
    }
}

impl TransactionLogStore for DuckDbUnitOfWork<'_> {
    fn append(
        &mut self,
        kind: TransactionKind,
        amount: Decimal,
        source: &Account,
        target: Option<&Account>,
    ) -> Result<TransactionRecord> {
        let id = self.repo.allocate_transaction_id();
        let created_at = Utc::now();
        let target_account_id = target.map(|t| t.id);

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_transactions (transaction_id, transaction_type, funds,
                                           source_account_id, target_account_id, created_at)
             VALUES (?, ?, CAST(? AS DECIMAL(38, 2)), ?, ?, ?)",
            params![
                id,
                kind.as_str(),
                amount.to_string(),
                source.id,
                target_account_id,
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(TransactionRecord {
            id,
            kind,
            amount,
            source_account_id: source.id,
            target_account_id,
            created_at,
        })
    }

    fn list_for_account(&mut self, account_id: AccountId) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "{} WHERE source_account_id = ? OR target_account_id = ? ORDER BY transaction_id",
            TRANSACTION_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_id, account_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, kind, funds, source_account_id, target_account_id, created_at) = row?;
            records.push(TransactionRecord {
                id,
                kind: kind.parse()?,
                amount: parse_decimal(&funds)?,
                source_account_id,
                target_account_id,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(records)
    }
}

impl UnitOfWork for DuckDbUnitOfWork<'_> {
    fn commit(mut self) -> Result<()> {
        self.finish("COMMIT")?;
        debug!(owner = self.owner, "unit of work committed");
        Ok(())
    }

    fn rollback(mut self) -> Result<()> {
        self.finish("ROLLBACK")?;
        debug!(owner = self.owner, "unit of work rolled back");
        Ok(())
    }
}

impl Drop for DuckDbUnitOfWork<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.state == WorkState::Active {
                match conn.execute_batch("ROLLBACK") {
                    Ok(()) => self.repo.checkin(conn),
                    // the connection may be stuck mid-transaction, don't pool it
                    Err(e) => warn!(owner = self.owner, error = %e, "rollback on drop failed"),
                }
            } else {
                self.repo.checkin(conn);
            }
        }
        // locks go last so no other unit can read before the rollback lands
        self.repo.locks.release(self.owner, &self.locked);
    }
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim())
        .map_err(|e| Error::database(format!("invalid decimal '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}
