//! Bankline Core - accounts, balances and the transaction log
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, TransactionRecord, errors)
//! - **ports**: Trait definitions for storage (AccountStore, TransactionLogStore, UnitOfWork)
//! - **services**: Business logic orchestration (balance mutations, account queries)
//! - **adapters**: Concrete implementations (DuckDB, row locks)
//! - **api**: Request and response shapes for callers

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{AccountService, BalanceService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Account, AccountId, TransactionId, TransactionKind, TransactionRecord};

/// Main context for Bankline operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct BanklineContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub account_service: AccountService<DuckDbRepository>,
    pub balance_service: BalanceService<DuckDbRepository>,
}

impl BanklineContext {
    /// Create a new Bankline context, creating the data directory if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let db_path = config.database_path(data_dir);
        debug!(path = %db_path.display(), "opening database");
        let repository = Arc::new(DuckDbRepository::new(&db_path, config.lock_timeout())?);

        // Initialize schema
        repository.ensure_schema()?;

        Ok(Self {
            account_service: AccountService::new(Arc::clone(&repository)),
            balance_service: BalanceService::new(Arc::clone(&repository)),
            config,
            repository,
        })
    }
}
