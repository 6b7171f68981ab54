//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod balance;
pub mod migration;

pub use account::AccountService;
pub use balance::BalanceService;
pub use migration::{MigrationResult, MigrationService};
