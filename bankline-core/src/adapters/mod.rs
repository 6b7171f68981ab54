//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - An in-process row lock table standing in for `SELECT ... FOR UPDATE`

pub mod duckdb;
pub mod row_locks;
