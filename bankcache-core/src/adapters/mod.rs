//! Adapter implementations
//!
//! - DuckDB for the cache repository
//! - Teller HTTP client for AccountDataProvider
//! - Demo data for AccountDataProvider when running without credentials

pub mod demo;
pub mod duckdb;
pub mod teller;

#[cfg(test)]
pub mod teller_mock;
