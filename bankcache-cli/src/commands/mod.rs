//! CLI command implementations

pub mod accounts;
pub mod balance;
pub mod demo;
pub mod enroll;
pub mod refresh;
pub mod remove;
pub mod serve;
pub mod status;
pub mod transactions;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bankcache_core::BankcacheContext;

/// Get the bankcache directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKCACHE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankcache"))
        .context("Could not find home directory (set BANKCACHE_DIR)")
}

/// Open the context for the configured data directory
pub fn get_context() -> Result<BankcacheContext> {
    let data_dir = get_data_dir()?;
    BankcacheContext::new(&data_dir).context("Failed to initialize bankcache context")
}
