//! Bankcache Core - cached bank data from an aggregation provider
//!
//! Follows a hexagonal layout:
//!
//! - **domain**: cached entities (User, Account, Balance, Transaction) and errors
//! - **ports**: the `AccountDataProvider` trait the cache fetches through
//! - **services**: cache priming/refresh and status
//! - **adapters**: DuckDB repository, Teller client, demo provider

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::AccountDataProvider;
use services::{CacheService, StatusService};

// Re-export commonly used types at crate root
pub use adapters::duckdb::StoreCounts;
pub use domain::result::{Error, Result as CoreResult};
pub use domain::{Account, Balance, Transaction, User};
pub use services::{AccountRefresh, EnrollmentResult};

/// Database file used when demo mode is off
pub const DB_FILENAME: &str = "bankcache.duckdb";
/// Demo data goes to its own file so it never mixes with real enrollments
pub const DEMO_DB_FILENAME: &str = "demo.duckdb";

/// Main context for bankcache operations
///
/// Owns the storage handle and lends it to the services.
pub struct BankcacheContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub cache_service: CacheService,
    pub status_service: StatusService,
}

impl BankcacheContext {
    /// Load config from `data_dir`, open its database and build the provider
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let db_filename = if config.demo_mode {
            DEMO_DB_FILENAME
        } else {
            DB_FILENAME
        };
        let db_path = data_dir.join(db_filename);
        let repository = DuckDbRepository::new(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let provider = config.build_provider()?;
        Ok(Self::from_parts(data_dir, config, repository, provider))
    }

    /// Assemble a context from already-built parts
    pub fn from_parts(
        data_dir: &Path,
        config: Config,
        repository: DuckDbRepository,
        provider: Arc<dyn AccountDataProvider>,
    ) -> Self {
        let repository = Arc::new(repository.with_display_limit(config.cache.display_limit));
        let status_service = StatusService::new(Arc::clone(&repository), provider.name());
        let cache_service = CacheService::new(Arc::clone(&repository), provider)
            .with_prime_transaction_count(config.cache.prime_transaction_count);

        Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            cache_service,
            status_service,
        }
    }
}
