//! Service layer - orchestration over the repository and provider

mod cache;
pub mod migration;
mod status;

pub use cache::{
    AccountOutcome, AccountRefresh, CacheService, EnrollmentResult, DEFAULT_PRIME_TRANSACTION_COUNT,
};
pub use migration::{MigrationReport, MigrationService};
pub use status::{StatusService, StatusSummary};
