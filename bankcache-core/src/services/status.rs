//! Status service - what the cache currently holds

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::{DuckDbRepository, StoreCounts};
use crate::domain::result::Result;

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
    provider: String,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>, provider: impl Into<String>) -> Self {
        Self {
            repository,
            provider: provider.into(),
        }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        Ok(StatusSummary {
            provider: self.provider.clone(),
            database: self
                .repository
                .db_path()
                .map(|p| p.display().to_string()),
            display_limit: self.repository.display_limit(),
            counts: self.repository.counts()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub provider: String,
    /// `None` for an in-memory store
    pub database: Option<String>,
    pub display_limit: usize,
    #[serde(flatten)]
    pub counts: StoreCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_of_empty_store() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        let status = StatusService::new(repo, "demo").get_status().unwrap();

        assert_eq!(status.provider, "demo");
        assert!(status.database.is_none());
        assert_eq!(status.counts.accounts, 0);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["transactions"], 0);
        assert!(json["last_cached_at"].is_null());
    }
}
