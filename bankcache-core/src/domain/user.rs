//! User domain model

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An enrolled end-user of the aggregation provider
///
/// `id` is the provider's stable user identifier. `access_token` always holds
/// the credential from the most recent enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}
