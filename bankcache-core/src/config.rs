//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "teller": {
//!     "environment": "development",
//!     "applicationId": "app_abc123",
//!     "certificatePath": "/secrets/teller/certificate.pem",
//!     "privateKeyPath": "/secrets/teller/private_key.pem",
//!     "timeoutSecs": 15
//!   },
//!   "cache": { "displayLimit": 10, "primeTransactionCount": 10 }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::demo::DemoProvider;
use crate::adapters::duckdb::DEFAULT_DISPLAY_LIMIT;
use crate::adapters::teller::{
    TellerClient, TellerIdentity, TellerProvider, DEFAULT_TIMEOUT_SECS, TELLER_BASE_URL,
};
use crate::domain::result::Error;
use crate::ports::AccountDataProvider;
use crate::services::DEFAULT_PRIME_TRANSACTION_COUNT;

pub const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    teller: TellerSettings,
    #[serde(default)]
    cache: CacheSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TellerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    certificate_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prime_transaction_count: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Teller deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TellerEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl TellerEnvironment {
    /// Sandbox is the only environment that works without mTLS
    pub fn requires_certificate(&self) -> bool {
        !matches!(self, Self::Sandbox)
    }
}

impl FromStr for TellerEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(Error::Config(format!(
                "unknown Teller environment '{other}' (expected sandbox, development or production)"
            ))),
        }
    }
}

impl fmt::Display for TellerEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sandbox => "sandbox",
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

#[derive(Debug, Clone)]
pub struct TellerConfig {
    pub environment: TellerEnvironment,
    pub application_id: Option<String>,
    /// Path to the certificate PEM, or the PEM itself
    pub certificate: Option<String>,
    /// Path to the private key PEM, or the PEM itself
    pub private_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub display_limit: usize,
    pub prime_transaction_count: usize,
}

/// Bankcache configuration (resolved view of settings plus environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub teller: TellerConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load config from the data directory
    ///
    /// Environment variables override the file:
    /// `BANKCACHE_DEMO_MODE`, `TELLER_ENVIRONMENT`, `TELLER_APPLICATION_ID`,
    /// `TELLER_CERTIFICATE`, `TELLER_PRIVATE_KEY`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`] with an explicit environment lookup
    pub fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;
        Ok(Self::resolve(raw, env)?)
    }

    fn resolve(raw: SettingsFile, env: impl Fn(&str) -> Option<String>) -> crate::CoreResult<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let demo_mode = match env("BANKCACHE_DEMO_MODE").as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        let environment = match env("TELLER_ENVIRONMENT").or_else(|| raw.teller.environment.clone()) {
            Some(value) => value.parse()?,
            None => TellerEnvironment::default(),
        };

        let teller = TellerConfig {
            environment,
            application_id: env("TELLER_APPLICATION_ID").or_else(|| raw.teller.application_id.clone()),
            certificate: env("TELLER_CERTIFICATE").or_else(|| raw.teller.certificate_path.clone()),
            private_key: env("TELLER_PRIVATE_KEY").or_else(|| raw.teller.private_key_path.clone()),
            base_url: raw
                .teller
                .base_url
                .clone()
                .unwrap_or_else(|| TELLER_BASE_URL.to_string()),
            timeout: Duration::from_secs(raw.teller.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1)),
        };

        let cache = CacheConfig {
            display_limit: raw.cache.display_limit.unwrap_or(DEFAULT_DISPLAY_LIMIT).max(1),
            prime_transaction_count: raw
                .cache
                .prime_transaction_count
                .unwrap_or(DEFAULT_PRIME_TRANSACTION_COUNT)
                .max(1),
        };

        Ok(Self {
            demo_mode,
            teller,
            cache,
        })
    }

    /// Save config to the data directory
    ///
    /// Only `app.demoMode` and the Teller environment are written; everything
    /// else in the file, including keys this crate doesn't know, is preserved.
    /// Values that came from environment overrides are written too.
    /// A file that doesn't parse is left alone and reported as an error.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = parse_settings(&settings_path)?.with_context(|| {
            format!("Refusing to overwrite malformed {}", settings_path.display())
        })?;
        settings.app.demo_mode = self.demo_mode;
        settings.teller.environment = Some(self.teller.environment.to_string());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    /// Build the data provider this configuration selects
    pub fn build_provider(&self) -> Result<Arc<dyn AccountDataProvider>> {
        if self.demo_mode {
            tracing::info!("demo mode enabled, using generated account data");
            return Ok(Arc::new(DemoProvider::new()));
        }

        let identity = self.teller_identity()?;
        let client = TellerClient::new_with_base_url(
            &self.teller.base_url,
            identity.as_ref(),
            self.teller.timeout,
        )?;
        tracing::debug!(
            environment = %self.teller.environment,
            mtls = identity.is_some(),
            "using Teller provider"
        );
        Ok(Arc::new(TellerProvider::new(client)))
    }

    fn teller_identity(&self) -> Result<Option<TellerIdentity>> {
        match (&self.teller.certificate, &self.teller.private_key) {
            (Some(cert), Some(key)) => Ok(Some(TellerIdentity {
                certificate_pem: read_pem(cert).context("Failed to read Teller certificate")?,
                private_key_pem: read_pem(key).context("Failed to read Teller private key")?,
            })),
            _ if self.teller.environment.requires_certificate() => Err(Error::Config(format!(
                "a certificate and private key are required for the {} environment \
                 (set TELLER_CERTIFICATE and TELLER_PRIVATE_KEY)",
                self.teller.environment
            ))
            .into()),
            _ => Ok(None),
        }
    }
}

/// Settings for loading; a malformed file falls back to defaults
fn read_settings(path: &Path) -> Result<SettingsFile> {
    match parse_settings(path)? {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring malformed settings: {}", e);
            Ok(SettingsFile::default())
        }
    }
}

/// I/O errors are fatal, parse errors are left to the caller
fn parse_settings(path: &Path) -> Result<serde_json::Result<SettingsFile>> {
    if !path.exists() {
        return Ok(Ok(SettingsFile::default()));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content))
}

/// Inline PEM content is used as-is, anything else is a file path
fn read_pem(value: &str) -> Result<Vec<u8>> {
    if value.trim_start().starts_with("-----BEGIN") {
        return Ok(value.as_bytes().to_vec());
    }
    let path = PathBuf::from(value);
    std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
}
