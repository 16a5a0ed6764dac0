//! Configuration types for LeadSync components.
//!
//! Every collaborator receives its configuration explicitly at construction.
//! Nothing in this workspace reads process environment below the CLI layer.
//!
//! Tunables can be layered: defaults, then an optional TOML settings file
//! (see [`Settings`]), then CLI flags.

use crate::error::AppError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default CRM API base URL.
pub const DEFAULT_CRM_BASE_URL: &str = "https://api.hubapi.com";

/// Database connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// HTTP client configuration for upstream calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Upper bound for a single upstream request, connect to last byte.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Connection details for the CRM.
#[derive(Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub access_token: String,
}

impl CrmConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }
}

// Keeps the token out of logs and panic messages.
impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// How two emails are compared when looking for duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMatching {
    /// Byte-for-byte comparison.
    #[default]
    Exact,
    /// ASCII case-insensitive comparison.
    CaseInsensitive,
}

/// Batch synchronization configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum number of records per upstream call.
    pub batch_size: usize,
    /// Maximum number of chunks in flight at once.
    pub concurrency: usize,
    pub email_matching: EmailMatching,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
            email_matching: EmailMatching::Exact,
        }
    }
}

impl SyncConfig {
    /// Rejects values that would make the pipeline loop or stall.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::InvalidBatchSize(self.batch_size));
        }
        if self.concurrency == 0 {
            return Err(AppError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }
}

/// Contents of the optional `config.toml` settings file.
///
/// Every key is optional; absent keys keep their defaults.
///
/// ```toml
/// [sync]
/// batch_size = 100
/// concurrency = 4
/// email_matching = "case_insensitive"
///
/// [http]
/// timeout_secs = 30
///
/// [database]
/// max_connections = 5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sync: SyncSection,
    pub http: HttpSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub email_matching: Option<EmailMatching>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub max_connections: Option<u32>,
}

impl Settings {
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            batch_size: self.sync.batch_size.unwrap_or(defaults.batch_size),
            concurrency: self.sync.concurrency.unwrap_or(defaults.concurrency),
            email_matching: self.sync.email_matching.unwrap_or(defaults.email_matching),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        self.http
            .timeout_secs
            .map(|secs| HttpConfig {
                timeout: Duration::from_secs(secs),
            })
            .unwrap_or_default()
    }

    pub fn db_config(&self) -> DbConfig {
        self.database
            .max_connections
            .map(|max_connections| DbConfig { max_connections })
            .unwrap_or_default()
    }
}

/// Returns `<config_dir>/leadsync/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("leadsync").join("config.toml"))
}

/// Loads settings from `path`, or from [`default_config_path`] when `path` is `None`.
///
/// A missing default file yields default settings. A missing explicit file is
/// an error, since the caller asked for it by name.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, AppError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(Settings::default()),
        },
    };

    if !path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| AppError::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| AppError::ConfigError(format!("invalid {}: {}", path.display(), e)))
}
