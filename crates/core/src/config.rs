//! Settings and credentials
//!
//! Settings come from built-in defaults, optionally overridden by a TOML
//! file, and are further overridden by command-line flags in the CLI.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use crate::retry::BackoffSchedule;

/// Environment variable overriding the settings directory
pub const CONFIG_DIR_ENV: &str = "PUBLISH_ARTIFACTS_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Backoff schedules for each upload stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delays between attempts to obtain a signed URL
    #[serde(rename = "signed_url_backoff_secs")]
    pub signed_url: BackoffSchedule,
    /// Delays between attempts to send content to a signed URL
    #[serde(rename = "content_backoff_secs")]
    pub content: BackoffSchedule,
    /// Delays between attempts to put an object into the bucket
    #[serde(rename = "object_store_backoff_secs")]
    pub object_store: BackoffSchedule,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            signed_url: BackoffSchedule::signed_url(),
            content: BackoffSchedule::content(),
            object_store: BackoffSchedule::content(),
        }
    }
}

/// Tunables shared by every backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum uploads in flight
    pub concurrency: usize,
    /// Per-request timeout; `None` keeps the client default
    pub request_timeout_secs: Option<u64>,
    /// Stop starting uploads after the first failure
    pub fail_fast: bool,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: WorkerPool::DEFAULT_CONCURRENCY,
            request_timeout_secs: None,
            fail_fast: false,
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or from the default location
    ///
    /// An explicit file must exist. The default file is optional; when it is
    /// missing the built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read settings {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), ?settings, "Loaded settings");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn worker_pool(&self) -> Result<WorkerPool> {
        Ok(WorkerPool::new(self.concurrency)?.fail_fast(self.fail_fast))
    }
}

/// Location of the default settings file
pub fn default_config_path() -> Option<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()?.join("publish-artifacts"),
    };
    Some(dir.join(CONFIG_FILE_NAME))
}

/// Bearer token for the signed-URL file server
///
/// The value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::Config("Authentication token is empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Read the token from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        let value = std::env::var(var)
            .map_err(|_| Error::Config(format!("Missing environment variable {var}")))?;
        Self::new(value)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}
