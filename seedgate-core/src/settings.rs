//! Application settings loaded once at startup from a TOML file.
//!
//! Settings are immutable for the lifetime of the process and are threaded
//! explicitly into every collaborator that needs them.

use crate::{ConfigError, CoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_SETTINGS_FILE: &str = "seedgate.toml";
pub const SETTINGS_PATH_ENV: &str = "SEEDGATE_SETTINGS";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    pub transmission: TransmissionSettings,
    pub feeds: Vec<String>,
    pub polling: PollingSettings,
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TransmissionSettings {
    pub host: String,
    pub port: u16,
    pub rpc_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TransmissionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9091,
            rpc_path: "/transmission/rpc".to_string(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

impl TransmissionSettings {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.rpc_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which torrents hold the completion barrier after an admission.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaitScope {
    /// Every torrent the client reports as downloading.
    #[default]
    All,
    /// Only the torrent that was just admitted.
    Admitted,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PollingSettings {
    pub poll_interval_secs: u64,
    pub completion_wait_interval_secs: u64,
    pub feed_timeout_secs: u64,
    pub wait_scope: WaitScope,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            completion_wait_interval_secs: 60,
            feed_timeout_secs: 30,
            wait_scope: WaitScope::All,
        }
    }
}

impl PollingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn completion_wait_interval(&self) -> Duration {
        Duration::from_secs(self.completion_wait_interval_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    pub filter_config: PathBuf,
    pub dedup: PathBuf,
    pub log: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            filter_config: PathBuf::from("config.txt"),
            dedup: PathBuf::from("added_torrents.txt"),
            log: PathBuf::from("log.txt"),
        }
    }
}

impl AppSettings {
    /// Resolves the settings path from the environment, falling back to the default file name.
    pub fn default_path() -> PathBuf {
        std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CoreError> {
        let settings: AppSettings = toml::from_str(contents).map_err(ConfigError::from)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => return Err(CoreError::Io(e)),
        };

        let settings = Self::from_toml_str(&contents)?;
        info!(
            "Loaded settings from {} ({} feeds)",
            path.display(),
            settings.feeds.len()
        );
        Ok(settings)
    }

    /// Like [`AppSettings::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        match Self::load(path) {
            Err(CoreError::Config(ConfigError::FileNotFound { path })) => {
                warn!("Settings file {} not found, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.transmission.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "transmission.host".to_string(),
            }
            .into());
        }
        if self.transmission.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transmission.port".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if !self.transmission.rpc_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "transmission.rpc_path".to_string(),
                value: self.transmission.rpc_path.clone(),
            }
            .into());
        }

        for (field, value) in [
            ("transmission.timeout_secs", self.transmission.timeout_secs),
            ("polling.poll_interval_secs", self.polling.poll_interval_secs),
            (
                "polling.completion_wait_interval_secs",
                self.polling.completion_wait_interval_secs,
            ),
            ("polling.feed_timeout_secs", self.polling.feed_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("{} must be greater than zero", field),
                }
                .into());
            }
        }

        for feed in &self.feeds {
            let parsed = url::Url::parse(feed).map_err(|_| ConfigError::InvalidValue {
                field: "feeds".to_string(),
                value: feed.clone(),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidValue {
                    field: "feeds".to_string(),
                    value: feed.clone(),
                }
                .into());
            }
        }

        Ok(())
    }
}
