use super::{Config, SweepConfig};
use crate::retention::{RetentionAnchor, RetentionPolicy};
use crate::types::key::{Actor, Bucket};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest retention window accepted from configuration (ten years).
const MAX_RETENTION_DAYS: u32 = 3650;

/// Operator-facing configuration, persisted as TOML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Returns the config file path within the given data directory.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join("reclaim.toml")
    }

    /// Loads config from a TOML file. Returns default config if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, AppConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), AppConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates config values and returns list of validation errors.
    /// Returns empty vec if config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.retention.retention_days > MAX_RETENTION_DAYS {
            errors.push(format!(
                "retention_days must be at most {MAX_RETENTION_DAYS}"
            ));
        }

        if self.sweep.interval_secs == 0 {
            errors.push("sweep.interval_secs must be at least 1".to_string());
        }

        if Bucket::try_new(self.storage.trash_bucket.as_str()).is_err() {
            errors.push(format!(
                "storage.trash_bucket is not a valid bucket name: {:?}",
                self.storage.trash_bucket
            ));
        }

        if Bucket::try_new(self.storage.artifact_bucket.as_str()).is_err() {
            errors.push(format!(
                "storage.artifact_bucket is not a valid bucket name: {:?}",
                self.storage.artifact_bucket
            ));
        }

        if self.storage.trash_bucket == self.storage.artifact_bucket {
            errors.push("storage.trash_bucket must differ from storage.artifact_bucket".to_string());
        }

        for (token, actor) in &self.auth.tokens {
            if token.trim().is_empty() {
                errors.push("auth.tokens contains an empty token".to_string());
            }
            if Actor::try_new(actor.as_str()).is_err() {
                errors.push(format!("auth.tokens maps to an invalid actor: {actor:?}"));
            }
        }

        errors
    }

    /// Returns a validated config, replacing invalid values with defaults.
    pub fn with_defaults_for_invalid(&self) -> Self {
        let defaults = Self::default();
        let mut fixed = self.clone();

        if fixed.retention.retention_days > MAX_RETENTION_DAYS {
            fixed.retention.retention_days = defaults.retention.retention_days;
        }
        if fixed.sweep.interval_secs == 0 {
            fixed.sweep.interval_secs = defaults.sweep.interval_secs;
        }
        if Bucket::try_new(fixed.storage.trash_bucket.as_str()).is_err()
            || fixed.storage.trash_bucket == fixed.storage.artifact_bucket
        {
            fixed.storage.trash_bucket = defaults.storage.trash_bucket;
        }
        if Bucket::try_new(fixed.storage.artifact_bucket.as_str()).is_err() {
            fixed.storage.artifact_bucket = defaults.storage.artifact_bucket;
        }
        fixed
            .auth
            .tokens
            .retain(|token, actor| !token.trim().is_empty() && Actor::try_new(actor.as_str()).is_ok());

        fixed
    }

    /// Resolves the sections the core needs into a [`Config`].
    pub fn core_config(&self) -> Result<Config, AppConfigError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(AppConfigError::Invalid(errors.join("; ")));
        }

        let trash_bucket = Bucket::try_new(self.storage.trash_bucket.as_str())
            .map_err(|e| AppConfigError::Invalid(e.to_string()))?;
        let artifact_bucket = Bucket::try_new(self.storage.artifact_bucket.as_str())
            .map_err(|e| AppConfigError::Invalid(e.to_string()))?;

        Ok(Config {
            data_dir: self.storage.data_dir.clone(),
            trash_bucket,
            artifact_bucket,
            retention: RetentionPolicy::from_days(
                self.retention.retention_days,
                self.retention.anchor,
            ),
            sweep: SweepConfig::from(&self.sweep),
        })
    }
}

/// Where the ledger and objects live.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_objects_dir")]
    pub objects_dir: PathBuf,
    #[serde(default = "default_trash_bucket")]
    pub trash_bucket: String,
    #[serde(default = "default_artifact_bucket")]
    pub artifact_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            objects_dir: default_objects_dir(),
            trash_bucket: default_trash_bucket(),
            artifact_bucket: default_artifact_bucket(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_objects_dir() -> PathBuf {
    PathBuf::from("data/objects")
}

fn default_trash_bucket() -> String {
    "trash".to_string()
}

fn default_artifact_bucket() -> String {
    "books".to_string()
}

/// Retention window settings. Changes only affect groups trashed afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default)]
    pub anchor: RetentionAnchor,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            anchor: RetentionAnchor::default(),
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_pending_grace_secs")]
    pub pending_grace_secs: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sweep_interval_secs(),
            pending_grace_secs: default_pending_grace_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_pending_grace_secs() -> u64 {
    600
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

/// Bearer tokens accepted by the HTTP surface, mapped to the actor they act as.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Errors that can occur when loading or saving config.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
