//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.quietsignal.toml` files.

use crate::analysis::WeightingParams;
use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".quietsignal.toml";

/// Accepted range for `aggregation.length_exponent`.
const MIN_LENGTH_EXPONENT: f64 = 0.0;
const MAX_LENGTH_EXPONENT: f64 = 10.0;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Paragraph weighting.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Sentiment model settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Password and token settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Bootstrap admin account.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Where `login` stores the session token.
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            session_file: default_session_file(),
        }
    }
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".quietsignal_session")
}

/// Length and recency weighting of paragraphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Exponent applied to paragraph length.
    #[serde(default = "default_length_exponent")]
    pub length_exponent: f64,

    /// Extra weight given to the newest paragraph relative to the oldest.
    #[serde(default = "default_recency_gain")]
    pub recency_gain: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            length_exponent: default_length_exponent(),
            recency_gain: default_recency_gain(),
        }
    }
}

fn default_length_exponent() -> f64 {
    1.0
}

fn default_recency_gain() -> f64 {
    0.2
}

impl From<&AggregationConfig> for WeightingParams {
    fn from(config: &AggregationConfig) -> Self {
        WeightingParams {
            length_exponent: config.length_exponent,
            recency_gain: config.recency_gain,
        }
    }
}

/// Which classifier backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Built-in rule-based model (no network).
    #[default]
    Lexicon,
    /// Remote model server.
    Http,
}

/// Sentiment model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,

    /// Prediction endpoint for the `http` backend.
    #[serde(default = "default_classifier_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_classifier_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            url: default_classifier_url(),
            timeout_seconds: default_classifier_timeout(),
        }
    }
}

fn default_classifier_url() -> String {
    "http://localhost:8000/predict".to_string()
}

fn default_classifier_timeout() -> u64 {
    10
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("quietsignal.db")
}

/// Password hashing and token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for signing session tokens. Must be set before login.
    #[serde(default)]
    pub secret_key: String,

    /// Token lifetime in minutes.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,

    /// PBKDF2 rounds for new password hashes.
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            token_ttl_minutes: default_token_ttl(),
            hash_iterations: default_hash_iterations(),
        }
    }
}

fn default_token_ttl() -> i64 {
    30
}

fn default_hash_iterations() -> u32 {
    29_000
}

/// Admin account created at startup when username and password are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl AdminConfig {
    /// Credentials if the admin account should be ensured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref database) = args.database {
            self.storage.database_path = database.clone();
        }
        if let Some(ref secret) = args.secret_key {
            self.auth.secret_key = secret.clone();
        }
        if let Some(ref password) = args.admin_password {
            self.admin.password = Some(password.clone());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
    }

    /// Reject settings that would break weighting or auth.
    pub fn validate(&self) -> Result<()> {
        let agg = &self.aggregation;
        if !(MIN_LENGTH_EXPONENT..=MAX_LENGTH_EXPONENT).contains(&agg.length_exponent) {
            bail!(
                "aggregation.length_exponent must be between {} and {}",
                MIN_LENGTH_EXPONENT,
                MAX_LENGTH_EXPONENT
            );
        }
        if !agg.recency_gain.is_finite() || agg.recency_gain < -1.0 {
            bail!("aggregation.recency_gain must be a finite number >= -1.0");
        }
        if self.classifier.timeout_seconds == 0 {
            bail!("classifier.timeout_seconds must be at least 1");
        }
        if self.auth.token_ttl_minutes <= 0 {
            bail!("auth.token_ttl_minutes must be positive");
        }
        if self.auth.hash_iterations == 0 {
            bail!("auth.hash_iterations must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
