//! Configuration loading and resolution
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (only for optional settings)
//!
//! The five connection settings (filings API key, model API key, database
//! URL, database name, collection name) have no default. Startup fails with
//! a single [`Error::Config`] naming every missing one.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config dir and /etc
pub const APP_DIR: &str = "breach-watch";

/// Environment variable pointing at an explicit TOML file
pub const CONFIG_ENV_VAR: &str = "BW_CONFIG";

pub const ENV_SEC_API_KEY: &str = "SEC_API_KEY";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";
pub const ENV_PORT: &str = "BW_PORT";

/// Contents of the optional TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub sec_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    /// HTTP port for `serve`
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Language model settings for summaries
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout for the model API
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Pipeline run defaults
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Records per page, 1..=[`MAX_BATCH_SIZE`]
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Pause between page fetches
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Retry budget for a store write that hits a locked database
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_results: default_max_results(),
            page_delay_ms: default_page_delay_ms(),
            lock_wait_ms: default_lock_wait_ms(),
        }
    }
}

/// Largest page the filings API serves
pub const MAX_BATCH_SIZE: u32 = 50;

/// Check run bounds: batch size in 1..=[`MAX_BATCH_SIZE`], positive result cap
pub fn validate_run_bounds(batch_size: u32, max_results: u32) -> Result<()> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(Error::Config(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, batch_size
        )));
    }
    if max_results == 0 {
        return Err(Error::Config("max_results must be positive".to_string()));
    }
    Ok(())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    120
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> u32 {
    50
}

fn default_max_results() -> u32 {
    100
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_lock_wait_ms() -> u64 {
    crate::db::retry::DEFAULT_MAX_LOCK_WAIT_MS
}

pub const DEFAULT_PORT: u16 = 3000;

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sec_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub database_url: Option<String>,
    pub db_name: Option<String>,
    pub collection_name: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub sec_api_key: String,
    pub groq_api_key: String,
    pub database_url: String,
    pub db_name: String,
    pub collection_name: String,
    pub port: u16,
    pub logging: LoggingConfig,
    pub enrichment: EnrichmentConfig,
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    /// Resolve from CLI overrides, the process environment and a TOML file
    pub fn resolve(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        Self::resolve_with(overrides, toml_config, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup
    pub fn resolve_with<F>(
        overrides: &ConfigOverrides,
        toml_config: TomlConfig,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();

        let mut required = |cli: &Option<String>, env_name: &'static str, toml: &Option<String>| {
            let value = first_valid([cli.clone(), env(env_name), toml.clone()]);
            if value.is_none() {
                missing.push(env_name);
            }
            value.unwrap_or_default()
        };

        let sec_api_key = required(&overrides.sec_api_key, ENV_SEC_API_KEY, &toml_config.sec_api_key);
        let groq_api_key = required(&overrides.groq_api_key, ENV_GROQ_API_KEY, &toml_config.groq_api_key);
        let database_url = required(&overrides.database_url, ENV_DATABASE_URL, &toml_config.database_url);
        let db_name = required(&overrides.db_name, ENV_DB_NAME, &toml_config.db_name);
        let collection_name = required(
            &overrides.collection_name,
            ENV_COLLECTION_NAME,
            &toml_config.collection_name,
        );

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required configuration: {}. Set each as an environment variable, \
                 a command-line flag, or a key in ~/.config/{}/config.toml",
                missing.join(", "),
                APP_DIR
            )));
        }

        if !is_valid_identifier(&collection_name) {
            return Err(Error::Config(format!(
                "{} must be a plain identifier (letters, digits, underscore): {:?}",
                ENV_COLLECTION_NAME, collection_name
            )));
        }

        if !is_valid_identifier(&db_name) {
            return Err(Error::Config(format!(
                "{} must be a plain identifier (letters, digits, underscore): {:?}",
                ENV_DB_NAME, db_name
            )));
        }

        validate_run_bounds(
            toml_config.pipeline.batch_size,
            toml_config.pipeline.max_results,
        )?;

        let port = match overrides.port {
            Some(port) => port,
            None => match env(ENV_PORT) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    Error::Config(format!("{} is not a valid port: {:?}", ENV_PORT, raw))
                })?,
                None => toml_config.port.unwrap_or(DEFAULT_PORT),
            },
        };

        Ok(Self {
            sec_api_key,
            groq_api_key,
            database_url,
            db_name,
            collection_name,
            port,
            logging: toml_config.logging,
            enrichment: toml_config.enrichment,
            pipeline: toml_config.pipeline,
        })
    }

    /// SQLite file location: `<database_url dir>/<db_name>.db`
    pub fn database_path(&self) -> PathBuf {
        database_path(&self.database_url, &self.db_name)
    }
}

/// Map a database URL and name to the SQLite file path.
///
/// The URL names a directory and may carry a `sqlite://` or `sqlite:` prefix.
pub fn database_path(database_url: &str, db_name: &str) -> PathBuf {
    let dir = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let dir = if dir.is_empty() { "." } else { dir };
    PathBuf::from(dir).join(format!("{}.db", db_name))
}

fn first_valid<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|v| is_valid_key(v))
        .map(|v| v.trim().to_string())
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// SQL-safe identifier: `[A-Za-z_][A-Za-z0-9_]*`, under 64 chars
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() < 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Load the TOML config file.
///
/// An explicit path (argument or `BW_CONFIG`) must exist and parse. Without
/// one, the platform locations are tried and a missing file yields defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        return read_toml_config(&path);
    }

    match default_config_path() {
        Some(path) => read_toml_config(&path),
        None => {
            warn!("No config file found; using environment and defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// First existing platform config file, if any
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
