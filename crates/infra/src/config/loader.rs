//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Environment variables, when `LEADFLOW_DB_PATH` is set
//! 2. Otherwise the first config file found by [`find_config_file`]
//! 3. Otherwise built-in defaults
//!
//! ## Environment Variables
//! - `LEADFLOW_DB_PATH`: Database file path (required for env loading)
//! - `LEADFLOW_DB_POOL_SIZE`: Connection pool size
//! - `LEADFLOW_BIND_ADDR`: HTTP listen address
//! - `LEADFLOW_EXPOSE_ERROR_DETAILS`: Include internal messages in 500s
//! - `LEADFLOW_DUPLICATE_CHECK`: Global duplicate guard switch
//! - `LEADFLOW_NOTIFY_QUEUE_CAPACITY`, `LEADFLOW_NOTIFY_MAX_ATTEMPTS`,
//!   `LEADFLOW_NOTIFY_INITIAL_BACKOFF_MS`, `LEADFLOW_NOTIFY_MAX_BACKOFF_MS`,
//!   `LEADFLOW_NOTIFY_SEND_TIMEOUT_SECS`: Notification queue and retry
//! - `LEADFLOW_EMAIL_API_URL`, `LEADFLOW_EMAIL_API_KEY`,
//!   `LEADFLOW_EMAIL_FROM`: Outbound email provider
//!
//! `LEADFLOW_EMAIL_API_KEY` is also applied on top of file configuration so
//! the key never has to live in a checked-in file.
//!
//! ## File Locations
//! `config.{json,toml}` and `leadflow.{json,toml}` in the working directory,
//! its two parents, and the same locations relative to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use leadflow_domain::{Config, LeadflowError, Result};

const DB_PATH_VAR: &str = "LEADFLOW_DB_PATH";
const EMAIL_API_KEY_VAR: &str = "LEADFLOW_EMAIL_API_KEY";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `LeadflowError::Config` if an environment value is malformed or a
/// discovered config file cannot be parsed. A missing file is not an error.
pub fn load() -> Result<Config> {
    if std::env::var_os(DB_PATH_VAR).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    let mut config = match find_config_file() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::info!("No config file found, using defaults");
            Config::default()
        }
    };
    if let Ok(key) = std::env::var(EMAIL_API_KEY_VAR) {
        config.email.api_key = Some(key);
    }
    Ok(config)
}

/// Load configuration from environment variables
///
/// `LEADFLOW_DB_PATH` is required; every other variable falls back to its
/// default.
///
/// # Errors
/// Returns `LeadflowError::Config` if the database path is missing or a
/// numeric value does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var(DB_PATH_VAR)?;
    config.database.pool_size = env_parse("LEADFLOW_DB_POOL_SIZE", config.database.pool_size)?;

    if let Ok(addr) = std::env::var("LEADFLOW_BIND_ADDR") {
        config.server.bind_addr = addr;
    }
    config.server.expose_error_details =
        env_bool("LEADFLOW_EXPOSE_ERROR_DETAILS", config.server.expose_error_details);
    config.ingestion.duplicate_check =
        env_bool("LEADFLOW_DUPLICATE_CHECK", config.ingestion.duplicate_check);

    let notifications = &mut config.notifications;
    notifications.queue_capacity =
        env_parse("LEADFLOW_NOTIFY_QUEUE_CAPACITY", notifications.queue_capacity)?;
    notifications.max_attempts =
        env_parse("LEADFLOW_NOTIFY_MAX_ATTEMPTS", notifications.max_attempts)?;
    notifications.initial_backoff_ms =
        env_parse("LEADFLOW_NOTIFY_INITIAL_BACKOFF_MS", notifications.initial_backoff_ms)?;
    notifications.max_backoff_ms =
        env_parse("LEADFLOW_NOTIFY_MAX_BACKOFF_MS", notifications.max_backoff_ms)?;
    notifications.send_timeout_secs =
        env_parse("LEADFLOW_NOTIFY_SEND_TIMEOUT_SECS", notifications.send_timeout_secs)?;

    config.email.api_base_url = std::env::var("LEADFLOW_EMAIL_API_URL").ok();
    config.email.api_key = std::env::var(EMAIL_API_KEY_VAR).ok();
    if let Ok(from) = std::env::var("LEADFLOW_EMAIL_FROM") {
        config.email.from_address = from;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. JSON and TOML are
/// supported, detected by file extension.
///
/// # Errors
/// Returns `LeadflowError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LeadflowError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            LeadflowError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LeadflowError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LeadflowError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LeadflowError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(LeadflowError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search the standard locations for a configuration file
///
/// Returns the first existing candidate, or `None`.
pub fn find_config_file() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots.iter().flat_map(|root| candidates_in(root)).find(|path| path.exists())
}

fn candidates_in(root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for dir in [root.to_path_buf(), root.join(".."), root.join("../..")] {
        for name in ["config.json", "config.toml", "leadflow.json", "leadflow.toml"] {
            candidates.push(dir.join(name));
        }
    }
    candidates
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| LeadflowError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional numeric variable, keeping `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LeadflowError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
