//! Configuration management

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ingestion: IngestionConfig,
    pub notifications: NotificationConfig,
    pub email: EmailProviderConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Include internal error messages in 500 responses. Off by default
    /// because webhook callers are third parties.
    pub expose_error_details: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Webhook ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestionConfig {
    /// Global switch for the duplicate-lead guard. Each webhook can opt out
    /// separately through its settings.
    pub duplicate_check: bool,
}

/// Notification queue and retry policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub send_timeout_secs: u64,
}

/// Outbound email provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmailProviderConfig {
    /// Base URL of the provider's HTTP API. `None` logs emails instead of
    /// sending them.
    pub api_base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string(), expose_error_details: false }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "leadflow.db".to_string(), pool_size: 8 }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { duplicate_check: true }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            send_timeout_secs: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "database": { "path": "crm.db" } }"#).unwrap();
        assert_eq!(config.database.path, "crm.db");
        assert_eq!(config.database.pool_size, 8);
        assert!(config.ingestion.duplicate_check);
        assert_eq!(config.notifications.max_attempts, 3);
        assert!(!config.server.expose_error_details);
    }

    #[test]
    fn api_key_is_never_serialized() {
        let mut config = Config::default();
        config.email.api_key = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
