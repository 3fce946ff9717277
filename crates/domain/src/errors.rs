//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Leadflow
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LeadflowError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A uniqueness constraint rejected the write. The message carries the
    /// store's own description (e.g. the violated column list).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LeadflowError {
    /// True when the error is a uniqueness violation whose message names
    /// `needle` (a column or index name).
    pub fn is_conflict_on(&self, needle: &str) -> bool {
        matches!(self, Self::Conflict(msg) if msg.contains(needle))
    }
}

/// Result type alias for Leadflow operations
pub type Result<T> = std::result::Result<T, LeadflowError>;
