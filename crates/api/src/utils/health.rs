//! Health report for the `/health` endpoint

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Overall health of the service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub schema_version: Option<i32>,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self { is_healthy: true, schema_version: None, components: Vec::new(), checked_at: Utc::now() }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Healthy only when every component is.
    #[must_use]
    pub fn evaluate(mut self) -> Self {
        self.is_healthy = self.components.iter().all(|c| c.is_healthy);
        self
    }

    /// `"ok"` or `"degraded"`.
    pub const fn label(&self) -> &'static str {
        if self.is_healthy {
            "ok"
        } else {
            "degraded"
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Health status of an individual component
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    /// Component identifier (e.g., "database", "notification_worker")
    pub name: String,
    pub is_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}
