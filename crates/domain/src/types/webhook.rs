//! Inbound webhook endpoints and their delivery audit log

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::WEBHOOK_LOG_PROCESSING;

/// Per-account inbound endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Public identifier used in the endpoint URL.
    pub webhook_id: String,
    pub name: String,
    /// Label written to `Lead::source`.
    pub source: String,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    #[serde(default)]
    pub settings: WebhookSettings,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookSettings {
    /// Canonical field name → payload key.
    pub field_mapping: BTreeMap<String, String>,
    pub auto_tags: Vec<String>,
    pub check_duplicates: bool,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self { field_mapping: BTreeMap::new(), auto_tags: Vec::new(), check_duplicates: true }
    }
}

impl Webhook {
    pub fn new(account_id: Uuid, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            webhook_id: Uuid::new_v4().simple().to_string(),
            name: name.into(),
            source: source.into(),
            secret: None,
            settings: WebhookSettings::default(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Audit row for one delivery attempt. Inserted before processing with the
/// processing placeholder and finished afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLog {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Internal id of the webhook (not the public one).
    pub webhook_id: Uuid,
    pub payload: Value,
    pub success: bool,
    pub error: Option<String>,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookLog {
    pub fn processing(webhook: &Webhook, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            account_id: webhook.account_id,
            webhook_id: webhook.id,
            payload,
            success: false,
            error: Some(WEBHOOK_LOG_PROCESSING.to_string()),
            lead_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether processing reached a recorded outcome.
    pub fn is_terminal(&self) -> bool {
        self.success || self.error.as_deref().is_some_and(|e| e != WEBHOOK_LOG_PROCESSING)
    }
}
