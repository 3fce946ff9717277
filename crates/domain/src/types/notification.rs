//! Notification jobs and outbound email messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Confirmation sent to the lead.
    AutoReply,
    /// Alert sent to the account owner.
    OwnerNotification,
}

/// Unit of work placed on the notification queue after a lead is ingested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    pub id: Uuid,
    pub account_id: Uuid,
    pub lead_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn lead_created(account_id: Uuid, lead_id: Uuid) -> Self {
        Self { id: Uuid::now_v7(), account_id, lead_id, created_at: Utc::now() }
    }
}

/// A single email decided on by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub lead_id: Uuid,
    pub kind: NotificationKind,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub account_id: Uuid,
}

/// Fully rendered message handed to the email provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub from: String,
    pub from_name: Option<String>,
    pub subject: String,
    pub text: String,
}
