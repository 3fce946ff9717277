//! Append-only communication log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationType {
    Note,
    Email,
    Call,
    Meeting,
    Sms,
}

impl_domain_status_conversions!(CommunicationType {
    Note => "NOTE",
    Email => "EMAIL",
    Call => "CALL",
    Meeting => "MEETING",
    Sms => "SMS",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl_domain_status_conversions!(Direction {
    Inbound => "INBOUND",
    Outbound => "OUTBOUND",
});

/// One logged interaction with a lead. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: Uuid,
    pub account_id: Uuid,
    pub lead_id: Uuid,
    #[serde(rename = "type")]
    pub comm_type: CommunicationType,
    pub direction: Direction,
    pub subject: Option<String>,
    pub content: String,
    /// Delivery status for emails (`SENT`, `FAILED`), outcome for calls.
    pub status: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Communication {
    pub fn new(
        account_id: Uuid,
        lead_id: Uuid,
        comm_type: CommunicationType,
        direction: Direction,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            lead_id,
            comm_type,
            direction,
            subject: None,
            content: content.into(),
            status: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
