//! Follow-up tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    CALL_TASK_TITLE, CALL_TASK_TOKEN, CONTACT_TASK_TITLE, CONTACT_TASK_TOKEN, MAX_CALL_ATTEMPTS,
};
use crate::impl_domain_status_conversions;

/// What a task is for. Contact and call tasks are managed automatically;
/// at most one of each may be open per lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Contact,
    Call,
    General,
}

impl_domain_status_conversions!(TaskKind {
    Contact => "CONTACT",
    Call => "CALL",
    General => "GENERAL",
});

impl TaskKind {
    /// Classify a task from its title. Used for rows written before the
    /// kind column existed.
    pub fn classify(title: &str) -> Self {
        let title = title.to_lowercase();
        if title.contains(CONTACT_TASK_TOKEN) {
            Self::Contact
        } else if title.contains(CALL_TASK_TOKEN) {
            Self::Call
        } else {
            Self::General
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl_domain_status_conversions!(TaskStatus {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
});

impl TaskStatus {
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub account_id: Uuid,
    pub lead_id: Uuid,
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Attempt number, call tasks only.
    pub attempt: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    fn pending(account_id: Uuid, lead_id: Uuid, kind: TaskKind, title: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            lead_id,
            kind,
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            attempt: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// "Contact this lead" task created for fresh leads.
    pub fn contact(account_id: Uuid, lead_id: Uuid, lead_name: &str) -> Self {
        let mut task = Self::pending(account_id, lead_id, TaskKind::Contact, CONTACT_TASK_TITLE);
        task.description = Some(format!("Neuen Lead {lead_name} kontaktieren"));
        task
    }

    /// Call task for the given attempt (1-based).
    pub fn call(account_id: Uuid, lead_id: Uuid, attempt: u32) -> Self {
        let mut task = Self::pending(account_id, lead_id, TaskKind::Call, CALL_TASK_TITLE);
        task.description = Some(format!("Anrufversuch {attempt} von {MAX_CALL_ATTEMPTS}"));
        task.attempt = Some(attempt);
        task
    }

    /// Free-form task created by a user.
    pub fn general(account_id: Uuid, lead_id: Uuid, title: &str) -> Self {
        Self::pending(account_id, lead_id, TaskKind::General, title)
    }

    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
