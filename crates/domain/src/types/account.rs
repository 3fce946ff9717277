//! Tenant accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant. Every other entity carries its `id` as `account_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    #[serde(default)]
    pub email_settings: EmailSettings,
    pub created_at: DateTime<Utc>,
}

/// Per-account email behaviour for newly ingested leads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSettings {
    pub auto_reply_enabled: bool,
    pub auto_reply_subject: Option<String>,
    /// Body template with `{{placeholder}}` markers.
    pub auto_reply_body: Option<String>,
    pub owner_notification_enabled: bool,
    /// Overrides `Account::owner_email` as the notification recipient.
    pub notification_email: Option<String>,
    pub sender_name: Option<String>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            owner_email: None,
            owner_name: None,
            email_settings: EmailSettings::default(),
            created_at: Utc::now(),
        }
    }

    /// Address that receives owner notifications, if any.
    pub fn notification_recipient(&self) -> Option<&str> {
        let non_blank = |addr: &&str| !addr.trim().is_empty();
        self.email_settings
            .notification_email
            .as_deref()
            .filter(non_blank)
            .or_else(|| self.owner_email.as_deref().filter(non_blank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_recipient_prefers_override() {
        let mut account = Account::new("Acme");
        assert_eq!(account.notification_recipient(), None);

        account.owner_email = Some("owner@acme.test".into());
        assert_eq!(account.notification_recipient(), Some("owner@acme.test"));

        account.email_settings.notification_email = Some("sales@acme.test".into());
        assert_eq!(account.notification_recipient(), Some("sales@acme.test"));
    }

    #[test]
    fn blank_override_falls_back_to_owner() {
        let mut account = Account::new("Acme");
        account.email_settings.notification_email = Some("  ".into());
        assert_eq!(account.notification_recipient(), None);

        account.owner_email = Some("owner@acme.test".into());
        assert_eq!(account.notification_recipient(), Some("owner@acme.test"));
    }
}
