//! Account service - tenant provisioning and webhook management

use leadflow_domain::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use leadflow_domain::{
    Account, EmailSettings, LeadflowError, Result, Webhook, WebhookLog, WebhookSettings,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::store::RecordStore;

/// Account registration input
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAccount {
    pub name: String,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub email_settings: EmailSettings,
}

/// Webhook registration input. `source` defaults to the name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewWebhook {
    pub name: String,
    pub source: Option<String>,
    pub secret: Option<String>,
    pub settings: WebhookSettings,
    pub is_active: bool,
}

impl Default for NewWebhook {
    fn default() -> Self {
        Self {
            name: String::new(),
            source: None,
            secret: None,
            settings: WebhookSettings::default(),
            is_active: true,
        }
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: RecordStore,
}

impl AccountService {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input))]
    pub async fn create_account(&self, input: NewAccount) -> Result<Account> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LeadflowError::InvalidInput("account name is required".into()));
        }

        let mut account = Account::new(name);
        account.owner_email = clean(input.owner_email);
        account.owner_name = clean(input.owner_name);
        account.email_settings = input.email_settings;

        self.store.accounts.insert_account(&account).await?;
        info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Register an inbound endpoint. The public id is generated.
    #[instrument(skip(self, input))]
    pub async fn create_webhook(&self, account_id: Uuid, input: NewWebhook) -> Result<Webhook> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LeadflowError::InvalidInput("webhook name is required".into()));
        }
        if self.store.accounts.find_account(account_id).await?.is_none() {
            return Err(LeadflowError::NotFound(format!("account {account_id}")));
        }

        let source = clean(input.source).unwrap_or_else(|| name.to_string());
        let mut webhook = Webhook::new(account_id, name, source);
        webhook.secret = clean(input.secret);
        webhook.settings = input.settings;
        webhook.is_active = input.is_active;

        self.store.webhooks.insert_webhook(&webhook).await?;
        info!(webhook_id = %webhook.webhook_id, "Webhook registered");
        Ok(webhook)
    }

    /// Most recent deliveries of one of the account's webhooks.
    pub async fn webhook_logs(
        &self,
        account_id: Uuid,
        public_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<WebhookLog>> {
        let webhook = self
            .store
            .webhooks
            .find_webhook(public_id)
            .await?
            .filter(|w| w.account_id == account_id)
            .ok_or_else(|| LeadflowError::NotFound(format!("webhook {public_id}")))?;

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self.store.webhooks.logs_for_webhook(webhook.id, limit).await
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_webhook_defaults_to_active() {
        let input: NewWebhook = serde_json::from_str(r#"{ "name": "Formular" }"#).unwrap();
        assert!(input.is_active);
        assert!(input.settings.check_duplicates);
        assert_eq!(input.source, None);
    }

    #[test]
    fn new_account_reads_nested_settings() {
        let input: NewAccount = serde_json::from_str(
            r#"{ "name": "Muster GmbH", "emailSettings": { "autoReplyEnabled": true } }"#,
        )
        .unwrap();
        assert!(input.email_settings.auto_reply_enabled);
        assert!(!input.email_settings.owner_notification_enabled);
    }
}
