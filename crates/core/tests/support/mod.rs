//! Shared test helpers for `leadflow-core` integration tests.
//!
//! An in-memory record store stands in for SQLite so the services can be
//! exercised end to end without a database.

pub mod memory;
pub mod notifications;

use std::sync::Arc;

use bytes::Bytes;
use leadflow_core::{DeliveryHeaders, InboundDelivery, RecordStore};
use leadflow_domain::{Account, Webhook};
use serde_json::Value;

pub use memory::MemoryStore;
pub use notifications::{RecordingDispatcher, ScriptedEmailSender};

/// Fresh store seeded with one account and one active webhook.
pub struct Fixture {
    pub memory: Arc<MemoryStore>,
    pub store: RecordStore,
    pub account: Account,
    pub webhook: Webhook,
}

impl Fixture {
    pub fn new() -> Self {
        let memory = Arc::new(MemoryStore::default());
        let account = Account::new("Muster GmbH");
        let webhook = Webhook::new(account.id, "Kontaktformular", "Website");
        memory.seed_account(account.clone());
        memory.seed_webhook(webhook.clone());
        Self { store: RecordStore::from_shared(Arc::clone(&memory)), memory, account, webhook }
    }

    /// Replace the seeded webhook, e.g. after changing its settings.
    pub fn with_webhook(self, edit: impl FnOnce(&mut Webhook)) -> Self {
        let mut webhook = self.webhook.clone();
        edit(&mut webhook);
        self.memory.seed_webhook(webhook.clone());
        Self { webhook, ..self }
    }

    pub fn json_delivery(&self, body: Value) -> InboundDelivery {
        InboundDelivery {
            webhook_id: self.webhook.webhook_id.clone(),
            body: Bytes::from(body.to_string()),
            content_type: Some("application/json".into()),
            headers: DeliveryHeaders::default(),
        }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
