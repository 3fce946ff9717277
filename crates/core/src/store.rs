//! Bundle of repository ports handed to the services

use std::sync::Arc;

use crate::ingestion::ports::WebhookRepository;
use crate::leads::ports::{
    AccountRepository, CommunicationRepository, CompanyRepository, LeadRepository, TagRepository,
};
use crate::tasks::ports::TaskRepository;

/// Transactional CRUD over every aggregate, one port per aggregate.
///
/// Adapters usually implement all ports on one type; the bundle keeps the
/// services agnostic of that.
#[derive(Clone)]
pub struct RecordStore {
    pub accounts: Arc<dyn AccountRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub communications: Arc<dyn CommunicationRepository>,
    pub webhooks: Arc<dyn WebhookRepository>,
}

impl RecordStore {
    /// Build a bundle from one adapter implementing every port.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: AccountRepository
            + CompanyRepository
            + LeadRepository
            + TaskRepository
            + TagRepository
            + CommunicationRepository
            + WebhookRepository
            + 'static,
    {
        Self {
            accounts: store.clone(),
            companies: store.clone(),
            leads: store.clone(),
            tasks: store.clone(),
            tags: store.clone(),
            communications: store.clone(),
            webhooks: store,
        }
    }
}
