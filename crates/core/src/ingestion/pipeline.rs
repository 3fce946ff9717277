//! Webhook ingestion pipeline
//!
//! Turns one inbound delivery into a company, a lead and their follow-up
//! records. Only the lead is load-bearing: task, note and tag creation are
//! logged and swallowed on failure, and notifications are queued without
//! waiting on them.
//!
//! Every delivery that gets past authentication and parsing leaves exactly
//! one audit row, and that row always ends in a terminal state.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use leadflow_domain::constants::{
    COMPLIANCE_ACKNOWLEDGMENT, DEFAULT_TAG_COLOR, WEBHOOK_SECRET_HEADER,
};
use leadflow_domain::{
    Communication, CommunicationType, Company, Direction, IngestionConfig, Lead, LeadType,
    NotificationJob, Webhook, WebhookLog,
};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::duplicate_guard::{company_key, DuplicateGuard};
use super::errors::IngestError;
use super::field_mapper::{FieldMapper, MappedCompany, MappedLead, Payload};
use super::payload::parse_payload;
use crate::leads::ports::CompanyNameUpdate;
use crate::notifications::ports::NotificationDispatcher;
use crate::store::RecordStore;
use crate::tasks::TaskStateMachine;

/// Request headers relevant to ingestion, keyed case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryHeaders(BTreeMap<String, String>);

impl DeliveryHeaders {
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Token of an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.get("authorization")?.trim();
        let (scheme, token) = value.split_once(' ')?;
        scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for DeliveryHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::default();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// One inbound webhook call
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    /// Public webhook id from the URL.
    pub webhook_id: String,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub headers: DeliveryHeaders,
}

/// Successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReceipt {
    pub lead: Lead,
    pub company: Company,
    pub log_id: Uuid,
    pub contact_task_id: Option<Uuid>,
}

/// Orchestrates webhook deliveries into lead records
pub struct IngestionPipeline {
    store: RecordStore,
    guard: DuplicateGuard,
    tasks: TaskStateMachine,
    dispatcher: Arc<dyn NotificationDispatcher>,
    duplicate_check: bool,
}

impl IngestionPipeline {
    pub fn new(
        store: RecordStore,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: &IngestionConfig,
    ) -> Self {
        Self {
            guard: DuplicateGuard::new(Arc::clone(&store.leads)),
            tasks: TaskStateMachine::new(Arc::clone(&store.tasks), Arc::clone(&store.tags)),
            store,
            dispatcher,
            duplicate_check: config.duplicate_check,
        }
    }

    /// Ingest one delivery.
    #[instrument(skip_all, fields(webhook_id = %delivery.webhook_id))]
    pub async fn ingest(&self, delivery: InboundDelivery) -> Result<IngestionReceipt, IngestError> {
        let webhook = self.resolve_webhook(&delivery.webhook_id).await?;
        verify_secret(&webhook, &delivery.headers)?;

        let payload = parse_payload(delivery.body, delivery.content_type.as_deref())
            .await
            .inspect_err(|err| debug!(error = %err, "Rejected unparseable webhook payload"))?;

        let log = WebhookLog::processing(&webhook, Value::Object(payload.clone()));
        self.store.webhooks.insert_log(&log).await?;

        let outcome = AssertUnwindSafe(self.process(&webhook, &payload, log.id))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(IngestError::Internal("lead processing panicked".into())));

        self.finish_log(log.id, &outcome).await;

        if let Ok(receipt) = &outcome {
            self.submit_notification(receipt);
        }
        outcome
    }

    async fn resolve_webhook(&self, public_id: &str) -> Result<Webhook, IngestError> {
        let webhook = self
            .store
            .webhooks
            .find_webhook(public_id)
            .await?
            .ok_or(IngestError::InvalidWebhook)?;
        if !webhook.is_active {
            return Err(IngestError::WebhookDisabled);
        }
        Ok(webhook)
    }

    async fn process(
        &self,
        webhook: &Webhook,
        payload: &Payload,
        log_id: Uuid,
    ) -> Result<IngestionReceipt, IngestError> {
        let mapper = FieldMapper::new(payload, &webhook.settings.field_mapping);
        let mapped_lead = mapper.map_lead();
        let mapped_company = mapper.map_company();

        if self.duplicate_check && webhook.settings.check_duplicates {
            let existing = self
                .guard
                .find_duplicate(
                    webhook.account_id,
                    mapped_lead.email.as_deref(),
                    mapped_lead.phone.as_deref(),
                )
                .await?;
            if let Some(existing) = existing {
                info!(existing_lead_id = %existing.id, "Rejected duplicate lead");
                return Err(IngestError::DuplicateLead { existing: Box::new(existing) });
            }
        }

        // Without a mapped company name the lead's name stands in, which must
        // not rename a company already known by its place id.
        let name_update = match mapped_company.name {
            Some(_) => CompanyNameUpdate::Replace,
            None => CompanyNameUpdate::KeepStored,
        };
        let company = self
            .store
            .companies
            .upsert_company(
                &build_company(webhook.account_id, &mapped_company, &mapped_lead),
                name_update,
            )
            .await?;

        let lead = build_lead(webhook, company.id, &mapped_lead);
        self.store.leads.insert_lead(&lead).await?;
        info!(lead_id = %lead.id, company_id = %company.id, "Lead created from webhook");

        let contact_task_id = match self.tasks.on_lead_created(&lead).await {
            Ok(task_id) => task_id,
            Err(err) => {
                warn!(lead_id = %lead.id, error = %err, "Failed to create contact task");
                None
            }
        };

        let note = inbound_note(webhook, &lead, payload, &mapped_lead);
        if let Err(err) = self.store.communications.append_communication(&note).await {
            warn!(lead_id = %lead.id, error = %err, "Failed to log inbound webhook note");
        }

        self.apply_auto_tags(&lead, &webhook.settings.auto_tags).await;

        Ok(IngestionReceipt { lead, company, log_id, contact_task_id })
    }

    async fn apply_auto_tags(&self, lead: &Lead, tags: &[String]) {
        for name in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let attached = async {
                let tag = self.store.tags.upsert_tag(lead.account_id, name, DEFAULT_TAG_COLOR).await?;
                self.store.tags.attach_tag(lead.id, tag.id).await
            }
            .await;
            if let Err(err) = attached {
                warn!(lead_id = %lead.id, tag = name, error = %err, "Failed to apply auto-tag");
            }
        }
    }

    async fn finish_log(&self, log_id: Uuid, outcome: &Result<IngestionReceipt, IngestError>) {
        let result = match outcome {
            Ok(receipt) => {
                self.store.webhooks.finish_log(log_id, true, None, Some(receipt.lead.id)).await
            }
            Err(err) => {
                self.store.webhooks.finish_log(log_id, false, Some(&err.to_string()), None).await
            }
        };
        if let Err(err) = result {
            error!(log_id = %log_id, error = %err, "Failed to finish webhook log");
        }
    }

    fn submit_notification(&self, receipt: &IngestionReceipt) {
        let job = NotificationJob::lead_created(receipt.lead.account_id, receipt.lead.id);
        if let Err(err) = self.dispatcher.submit(job) {
            warn!(lead_id = %receipt.lead.id, error = %err, "Notification not queued");
        }
    }
}

/// Enforce the webhook secret, if one is configured.
///
/// The secret may arrive as a bearer token or in `X-Webhook-Secret`.
fn verify_secret(webhook: &Webhook, headers: &DeliveryHeaders) -> Result<(), IngestError> {
    let Some(expected) = webhook.secret.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    let accepted = [headers.bearer_token(), headers.get(WEBHOOK_SECRET_HEADER)]
        .into_iter()
        .flatten()
        .any(|provided| secrets_match(expected, provided));

    if accepted {
        Ok(())
    } else {
        warn!(
            target: "security",
            webhook_id = %webhook.webhook_id,
            account_id = %webhook.account_id,
            "Webhook secret mismatch"
        );
        Err(IngestError::Unauthorized)
    }
}

/// Compare digests so the timing does not depend on the common prefix.
fn secrets_match(expected: &str, provided: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    expected.iter().zip(provided.iter()).fold(0_u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn build_company(account_id: Uuid, mapped: &MappedCompany, lead: &MappedLead) -> Company {
    let name = mapped.name.clone().unwrap_or_else(|| lead.name.clone());
    let mut company = Company::new(account_id, company_key(mapped.place_id.as_deref()), name);
    company.email = mapped.email.clone();
    company.phone = mapped.phone.clone();
    company.website = mapped.website.clone();
    company.address = mapped.address.clone();
    company.city = mapped.city.clone();
    company.postal_code = mapped.postal_code.clone();
    company.country = mapped.country.clone();
    company.rating = mapped.rating;
    company.review_count = mapped.review_count;
    company.refresh_completeness();
    company
}

fn build_lead(webhook: &Webhook, company_id: Uuid, mapped: &MappedLead) -> Lead {
    // Webhook leads are always people, never COMPANY leads.
    let mut lead = Lead::new(webhook.account_id, &mapped.name, LeadType::Contact, &webhook.source);
    lead.company_id = Some(company_id);
    lead.first_name = mapped.first_name.clone();
    lead.last_name = mapped.last_name.clone();
    lead.email = mapped.email.clone();
    lead.phone = mapped.phone.clone();
    lead.status = mapped.status.unwrap_or_default();
    lead.priority = mapped.priority.unwrap_or_default();
    lead.utm = mapped.utm.clone();
    lead
}

fn inbound_note(
    webhook: &Webhook,
    lead: &Lead,
    payload: &Payload,
    mapped: &MappedLead,
) -> Communication {
    let subject = mapped.subject.clone().unwrap_or_else(|| format!("Webhook: {}", webhook.name));
    let body = mapped.message.clone().unwrap_or_else(|| summarize_payload(payload));
    let content = format!("{body}\n\n---\n{COMPLIANCE_ACKNOWLEDGMENT}");

    Communication::new(lead.account_id, lead.id, CommunicationType::Note, Direction::Inbound, content)
        .with_subject(subject)
        .with_metadata(json!({
            "webhookId": webhook.webhook_id,
            "webhookName": webhook.name,
            "source": webhook.source,
        }))
}

fn summarize_payload(payload: &Payload) -> String {
    let mut entries: Vec<_> = payload.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
