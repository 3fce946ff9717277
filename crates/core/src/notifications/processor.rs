//! Delivery of queued notification jobs with retry and backoff

use std::sync::Arc;
use std::time::Duration;

use leadflow_domain::{
    Communication, CommunicationType, Direction, LeadflowError, NotificationConfig,
    NotificationJob, NotificationKind, OutboundEmail, Result,
};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::planner::{compose, plan};
use super::ports::EmailSender;
use crate::leads::ports::{AccountRepository, CommunicationRepository, LeadRepository};
use crate::store::RecordStore;

/// Retry schedule for a single email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub send_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NotificationConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
        }
    }

    /// Delay after the `attempt`-th failure (1-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff.saturating_mul(1_u32 << exponent).min(self.max_backoff)
    }
}

/// Counts for one processed job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: u32,
    pub failed: u32,
}

/// Expands a job into emails and sends them
pub struct NotificationProcessor {
    accounts: Arc<dyn AccountRepository>,
    leads: Arc<dyn LeadRepository>,
    communications: Arc<dyn CommunicationRepository>,
    sender: Arc<dyn EmailSender>,
    policy: RetryPolicy,
    from_address: String,
}

impl NotificationProcessor {
    pub fn new(
        store: &RecordStore,
        sender: Arc<dyn EmailSender>,
        policy: RetryPolicy,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            accounts: Arc::clone(&store.accounts),
            leads: Arc::clone(&store.leads),
            communications: Arc::clone(&store.communications),
            sender,
            policy,
            from_address: from_address.into(),
        }
    }

    /// Send every email the job calls for. A failed email does not stop the
    /// others; a vanished account or lead is skipped.
    #[instrument(skip(self, job), fields(job_id = %job.id, lead_id = %job.lead_id))]
    pub async fn process(&self, job: &NotificationJob) -> Result<DeliveryReport> {
        let Some(account) = self.accounts.find_account(job.account_id).await? else {
            warn!(account_id = %job.account_id, "Account vanished; notification skipped");
            return Ok(DeliveryReport::default());
        };
        let Some(lead) = self.leads.find_lead(job.account_id, job.lead_id).await? else {
            warn!("Lead vanished; notification skipped");
            return Ok(DeliveryReport::default());
        };

        let mut report = DeliveryReport::default();
        for request in plan(&account, &lead) {
            let email = compose(&request, &account, &lead, &self.from_address);
            let delivered = match self.send_with_retry(&email).await {
                Ok(attempts) => {
                    info!(kind = ?request.kind, attempts, "Notification sent");
                    report.sent += 1;
                    true
                }
                Err(err) => {
                    warn!(kind = ?request.kind, error = %err, "Notification failed");
                    report.failed += 1;
                    false
                }
            };

            if request.kind == NotificationKind::AutoReply {
                self.record_auto_reply(lead.account_id, lead.id, &email, delivered).await;
            }
        }
        Ok(report)
    }

    /// Returns the number of attempts used.
    async fn send_with_retry(&self, email: &OutboundEmail) -> Result<u32> {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let outcome = tokio::time::timeout(self.policy.send_timeout, self.sender.send(email))
                .await
                .unwrap_or_else(|_| Err(LeadflowError::Network("email send timed out".into())));

            match outcome {
                Ok(()) => return Ok(attempt),
                Err(err) if attempt < self.policy.max_attempts && is_retryable(&err) => {
                    let delay = self.policy.backoff_for(attempt);
                    debug!(attempt, delay_ms = delay.as_millis(), error = %err, "Retrying email");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn record_auto_reply(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        email: &OutboundEmail,
        delivered: bool,
    ) {
        let communication = Communication::new(
            account_id,
            lead_id,
            CommunicationType::Email,
            Direction::Outbound,
            email.text.clone(),
        )
        .with_subject(email.subject.clone())
        .with_status(if delivered { "SENT" } else { "FAILED" })
        .with_metadata(json!({ "to": email.to, "automated": true }));

        if let Err(err) = self.communications.append_communication(&communication).await {
            warn!(lead_id = %lead_id, error = %err, "Failed to log auto-reply");
        }
    }
}

/// Transient failures worth another attempt. Rejections by the provider
/// (bad input, bad credentials) are final.
fn is_retryable(err: &LeadflowError) -> bool {
    matches!(err, LeadflowError::Network(_) | LeadflowError::Database(_) | LeadflowError::Internal(_))
}
