//! Port interface for webhook endpoints and their audit log

use async_trait::async_trait;
use leadflow_domain::{Result, Webhook, WebhookLog};
use uuid::Uuid;

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// Look up an endpoint by its public id.
    async fn find_webhook(&self, public_id: &str) -> Result<Option<Webhook>>;

    async fn insert_webhook(&self, webhook: &Webhook) -> Result<()>;

    async fn insert_log(&self, log: &WebhookLog) -> Result<()>;

    /// Record the terminal state of a delivery.
    async fn finish_log(
        &self,
        log_id: Uuid,
        success: bool,
        error: Option<&str>,
        lead_id: Option<Uuid>,
    ) -> Result<()>;

    async fn find_log(&self, log_id: Uuid) -> Result<Option<WebhookLog>>;

    /// Most recent deliveries first.
    async fn logs_for_webhook(&self, webhook_id: Uuid, limit: u32) -> Result<Vec<WebhookLog>>;
}
