//! Port interfaces for notification delivery

use async_trait::async_trait;
use leadflow_domain::{NotificationJob, OutboundEmail, Result};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("notification queue is full")]
    QueueFull,

    #[error("notification worker has shut down")]
    Closed,
}

/// Non-blocking submission boundary used by request handlers.
pub trait NotificationDispatcher: Send + Sync {
    /// Enqueue a job without waiting. Never blocks on delivery.
    fn submit(&self, job: NotificationJob) -> std::result::Result<(), SubmitError>;
}

/// Outbound email provider
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}
