//! Outbound email adapters

use std::time::Duration;

use async_trait::async_trait;
use leadflow_core::EmailSender;
use leadflow_domain::{LeadflowError, OutboundEmail, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{status_to_error, InfraError};

/// Request body understood by the provider's `POST /emails` endpoint.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: String,
    to: Vec<String>,
    subject: &'a str,
    text: &'a str,
}

impl<'a> SendEmailRequest<'a> {
    fn from_email(email: &'a OutboundEmail) -> Self {
        Self {
            from: mailbox(&email.from, email.from_name.as_deref()),
            to: vec![mailbox(&email.to, email.to_name.as_deref())],
            subject: &email.subject,
            text: &email.text,
        }
    }
}

/// `Name <address>` when a display name is known.
fn mailbox(address: &str, name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{} <{address}>", name.replace(['<', '>', '"'], "")),
        None => address.to_string(),
    }
}

/// Sends through an HTTP email API with a bearer key.
#[derive(Clone)]
pub struct HttpEmailSender {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpEmailSender {
    /// # Errors
    /// Returns `LeadflowError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LeadflowError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&SendEmailRequest::from_email(email));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| LeadflowError::from(InfraError::from(err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), status.canonical_reason()));
        }

        debug!(to = %email.to, %status, "Email accepted by provider");
        Ok(())
    }
}

/// Logs emails instead of sending them. Used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email delivery disabled; logged only");
        Ok(())
    }
}
