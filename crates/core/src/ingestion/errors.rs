//! Ingestion failure taxonomy

use leadflow_domain::{Lead, LeadflowError};
use thiserror::Error;

use super::payload::PayloadError;

/// Why an inbound delivery was rejected
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid webhook")]
    InvalidWebhook,

    #[error("Webhook is disabled")]
    WebhookDisabled,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    #[error("Duplicate lead: {}", existing.id)]
    DuplicateLead { existing: Box<Lead> },

    /// The company key collided with a row the upsert could not absorb.
    #[error("Company with this external place id already exists: {0}")]
    UpstreamConflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// HTTP status reported to the webhook caller.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidWebhook => 404,
            Self::WebhookDisabled => 403,
            Self::Unauthorized => 401,
            Self::MalformedPayload(_) => 400,
            Self::DuplicateLead { .. } | Self::UpstreamConflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}

impl From<LeadflowError> for IngestError {
    fn from(err: LeadflowError) -> Self {
        if err.is_conflict_on("external_place_id") {
            return Self::UpstreamConflict(err.to_string());
        }
        Self::Internal(err.to_string())
    }
}
