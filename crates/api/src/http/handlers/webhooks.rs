//! Inbound webhook deliveries

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use leadflow_core::{DeliveryHeaders, InboundDelivery, IngestError, IngestionReceipt};
use serde_json::json;
use tracing::{error, info, warn};

use crate::AppContext;

/// Accept one form submission and turn it into a lead.
pub async fn receive(
    State(context): State<Arc<AppContext>>,
    Path(webhook_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = InboundDelivery {
        webhook_id,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        headers: delivery_headers(&headers),
        body,
    };

    match context.pipeline.ingest(delivery).await {
        Ok(receipt) => created(receipt),
        Err(err) => rejection(&err, context.config.server.expose_error_details),
    }
}

/// Bare `OPTIONS` without CORS request headers.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn delivery_headers(headers: &HeaderMap) -> DeliveryHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

fn created(receipt: IngestionReceipt) -> Response {
    info!(lead_id = %receipt.lead.id, log_id = %receipt.log_id, "webhook lead created");
    let body = json!({
        "success": true,
        "lead": receipt.lead,
        "company": receipt.company,
        "message": "Lead created successfully",
    });
    (StatusCode::CREATED, Json(body)).into_response()
}

fn rejection(err: &IngestError, expose_details: bool) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = match err {
        IngestError::DuplicateLead { existing } => json!({
            "error": "Duplicate lead",
            "existingLeadId": existing.id,
            "existingLead": existing,
        }),
        IngestError::Internal(detail) => {
            error!(error = %detail, "webhook processing failed");
            if expose_details {
                json!({ "error": "Failed to process webhook", "details": detail })
            } else {
                json!({ "error": "Failed to process webhook" })
            }
        }
        other => {
            warn!(status = status.as_u16(), error = %other, "webhook delivery rejected");
            json!({ "error": other.to_string() })
        }
    };

    (status, Json(body)).into_response()
}
