//! Route groups

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

use super::handlers;
use crate::AppContext;

pub fn health_routes() -> Router<Arc<AppContext>> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Public intake, authenticated per webhook by its optional secret.
pub fn webhook_routes() -> Router<Arc<AppContext>> {
    Router::new().route(
        "/webhooks/incoming/{webhook_id}",
        post(handlers::webhooks::receive).options(handlers::webhooks::preflight),
    )
}

/// Tenant-scoped lead operations (`X-Account-Id`).
pub fn lead_routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/api/leads", get(handlers::leads::list_leads).post(handlers::leads::create_lead))
        .route("/api/leads/{lead_id}", get(handlers::leads::get_lead))
        .route("/api/leads/{lead_id}/status", patch(handlers::leads::change_status))
        .route("/api/leads/{lead_id}/calls", post(handlers::leads::record_call))
        .route("/api/places/import", post(handlers::places::import_place))
}

pub fn provisioning_routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/api/accounts", post(handlers::provisioning::create_account))
        .route("/api/webhooks", post(handlers::provisioning::create_webhook))
        .route("/api/webhooks/{webhook_id}/logs", get(handlers::provisioning::webhook_logs))
}
