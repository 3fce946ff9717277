//! Liveness and readiness in one check

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::AppContext;

/// `200` when the database answers and the worker runs, `503` otherwise.
pub async fn health_check(State(context): State<Arc<AppContext>>) -> (StatusCode, Json<Value>) {
    let health = context.health_check().await;
    let status =
        if health.is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(json!({
            "status": health.label(),
            "schemaVersion": health.schema_version,
            "components": health.components,
            "checkedAt": health.checked_at,
        })),
    )
}
