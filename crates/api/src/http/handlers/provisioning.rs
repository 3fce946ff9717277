//! Tenant and webhook provisioning

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use leadflow_core::accounts::{NewAccount, NewWebhook};
use leadflow_domain::{Account, Webhook, WebhookLog};
use serde::Deserialize;

use crate::http::{AccountId, ApiError};
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u32>,
}

pub async fn create_account(
    State(context): State<Arc<AppContext>>,
    Json(input): Json<NewAccount>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = context.accounts.create_account(input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn create_webhook(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Json(input): Json<NewWebhook>,
) -> Result<(StatusCode, Json<Webhook>), ApiError> {
    let webhook = context.accounts.create_webhook(account_id, input).await?;
    Ok((StatusCode::CREATED, Json(webhook)))
}

/// Newest deliveries first.
pub async fn webhook_logs(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Path(webhook_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<WebhookLog>>, ApiError> {
    Ok(Json(context.accounts.webhook_logs(account_id, &webhook_id, query.limit).await?))
}
