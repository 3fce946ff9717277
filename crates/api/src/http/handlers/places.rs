//! Google Places import

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use leadflow_core::leads::{PlaceDetails, PlaceImport};

use crate::http::{AccountId, ApiError};
use crate::AppContext;

/// Create company, lead and import note in one transaction.
pub async fn import_place(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Json(place): Json<PlaceDetails>,
) -> Result<(StatusCode, Json<PlaceImport>), ApiError> {
    let import = context.leads.import_place(account_id, place).await?;
    Ok((StatusCode::CREATED, Json(import)))
}
