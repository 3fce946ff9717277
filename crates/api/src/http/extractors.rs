//! Custom extractors for the authenticated API

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;
use uuid::Uuid;

use super::errors::ApiError;

/// Header set by the upstream auth gateway.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Tenant of the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId(pub Uuid);

impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing account".into()))?
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid account id".into()))?;

        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::BadRequest("Invalid account id".into()))?;

        debug!(account_id = %id, "Extracted account");
        Ok(Self(id))
    }
}
