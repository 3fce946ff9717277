//! Lead endpoints for authenticated users

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use leadflow_core::leads::{CallRecorded, CallReport, LeadDetails, NewLead, StatusChange};
use leadflow_domain::{Lead, LeadFilter, LeadPage, LeadStatus, LeadType, PageRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::{AccountId, ApiError};
use crate::AppContext;

/// Query string of `GET /api/leads`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListQuery {
    fn into_parts(self) -> Result<(LeadFilter, PageRequest), ApiError> {
        let status = parse_opt::<LeadStatus>(self.status)?;
        let lead_type = parse_opt::<LeadType>(self.lead_type)?;
        let defaults = PageRequest::default();
        let page = PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        };
        let filter = LeadFilter {
            status,
            source: non_blank(self.source),
            lead_type,
            search: non_blank(self.search),
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: LeadStatus,
}

pub async fn list_leads(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Query(query): Query<ListQuery>,
) -> Result<Json<LeadPage>, ApiError> {
    let (filter, page) = query.into_parts()?;
    Ok(Json(context.leads.list(account_id, &filter, page).await?))
}

pub async fn create_lead(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Json(input): Json<NewLead>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let lead = context.leads.create_manual(account_id, input).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

pub async fn get_lead(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<LeadDetails>, ApiError> {
    Ok(Json(context.leads.get(account_id, lead_id).await?))
}

pub async fn change_status(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Path(lead_id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<StatusChange>, ApiError> {
    Ok(Json(context.leads.change_status(account_id, lead_id, body.status).await?))
}

pub async fn record_call(
    State(context): State<Arc<AppContext>>,
    AccountId(account_id): AccountId,
    Path(lead_id): Path<Uuid>,
    Json(report): Json<CallReport>,
) -> Result<(StatusCode, Json<CallRecorded>), ApiError> {
    let recorded = context.leads.record_call(account_id, lead_id, report).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

fn parse_opt<T: std::str::FromStr<Err = String>>(value: Option<String>) -> Result<Option<T>, ApiError> {
    non_blank(value).map(|v| v.parse::<T>()).transpose().map_err(ApiError::BadRequest)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
