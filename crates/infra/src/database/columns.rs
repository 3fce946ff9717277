//! Row decoding helpers shared by the repositories.
//!
//! Ids are stored as UUID text, timestamps as unix milliseconds, enums as
//! their canonical upper-case strings and nested settings as JSON text.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use leadflow_domain::LeadflowError;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use tokio::task::JoinError;
use uuid::Uuid;

fn conversion_failure(
    idx: usize,
    ty: Type,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, err.into())
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|err| conversion_failure(idx, Type::Text, err))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| Uuid::parse_str(&raw).map_err(|err| conversion_failure(idx, Type::Text, err)))
        .transpose()
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

pub(crate) fn opt_timestamp_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(millis) => DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis)),
        None => Ok(None),
    }
}

/// Decode an enum stored as its canonical string.
pub(crate) fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|err: String| conversion_failure(idx, Type::Text, err))
}

pub(crate) fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|err| conversion_failure(idx, Type::Text, err))
}

pub(crate) fn opt_json_at<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| serde_json::from_str(&raw).map_err(|err| conversion_failure(idx, Type::Text, err)))
        .transpose()
}

pub(crate) fn millis(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, LeadflowError> {
    serde_json::to_string(value)
        .map_err(|err| LeadflowError::Internal(format!("failed to encode JSON column: {err}")))
}

pub(crate) fn map_join_error(err: JoinError) -> LeadflowError {
    LeadflowError::Internal(format!("Task join error: {err}"))
}
