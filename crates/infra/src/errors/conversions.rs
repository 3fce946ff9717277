//! Conversions from external infrastructure errors into domain errors.

use leadflow_domain::LeadflowError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub LeadflowError);

impl From<InfraError> for LeadflowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LeadflowError> for InfraError {
    fn from(value: LeadflowError) -> Self {
        InfraError(value)
    }
}

trait IntoLeadflowError {
    fn into_leadflow(self) -> LeadflowError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → LeadflowError */
/* -------------------------------------------------------------------------- */

impl IntoLeadflowError for SqlError {
    fn into_leadflow(self) -> LeadflowError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        LeadflowError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        LeadflowError::Database("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY. The
                    // message names the columns, which callers match on.
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        LeadflowError::Conflict(message)
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        LeadflowError::Database("foreign key constraint violation".into())
                    }
                    _ => LeadflowError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => LeadflowError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                LeadflowError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                LeadflowError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => LeadflowError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => LeadflowError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_leadflow())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → LeadflowError */
/* -------------------------------------------------------------------------- */

impl IntoLeadflowError for r2d2::Error {
    fn into_leadflow(self) -> LeadflowError {
        LeadflowError::Database(format!("connection pool: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_leadflow())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LeadflowError */
/* -------------------------------------------------------------------------- */

impl IntoLeadflowError for HttpError {
    fn into_leadflow(self) -> LeadflowError {
        if self.is_timeout() {
            return LeadflowError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return LeadflowError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_to_error(status.as_u16(), status.canonical_reason());
        }

        LeadflowError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_leadflow())
    }
}

/// Classify an HTTP status. Rate limits and server errors are transient.
pub(crate) fn status_to_error(code: u16, reason: Option<&str>) -> LeadflowError {
    let message = format!("HTTP {} {}", code, reason.unwrap_or("unknown status"));
    match code {
        401 | 403 => LeadflowError::Auth(message),
        404 => LeadflowError::NotFound(message),
        429 => LeadflowError::Network(message),
        400..=499 => LeadflowError::InvalidInput(message),
        _ => LeadflowError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
