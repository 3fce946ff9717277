//! SQLite implementation of webhooks and their delivery log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use leadflow_core::WebhookRepository;
use leadflow_domain::{LeadflowError, Result as DomainResult, Webhook, WebhookLog};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::columns::{
    json_at, map_join_error, millis, opt_uuid_at, timestamp_at, to_json, uuid_at,
};
use super::manager::{map_sql_error, DbManager};

const WEBHOOK_COLUMNS: &str =
    "id, account_id, webhook_id, name, source, secret, settings, is_active, created_at";

const LOG_COLUMNS: &str =
    "id, account_id, webhook_id, payload, success, error, lead_id, created_at, updated_at";

pub struct SqliteWebhookRepository {
    db: Arc<DbManager>,
}

impl SqliteWebhookRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WebhookRepository for SqliteWebhookRepository {
    async fn find_webhook(&self, public_id: &str) -> DomainResult<Option<Webhook>> {
        let db = Arc::clone(&self.db);
        let public_id = public_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Webhook>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE webhook_id = ?1"),
                params![public_id],
                map_webhook_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_webhook(&self, webhook: &Webhook) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let webhook = webhook.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let settings = to_json(&webhook.settings)?;
            conn.execute(
                &format!(
                    "INSERT INTO webhooks ({WEBHOOK_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    webhook.id.to_string(),
                    webhook.account_id.to_string(),
                    webhook.webhook_id,
                    webhook.name,
                    webhook.source,
                    webhook.secret,
                    settings,
                    webhook.is_active,
                    millis(&webhook.created_at),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_log(&self, log: &WebhookLog) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let log = log.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let payload = to_json(&log.payload)?;
            conn.execute(
                &format!(
                    "INSERT INTO webhook_logs ({LOG_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    log.id.to_string(),
                    log.account_id.to_string(),
                    log.webhook_id.to_string(),
                    payload,
                    log.success,
                    log.error,
                    log.lead_id.map(|id| id.to_string()),
                    millis(&log.created_at),
                    millis(&log.updated_at),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn finish_log(
        &self,
        log_id: Uuid,
        success: bool,
        error: Option<&str>,
        lead_id: Option<Uuid>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let error = error.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE webhook_logs SET success = ?2, error = ?3, lead_id = ?4, updated_at = ?5
                     WHERE id = ?1",
                    params![
                        log_id.to_string(),
                        success,
                        error,
                        lead_id.map(|id| id.to_string()),
                        millis(&Utc::now()),
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(LeadflowError::NotFound(format!("webhook log {log_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_log(&self, log_id: Uuid) -> DomainResult<Option<WebhookLog>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<WebhookLog>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {LOG_COLUMNS} FROM webhook_logs WHERE id = ?1"),
                params![log_id.to_string()],
                map_log_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn logs_for_webhook(&self, webhook_id: Uuid, limit: u32) -> DomainResult<Vec<WebhookLog>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<WebhookLog>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {LOG_COLUMNS} FROM webhook_logs WHERE webhook_id = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT ?2"
                ))
                .map_err(map_sql_error)?;
            let logs = stmt
                .query_map(params![webhook_id.to_string(), limit], map_log_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(logs)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_webhook_row(row: &Row<'_>) -> rusqlite::Result<Webhook> {
    Ok(Webhook {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        webhook_id: row.get(2)?,
        name: row.get(3)?,
        source: row.get(4)?,
        secret: row.get(5)?,
        settings: json_at(row, 6)?,
        is_active: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
    })
}

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<WebhookLog> {
    Ok(WebhookLog {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        webhook_id: uuid_at(row, 2)?,
        payload: json_at(row, 3)?,
        success: row.get(4)?,
        error: row.get(5)?,
        lead_id: opt_uuid_at(row, 6)?,
        created_at: timestamp_at(row, 7)?,
        updated_at: timestamp_at(row, 8)?,
    })
}
