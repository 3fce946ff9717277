//! SQLite implementation of the communication log.

use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::CommunicationRepository;
use leadflow_domain::{Communication, Result as DomainResult};
use rusqlite::{params, Connection, Row};
use tokio::task;
use uuid::Uuid;

use super::columns::{map_join_error, millis, opt_json_at, parsed_at, timestamp_at, uuid_at};
use super::manager::{map_sql_error, DbManager};

const COMMUNICATION_COLUMNS: &str =
    "id, account_id, lead_id, type, direction, subject, content, status, metadata, created_at";

pub struct SqliteCommunicationRepository {
    db: Arc<DbManager>,
}

impl SqliteCommunicationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommunicationRepository for SqliteCommunicationRepository {
    async fn append_communication(&self, communication: &Communication) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let communication = communication.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_communication(&conn, &communication).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn communications_for_lead(&self, lead_id: Uuid) -> DomainResult<Vec<Communication>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Communication>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {COMMUNICATION_COLUMNS} FROM communications WHERE lead_id = ?1
                     ORDER BY created_at DESC, rowid DESC"
                ))
                .map_err(map_sql_error)?;
            let items = stmt
                .query_map(params![lead_id.to_string()], map_communication_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(items)
        })
        .await
        .map_err(map_join_error)?
    }
}

pub(crate) fn insert_communication(
    conn: &Connection,
    communication: &Communication,
) -> rusqlite::Result<()> {
    let metadata = communication
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;

    conn.execute(
        &format!(
            "INSERT INTO communications ({COMMUNICATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            communication.id.to_string(),
            communication.account_id.to_string(),
            communication.lead_id.to_string(),
            communication.comm_type.as_str(),
            communication.direction.as_str(),
            communication.subject,
            communication.content,
            communication.status,
            metadata,
            millis(&communication.created_at),
        ],
    )?;
    Ok(())
}

fn map_communication_row(row: &Row<'_>) -> rusqlite::Result<Communication> {
    Ok(Communication {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        lead_id: uuid_at(row, 2)?,
        comm_type: parsed_at(row, 3)?,
        direction: parsed_at(row, 4)?,
        subject: row.get(5)?,
        content: row.get(6)?,
        status: row.get(7)?,
        metadata: opt_json_at(row, 8)?,
        created_at: timestamp_at(row, 9)?,
    })
}

