//! SQLite implementation of the tag port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use leadflow_core::TagRepository;
use leadflow_domain::{Result as DomainResult, Tag};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::columns::{map_join_error, millis, timestamp_at, uuid_at};
use super::manager::{map_sql_error, DbManager};

pub struct SqliteTagRepository {
    db: Arc<DbManager>,
}

impl SqliteTagRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn upsert_tag(&self, account_id: Uuid, name: &str, color: &str) -> DomainResult<Tag> {
        let db = Arc::clone(&self.db);
        let candidate = Tag::new(account_id, name, color);

        task::spawn_blocking(move || -> DomainResult<Tag> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO tags (id, account_id, name, color, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (account_id, name) DO NOTHING",
                params![
                    candidate.id.to_string(),
                    candidate.account_id.to_string(),
                    candidate.name,
                    candidate.color,
                    millis(&candidate.created_at),
                ],
            )
            .map_err(map_sql_error)?;

            conn.query_row(
                "SELECT id, account_id, name, color, created_at FROM tags
                 WHERE account_id = ?1 AND name = ?2",
                params![candidate.account_id.to_string(), candidate.name],
                map_tag_row,
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn attach_tag(&self, lead_id: Uuid, tag_id: Uuid) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO lead_tags (lead_id, tag_id, created_at) VALUES (?1, ?2, ?3)",
                    params![lead_id.to_string(), tag_id.to_string(), millis(&Utc::now())],
                )
                .map_err(map_sql_error)?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn detach_tag_by_name(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        name: &str,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(
                    "DELETE FROM lead_tags WHERE lead_id = ?1 AND tag_id IN (
                         SELECT id FROM tags WHERE account_id = ?2 AND name = ?3
                     )",
                    params![lead_id.to_string(), account_id.to_string(), name],
                )
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn tags_for_lead(&self, lead_id: Uuid) -> DomainResult<Vec<Tag>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Tag>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT t.id, t.account_id, t.name, t.color, t.created_at
                     FROM tags t JOIN lead_tags lt ON lt.tag_id = t.id
                     WHERE lt.lead_id = ?1 ORDER BY t.name",
                )
                .map_err(map_sql_error)?;
            let tags = stmt
                .query_map(params![lead_id.to_string()], map_tag_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(tags)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_tag_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}
