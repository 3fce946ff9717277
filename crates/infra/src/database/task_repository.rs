//! SQLite implementation of the task port.
//!
//! Rows written before the `kind` column are classified by title on every
//! read and kind filter, matching `TaskKind::classify`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use leadflow_core::{CallTaskAdvance, OpenTaskInsert, TaskRepository};
use leadflow_domain::{Result as DomainResult, Task, TaskKind, TaskStatus};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::columns::{map_join_error, millis, opt_timestamp_at, parsed_at, timestamp_at, uuid_at};
use super::manager::{map_sql_error, DbManager};

const TASK_COLUMNS: &str =
    "id, account_id, lead_id, kind, title, description, status, attempt, completed_at, created_at";

const OPEN: &str = "status <> 'COMPLETED'";

/// SQL predicate selecting tasks of `kind`, stored or inferred.
const fn kind_predicate(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Contact => {
            "(kind = 'CONTACT' OR (kind IS NULL AND lower(title) LIKE '%kontaktieren%'))"
        }
        TaskKind::Call => {
            "(kind = 'CALL' OR (kind IS NULL AND lower(title) LIKE '%anrufen%' \
             AND lower(title) NOT LIKE '%kontaktieren%'))"
        }
        TaskKind::General => {
            "(kind = 'GENERAL' OR (kind IS NULL AND lower(title) NOT LIKE '%kontaktieren%' \
             AND lower(title) NOT LIKE '%anrufen%'))"
        }
    }
}

pub struct SqliteTaskRepository {
    db: Arc<DbManager>,
}

impl SqliteTaskRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn find_open_task(&self, lead_id: Uuid, kind: TaskKind) -> DomainResult<Option<Task>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Task>> {
            let conn = db.get_connection()?;
            find_open(&conn, lead_id, kind).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_tasks(&self, lead_id: Uuid, kind: TaskKind) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            count_kind(&conn, lead_id, kind).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_open_task(&self, task: &Task) -> DomainResult<OpenTaskInsert> {
        let db = Arc::clone(&self.db);
        let task = task.clone();

        task::spawn_blocking(move || -> DomainResult<OpenTaskInsert> {
            let conn = db.get_connection()?;
            match insert_task(&conn, &task).map_err(map_sql_error) {
                Ok(()) => Ok(OpenTaskInsert::Created(task)),
                Err(err) if err.is_conflict_on("tasks.lead_id") => {
                    debug!(lead_id = %task.lead_id, kind = %task.kind, "Open task already exists");
                    find_open(&conn, task.lead_id, task.kind)
                        .map_err(map_sql_error)?
                        .map(OpenTaskInsert::AlreadyOpen)
                        .ok_or(err)
                }
                Err(err) => Err(err),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn advance_call_task(
        &self,
        task: &Task,
        expected_count: u64,
    ) -> DomainResult<CallTaskAdvance> {
        let db = Arc::clone(&self.db);
        let task = task.clone();

        task::spawn_blocking(move || -> DomainResult<CallTaskAdvance> {
            let mut conn = db.get_connection()?;
            // IMMEDIATE takes the write lock up front so the recount below
            // cannot interleave with another writer.
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            let current = count_kind(&tx, task.lead_id, TaskKind::Call).map_err(map_sql_error)?;
            if current != expected_count {
                debug!(lead_id = %task.lead_id, expected_count, current, "Call count moved");
                return Ok(CallTaskAdvance::Stale(current));
            }

            tx.execute(
                &format!(
                    "UPDATE tasks SET status = ?2, completed_at = ?3
                     WHERE lead_id = ?1 AND {OPEN} AND {}",
                    kind_predicate(TaskKind::Call)
                ),
                params![
                    task.lead_id.to_string(),
                    TaskStatus::Completed.as_str(),
                    millis(&Utc::now())
                ],
            )
            .map_err(map_sql_error)?;
            insert_task(&tx, &task).map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(CallTaskAdvance::Opened(task))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn complete_task(&self, task_id: Uuid) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    &format!("UPDATE tasks SET status = ?2, completed_at = ?3 WHERE id = ?1 AND {OPEN}"),
                    params![
                        task_id.to_string(),
                        TaskStatus::Completed.as_str(),
                        millis(&Utc::now())
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn complete_open_tasks(&self, lead_id: Uuid, kind: Option<TaskKind>) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let kind_sql = kind.map_or("1 = 1", kind_predicate);
            let changed = conn
                .execute(
                    &format!(
                        "UPDATE tasks SET status = ?2, completed_at = ?3
                         WHERE lead_id = ?1 AND {OPEN} AND {kind_sql}"
                    ),
                    params![
                        lead_id.to_string(),
                        TaskStatus::Completed.as_str(),
                        millis(&Utc::now())
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_tasks(&self, lead_id: Uuid, kind: TaskKind) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute(
                    &format!("DELETE FROM tasks WHERE lead_id = ?1 AND {}", kind_predicate(kind)),
                    params![lead_id.to_string()],
                )
                .map_err(map_sql_error)?;
            Ok(deleted as u64)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn tasks_for_lead(&self, lead_id: Uuid) -> DomainResult<Vec<Task>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Task>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE lead_id = ?1
                     ORDER BY created_at DESC, rowid DESC"
                ))
                .map_err(map_sql_error)?;
            let tasks = stmt
                .query_map(params![lead_id.to_string()], map_task_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(tasks)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn count_kind(conn: &Connection, lead_id: Uuid, kind: TaskKind) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM tasks WHERE lead_id = ?1 AND {}", kind_predicate(kind)),
        params![lead_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn find_open(conn: &Connection, lead_id: Uuid, kind: TaskKind) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE lead_id = ?1 AND {OPEN} AND {}
             ORDER BY created_at ASC LIMIT 1",
            kind_predicate(kind)
        ),
        params![lead_id.to_string()],
        map_task_row,
    )
    .optional()
}

fn insert_task(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
        params![
            task.id.to_string(),
            task.account_id.to_string(),
            task.lead_id.to_string(),
            task.kind.as_str(),
            task.title,
            task.description,
            task.status.as_str(),
            task.attempt,
            task.completed_at.as_ref().map(millis),
            millis(&task.created_at),
        ],
    )?;
    Ok(())
}

fn map_task_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let title: String = row.get(4)?;
    let kind = match row.get::<_, Option<String>>(3)? {
        Some(_) => parsed_at(row, 3)?,
        None => TaskKind::classify(&title),
    };
    Ok(Task {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        lead_id: uuid_at(row, 2)?,
        kind,
        title,
        description: row.get(5)?,
        status: parsed_at(row, 6)?,
        attempt: row.get(7)?,
        completed_at: opt_timestamp_at(row, 8)?,
        created_at: timestamp_at(row, 9)?,
    })
}
