//! SQLite implementation of the account port.

use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::AccountRepository;
use leadflow_domain::{Account, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::columns::{json_at, map_join_error, millis, timestamp_at, to_json, uuid_at};
use super::manager::{map_sql_error, DbManager};

pub struct SqliteAccountRepository {
    db: Arc<DbManager>,
}

impl SqliteAccountRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn find_account(&self, account_id: Uuid) -> DomainResult<Option<Account>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Account>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, name, owner_email, owner_name, email_settings, created_at
                 FROM accounts WHERE id = ?1",
                params![account_id.to_string()],
                map_account_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_account(&self, account: &Account) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let account = account.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let settings = to_json(&account.email_settings)?;
            conn.execute(
                "INSERT INTO accounts (id, name, owner_email, owner_name, email_settings, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.id.to_string(),
                    account.name,
                    account.owner_email,
                    account.owner_name,
                    settings,
                    millis(&account.created_at),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        owner_email: row.get(2)?,
        owner_name: row.get(3)?,
        email_settings: json_at(row, 4)?,
        created_at: timestamp_at(row, 5)?,
    })
}
