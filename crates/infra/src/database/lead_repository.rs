//! SQLite implementation of the lead port.

use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::LeadRepository;
use leadflow_domain::{
    Communication, Company, Lead, LeadFilter, LeadPage, LeadStatus, LeadflowError, PageRequest,
    Result as DomainResult, UtmAttribution,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::columns::{map_join_error, millis, opt_uuid_at, parsed_at, timestamp_at, uuid_at};
use super::communication_repository::insert_communication;
use super::company_repository::insert_company;
use super::manager::{map_sql_error, DbManager};

const LEAD_COLUMNS: &str = "id, account_id, company_id, name, first_name, last_name, email,
    phone, source, type, status, priority, utm_source, utm_medium, utm_campaign, utm_term,
    utm_content, notes, created_at, updated_at";

pub struct SqliteLeadRepository {
    db: Arc<DbManager>,
}

impl SqliteLeadRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        predicate: &'static str,
        account_id: Uuid,
        value: String,
    ) -> DomainResult<Option<Lead>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Lead>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE account_id = ?1 AND {predicate}
                     ORDER BY created_at ASC, rowid ASC LIMIT 1"
                ),
                params![account_id.to_string(), value],
                map_lead_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl LeadRepository for SqliteLeadRepository {
    async fn find_lead(&self, account_id: Uuid, lead_id: Uuid) -> DomainResult<Option<Lead>> {
        self.find_one("id = ?2", account_id, lead_id.to_string()).await
    }

    async fn find_lead_by_email(&self, account_id: Uuid, email: &str) -> DomainResult<Option<Lead>> {
        self.find_one("lower(email) = lower(?2)", account_id, email.to_string()).await
    }

    async fn find_lead_by_phone(&self, account_id: Uuid, phone: &str) -> DomainResult<Option<Lead>> {
        self.find_one("phone = ?2", account_id, phone.to_string()).await
    }

    async fn insert_lead(&self, lead: &Lead) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let lead = lead.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_lead(&conn, &lead).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_lead_status(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE leads SET status = ?3, updated_at = ?4 WHERE account_id = ?1 AND id = ?2",
                    params![
                        account_id.to_string(),
                        lead_id.to_string(),
                        status.as_str(),
                        millis(&chrono::Utc::now()),
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(LeadflowError::NotFound(format!("lead {lead_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_leads(
        &self,
        account_id: Uuid,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> DomainResult<LeadPage> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();

        task::spawn_blocking(move || -> DomainResult<LeadPage> {
            let conn = db.get_connection()?;
            let (where_sql, mut values) = filter_clause(account_id, &filter);

            let total: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM leads WHERE {where_sql}"),
                    params_from_iter(values.iter()),
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;

            values.push(Value::Integer(i64::from(page.per_page)));
            values.push(Value::Integer(i64::try_from(page.offset()).unwrap_or(i64::MAX)));
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE {where_sql}
                     ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
                ))
                .map_err(map_sql_error)?;
            let items = stmt
                .query_map(params_from_iter(values.iter()), map_lead_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;

            Ok(LeadPage {
                total: u64::try_from(total).unwrap_or_default(),
                page: page.page,
                per_page: page.per_page,
                items,
            })
        })
        .await
        .map_err(map_join_error)?
    }

    async fn create_with_company(
        &self,
        company: &Company,
        lead: &Lead,
        communications: &[Communication],
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let company = company.clone();
        let lead = lead.clone();
        let communications = communications.to_vec();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            insert_company(&tx, &company).map_err(map_sql_error)?;
            insert_lead(&tx, &lead).map_err(map_sql_error)?;
            for communication in &communications {
                insert_communication(&tx, communication).map_err(map_sql_error)?;
            }
            tx.commit().map_err(map_sql_error)?;
            debug!(lead_id = %lead.id, company_id = %company.id, "Company and lead created");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

/// WHERE clause and positional values for a lead listing.
fn filter_clause(account_id: Uuid, filter: &LeadFilter) -> (String, Vec<Value>) {
    let mut clauses = vec!["account_id = ?"];
    let mut values = vec![Value::Text(account_id.to_string())];

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(lead_type) = filter.lead_type {
        clauses.push("type = ?");
        values.push(Value::Text(lead_type.as_str().to_string()));
    }
    if let Some(source) = filter.source.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clauses.push("source = ?");
        values.push(Value::Text(source.to_string()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        clauses.push(
            "(lower(name) LIKE ? ESCAPE '\\' OR lower(email) LIKE ? ESCAPE '\\' \
             OR phone LIKE ? ESCAPE '\\')",
        );
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        values.extend(std::iter::repeat(Value::Text(pattern)).take(3));
    }

    (clauses.join(" AND "), values)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn insert_lead(conn: &Connection, lead: &Lead) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO leads ({LEAD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ),
        params![
            lead.id.to_string(),
            lead.account_id.to_string(),
            lead.company_id.map(|id| id.to_string()),
            lead.name,
            lead.first_name,
            lead.last_name,
            lead.email,
            lead.phone,
            lead.source,
            lead.lead_type.as_str(),
            lead.status.as_str(),
            lead.priority.as_str(),
            lead.utm.utm_source,
            lead.utm.utm_medium,
            lead.utm.utm_campaign,
            lead.utm.utm_term,
            lead.utm.utm_content,
            lead.notes,
            millis(&lead.created_at),
            millis(&lead.updated_at),
        ],
    )?;
    Ok(())
}

fn map_lead_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        company_id: opt_uuid_at(row, 2)?,
        name: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        email: row.get(6)?,
        phone: row.get(7)?,
        source: row.get(8)?,
        lead_type: parsed_at(row, 9)?,
        status: parsed_at(row, 10)?,
        priority: parsed_at(row, 11)?,
        utm: UtmAttribution {
            utm_source: row.get(12)?,
            utm_medium: row.get(13)?,
            utm_campaign: row.get(14)?,
            utm_term: row.get(15)?,
            utm_content: row.get(16)?,
        },
        notes: row.get(17)?,
        created_at: timestamp_at(row, 18)?,
        updated_at: timestamp_at(row, 19)?,
    })
}

#[cfg(test)]
mod tests {
    use leadflow_domain::LeadType;

    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn filter_clause_binds_values_in_order() {
        let account_id = Uuid::now_v7();
        let filter = LeadFilter {
            status: Some(LeadStatus::Won),
            lead_type: Some(LeadType::Company),
            source: Some("  ".into()),
            search: Some("Max".into()),
        };

        let (sql, values) = filter_clause(account_id, &filter);

        assert!(sql.starts_with("account_id = ? AND status = ? AND type = ? AND (lower(name)"));
        assert_eq!(values.len(), 6);
        assert_eq!(values[1], Value::Text("WON".into()));
        assert_eq!(values[3], Value::Text("%max%".into()));
    }
}
