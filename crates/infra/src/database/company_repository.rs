//! SQLite implementation of the company port.

use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::{CompanyNameUpdate, CompanyRepository};
use leadflow_domain::{Company, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::columns::{map_join_error, millis, timestamp_at, uuid_at};
use super::manager::{map_sql_error, DbManager};

pub(crate) const COMPANY_COLUMNS: &str = "id, account_id, external_place_id, name, phone, email,
    website, address, city, postal_code, country, rating, review_count, has_website, has_phone,
    has_email, created_at, updated_at";

/// Existing rows keep their id and creation time; fields missing from the
/// new data keep their stored value. `?19` keeps the stored name.
const UPSERT_SQL: &str = "INSERT INTO companies (
        id, account_id, external_place_id, name, phone, email, website, address, city,
        postal_code, country, rating, review_count, has_website, has_phone, has_email,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
    ON CONFLICT (account_id, external_place_id) DO UPDATE SET
        name = CASE WHEN ?19 THEN companies.name ELSE excluded.name END,
        phone = COALESCE(excluded.phone, companies.phone),
        email = COALESCE(excluded.email, companies.email),
        website = COALESCE(excluded.website, companies.website),
        address = COALESCE(excluded.address, companies.address),
        city = COALESCE(excluded.city, companies.city),
        postal_code = COALESCE(excluded.postal_code, companies.postal_code),
        country = COALESCE(excluded.country, companies.country),
        rating = COALESCE(excluded.rating, companies.rating),
        review_count = COALESCE(excluded.review_count, companies.review_count),
        has_website = MAX(excluded.has_website, companies.has_website),
        has_phone = MAX(excluded.has_phone, companies.has_phone),
        has_email = MAX(excluded.has_email, companies.has_email),
        updated_at = excluded.updated_at
    RETURNING id, account_id, external_place_id, name, phone, email,
        website, address, city, postal_code, country, rating, review_count, has_website,
        has_phone, has_email, created_at, updated_at";

pub struct SqliteCompanyRepository {
    db: Arc<DbManager>,
}

impl SqliteCompanyRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CompanyRepository for SqliteCompanyRepository {
    async fn upsert_company(
        &self,
        company: &Company,
        name: CompanyNameUpdate,
    ) -> DomainResult<Company> {
        let db = Arc::clone(&self.db);
        let company = company.clone();

        task::spawn_blocking(move || -> DomainResult<Company> {
            let conn = db.get_connection()?;
            let stored = conn
                .query_row(
                    UPSERT_SQL,
                    params![
                        company.id.to_string(),
                        company.account_id.to_string(),
                        company.external_place_id,
                        company.name,
                        company.phone,
                        company.email,
                        company.website,
                        company.address,
                        company.city,
                        company.postal_code,
                        company.country,
                        company.rating,
                        company.review_count,
                        company.has_website,
                        company.has_phone,
                        company.has_email,
                        millis(&company.created_at),
                        millis(&company.updated_at),
                        name == CompanyNameUpdate::KeepStored,
                    ],
                    map_company_row,
                )
                .map_err(map_sql_error)?;
            if stored.id != company.id {
                debug!(company_id = %stored.id, "Company updated in place");
            }
            Ok(stored)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_company(
        &self,
        account_id: Uuid,
        company_id: Uuid,
    ) -> DomainResult<Option<Company>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Company>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE account_id = ?1 AND id = ?2"),
                params![account_id.to_string(), company_id.to_string()],
                map_company_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_company_by_place_id(
        &self,
        account_id: Uuid,
        external_place_id: &str,
    ) -> DomainResult<Option<Company>> {
        let db = Arc::clone(&self.db);
        let place_id = external_place_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Company>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies
                     WHERE account_id = ?1 AND external_place_id = ?2"
                ),
                params![account_id.to_string(), place_id],
                map_company_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Plain insert, used inside the place-import transaction where a known
/// place id must fail instead of merging.
pub(crate) fn insert_company(conn: &Connection, company: &Company) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO companies ({COMPANY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        params![
            company.id.to_string(),
            company.account_id.to_string(),
            company.external_place_id,
            company.name,
            company.phone,
            company.email,
            company.website,
            company.address,
            company.city,
            company.postal_code,
            company.country,
            company.rating,
            company.review_count,
            company.has_website,
            company.has_phone,
            company.has_email,
            millis(&company.created_at),
            millis(&company.updated_at),
        ],
    )?;
    Ok(())
}

pub(crate) fn map_company_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: uuid_at(row, 0)?,
        account_id: uuid_at(row, 1)?,
        external_place_id: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        website: row.get(6)?,
        address: row.get(7)?,
        city: row.get(8)?,
        postal_code: row.get(9)?,
        country: row.get(10)?,
        rating: row.get(11)?,
        review_count: row.get(12)?,
        has_website: row.get(13)?,
        has_phone: row.get(14)?,
        has_email: row.get(15)?,
        created_at: timestamp_at(row, 16)?,
        updated_at: timestamp_at(row, 17)?,
    })
}
