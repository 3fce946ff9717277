//! SQLite connection manager and schema migrations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use leadflow_domain::{LeadflowError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::errors::InfraError;

/// Pooled SQLite connection.
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Classify task rows written before the kind column. Rows that would break
/// the one-open-task index keep `kind = NULL` and are classified at read
/// time instead.
const BACKFILL_TASK_KINDS_SQL: &str = "
    UPDATE OR IGNORE tasks SET kind = 'CONTACT'
        WHERE kind IS NULL AND lower(title) LIKE '%kontaktieren%';
    UPDATE OR IGNORE tasks SET kind = 'CALL'
        WHERE kind IS NULL
          AND lower(title) LIKE '%anrufen%'
          AND lower(title) NOT LIKE '%kontaktieren%';
    UPDATE tasks SET kind = 'GENERAL'
        WHERE kind IS NULL
          AND lower(title) NOT LIKE '%kontaktieren%'
          AND lower(title) NOT LIKE '%anrufen%';
";

/// Ordered migrations. Each runs once, inside a transaction.
const MIGRATIONS: &[(i32, &str)] = &[(1, SCHEMA_SQL), (2, BACKFILL_TASK_KINDS_SQL)];

/// Latest schema version this build knows about.
pub const SCHEMA_VERSION: i32 = 2;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Database manager that wraps an r2d2 pool of SQLite connections.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl DbManager {
    /// Open (or create) the database file with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path).with_init(apply_connection_pragmas);

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|err| LeadflowError::from(InfraError::from(err)))?;

        info!(db_path = %path.display(), max_connections = pool.max_size(), "sqlite pool initialised");

        Ok(Self { pool, path })
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<DbConnection> {
        self.pool.get().map_err(|err| LeadflowError::from(InfraError::from(err)))
    }

    /// Apply every migration newer than the stored schema version.
    pub fn run_migrations(&self) -> Result<()> {
        let mut conn = self.get_connection()?;
        migrate(&mut conn)
    }

    /// Current schema version (0 before the first migration).
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.get_connection()?;
        current_version(&conn)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

fn apply_connection_pragmas(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )
    .map_err(map_sql_error)?;

    let current = current_version(conn)?;
    for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        let tx = conn.transaction().map_err(map_sql_error)?;
        tx.execute_batch(sql).map_err(map_sql_error)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![version, chrono::Utc::now().timestamp_millis()],
        )
        .map_err(map_sql_error)?;
        tx.commit().map_err(map_sql_error)?;
        debug!(version, "schema migration applied");
    }

    if current < SCHEMA_VERSION {
        info!(from = current, to = SCHEMA_VERSION, "database schema migrated");
    }
    Ok(())
}

fn current_version(conn: &Connection) -> Result<i32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .map_err(map_sql_error)
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> LeadflowError {
    LeadflowError::from(InfraError::from(err))
}
