//! SQLite record store

pub mod account_repository;
mod columns;
pub mod communication_repository;
pub mod company_repository;
pub mod lead_repository;
pub mod manager;
pub mod tag_repository;
pub mod task_repository;
pub mod webhook_repository;

use std::sync::Arc;

use leadflow_core::RecordStore;

pub use account_repository::SqliteAccountRepository;
pub use communication_repository::SqliteCommunicationRepository;
pub use company_repository::SqliteCompanyRepository;
pub use lead_repository::SqliteLeadRepository;
pub use manager::{DbConnection, DbManager, SCHEMA_VERSION};
pub use tag_repository::SqliteTagRepository;
pub use task_repository::SqliteTaskRepository;
pub use webhook_repository::SqliteWebhookRepository;

/// Wire every SQLite repository over one shared pool.
pub fn sqlite_record_store(db: Arc<DbManager>) -> RecordStore {
    RecordStore {
        accounts: Arc::new(SqliteAccountRepository::new(Arc::clone(&db))),
        companies: Arc::new(SqliteCompanyRepository::new(Arc::clone(&db))),
        leads: Arc::new(SqliteLeadRepository::new(Arc::clone(&db))),
        tasks: Arc::new(SqliteTaskRepository::new(Arc::clone(&db))),
        tags: Arc::new(SqliteTagRepository::new(Arc::clone(&db))),
        communications: Arc::new(SqliteCommunicationRepository::new(Arc::clone(&db))),
        webhooks: Arc::new(SqliteWebhookRepository::new(db)),
    }
}
