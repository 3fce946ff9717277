#![allow(dead_code)]

use std::sync::Arc;

use leadflow_core::RecordStore;
use leadflow_domain::{Account, Lead, LeadType, Webhook};
use leadflow_infra::database::{sqlite_record_store, DbManager};
use tempfile::TempDir;

/// Migrated SQLite database in a temporary directory, kept alive for the
/// duration of a test.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub store: RecordStore,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("leadflow-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should apply");
        let manager = Arc::new(manager);

        Self { store: sqlite_record_store(Arc::clone(&manager)), manager, _temp_dir: temp_dir }
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    pub async fn seed_account(&self, name: &str) -> Account {
        let account = Account::new(name);
        self.store.accounts.insert_account(&account).await.expect("account insert");
        account
    }

    pub async fn seed_webhook(&self, account: &Account) -> Webhook {
        let webhook = Webhook::new(account.id, "Kontaktformular", "Website");
        self.store.webhooks.insert_webhook(&webhook).await.expect("webhook insert");
        webhook
    }

    pub async fn seed_lead(&self, account: &Account, name: &str, edit: impl FnOnce(&mut Lead)) -> Lead {
        let mut lead = Lead::new(account.id, name, LeadType::Contact, "Website");
        edit(&mut lead);
        self.store.leads.insert_lead(&lead).await.expect("lead insert");
        lead
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}
