//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::accounts::AccountService;
use leadflow_core::{
    EmailSender, IngestionPipeline, LeadService, NotificationProcessor, RecordStore, RetryPolicy,
};
use leadflow_domain::{Config, Result};
use leadflow_infra::{
    sqlite_record_store, DbManager, HttpEmailSender, LogEmailSender, NotificationQueue,
    NotificationWorker, NotificationWorkerConfig,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub store: RecordStore,
    pub pipeline: IngestionPipeline,
    pub leads: LeadService,
    pub accounts: AccountService,
    pub queue: NotificationQueue,
    worker: Mutex<NotificationWorker>,
}

impl AppContext {
    /// Open the database, migrate it, wire the services and start the
    /// notification worker.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let store = sqlite_record_store(Arc::clone(&db));
        let sender = email_sender(&config)?;

        let (queue, receiver) = NotificationQueue::bounded(config.notifications.queue_capacity);
        let processor = Arc::new(NotificationProcessor::new(
            &store,
            sender,
            RetryPolicy::from_config(&config.notifications),
            config.email.from_address.clone(),
        ));
        let mut worker =
            NotificationWorker::new(processor, receiver, NotificationWorkerConfig::default());
        worker.start()?;

        let pipeline =
            IngestionPipeline::new(store.clone(), Arc::new(queue.clone()), &config.ingestion);

        info!(
            database = %db.path().display(),
            queue_capacity = config.notifications.queue_capacity,
            "application context ready"
        );

        Ok(Self {
            leads: LeadService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            pipeline,
            store,
            queue,
            db,
            config,
            worker: Mutex::new(worker),
        })
    }

    /// Database reachability, schema version and worker state.
    pub async fn health_check(&self) -> HealthStatus {
        let db = Arc::clone(&self.db);
        let check = tokio::task::spawn_blocking(move || {
            db.health_check()?;
            db.schema_version()
        })
        .await;

        let mut status = HealthStatus::new();
        match check {
            Ok(Ok(version)) => {
                status.schema_version = Some(version);
                status = status.add_component(ComponentHealth::healthy("database"));
            }
            Ok(Err(err)) => {
                warn!(error = %err, "database health check failed");
                status = status.add_component(ComponentHealth::unhealthy("database", err.to_string()));
            }
            Err(err) => {
                warn!(error = %err, "database health check task panicked");
                status = status
                    .add_component(ComponentHealth::unhealthy("database", format!("task panic: {err}")));
            }
        }

        let worker = if self.worker.lock().await.is_running() {
            ComponentHealth::healthy("notification_worker")
        } else {
            ComponentHealth::unhealthy("notification_worker", "not running")
        };
        status.add_component(worker).evaluate()
    }

    /// Stop the notification worker. Jobs still queued are dropped with the
    /// process.
    pub async fn shutdown(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_running() {
            worker.stop().await?;
        }
        info!(free_slots = self.queue.remaining_capacity(), "application context shut down");
        Ok(())
    }
}

fn email_sender(config: &Config) -> Result<Arc<dyn EmailSender>> {
    let timeout = Duration::from_secs(config.notifications.send_timeout_secs);
    match config.email.api_base_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => {
            info!(provider = url, "email delivery enabled");
            Ok(Arc::new(HttpEmailSender::new(url, config.email.api_key.clone(), timeout)?))
        }
        None => {
            warn!("no email provider configured; notifications are only logged");
            Ok(Arc::new(LogEmailSender))
        }
    }
}
