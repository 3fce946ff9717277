//! Background worker draining the notification queue.
//!
//! Lifecycle mirrors the other long-running tasks in this crate: the join
//! handle is tracked, cancellation is explicit, and every job runs under a
//! timeout so a stuck provider cannot stall the queue.

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::NotificationProcessor;
use leadflow_domain::{LeadflowError, NotificationJob, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::queue::NotificationReceiver;

#[derive(Debug, Clone)]
pub struct NotificationWorkerConfig {
    /// Upper bound for one job, retries and backoff included
    pub job_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for NotificationWorkerConfig {
    fn default() -> Self {
        Self { job_timeout: Duration::from_secs(120), join_timeout: Duration::from_secs(5) }
    }
}

/// Notification worker with explicit lifecycle management.
pub struct NotificationWorker {
    processor: Arc<NotificationProcessor>,
    config: NotificationWorkerConfig,
    receiver: Option<NotificationReceiver>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<NotificationReceiver>>,
}

impl NotificationWorker {
    pub fn new(
        processor: Arc<NotificationProcessor>,
        receiver: NotificationReceiver,
        config: NotificationWorkerConfig,
    ) -> Self {
        Self {
            processor,
            config,
            receiver: Some(receiver),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Spawn the processing loop.
    ///
    /// # Errors
    /// Returns `LeadflowError::Internal` if the worker is already running.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(LeadflowError::Internal("Notification worker already running".into()));
        }
        let Some(receiver) = self.receiver.take() else {
            return Err(LeadflowError::Internal("Notification receiver unavailable".into()));
        };

        self.cancellation = CancellationToken::new();
        let processor = Arc::clone(&self.processor);
        let job_timeout = self.config.job_timeout;
        let cancel = self.cancellation.clone();

        self.task_handle = Some(tokio::spawn(Self::process_loop(
            processor,
            receiver,
            job_timeout,
            cancel,
        )));
        info!("Notification worker started");
        Ok(())
    }

    /// Cancel the loop and wait for it to hand the receiver back. Jobs still
    /// queued stay queued and are picked up by the next `start`.
    ///
    /// # Errors
    /// Returns `LeadflowError::Internal` if the worker is not running, the
    /// task panicked, or it did not finish within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(LeadflowError::Internal("Notification worker not running".into()));
        };

        info!("Stopping notification worker");
        self.cancellation.cancel();

        match tokio::time::timeout(self.config.join_timeout, handle).await {
            Ok(Ok(receiver)) => {
                self.receiver = Some(receiver);
                info!("Notification worker stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Notification worker task panicked: {}", e);
                Err(LeadflowError::Internal("Notification worker task panicked".into()))
            }
            Err(_) => {
                warn!("Notification worker did not complete within timeout");
                Err(LeadflowError::Internal("Notification worker timeout".into()))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn process_loop(
        processor: Arc<NotificationProcessor>,
        mut receiver: NotificationReceiver,
        job_timeout: Duration,
        cancel: CancellationToken,
    ) -> NotificationReceiver {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Notification worker loop cancelled");
                    break;
                }
                next = receiver.recv() => {
                    let Some(job) = next else {
                        debug!("Notification queue closed");
                        break;
                    };
                    Self::run_job(&processor, &job, job_timeout).await;
                }
            }
        }
        receiver
    }

    async fn run_job(processor: &NotificationProcessor, job: &NotificationJob, job_timeout: Duration) {
        match tokio::time::timeout(job_timeout, processor.process(job)).await {
            Ok(Ok(report)) => {
                debug!(job_id = %job.id, sent = report.sent, failed = report.failed, "Notification job done");
            }
            Ok(Err(e)) => {
                error!(job_id = %job.id, error = %e, "Notification job failed");
            }
            Err(_) => {
                warn!(job_id = %job.id, timeout_secs = job_timeout.as_secs(), "Notification job timed out");
            }
        }
    }
}

impl Drop for NotificationWorker {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            warn!("NotificationWorker dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
