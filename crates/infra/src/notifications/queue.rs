//! Bounded in-process queue between request handlers and the worker.

use leadflow_core::{NotificationDispatcher, SubmitError};
use leadflow_domain::NotificationJob;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Receiving half, consumed by [`super::NotificationWorker`].
pub type NotificationReceiver = mpsc::Receiver<NotificationJob>;

/// Sending half handed to the services as a [`NotificationDispatcher`].
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationJob>,
}

impl NotificationQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    pub fn bounded(capacity: usize) -> (Self, NotificationReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Jobs that can still be accepted without rejection.
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl NotificationDispatcher for NotificationQueue {
    fn submit(&self, job: NotificationJob) -> Result<(), SubmitError> {
        self.tx.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => SubmitError::QueueFull,
            TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}
