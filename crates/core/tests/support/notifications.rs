//! Test doubles for the notification ports

use std::collections::VecDeque;

use async_trait::async_trait;
use leadflow_core::{EmailSender, NotificationDispatcher, SubmitError};
use leadflow_domain::{NotificationJob, OutboundEmail, Result as DomainResult};
use parking_lot::Mutex;

/// Dispatcher that keeps every submitted job.
#[derive(Default)]
pub struct RecordingDispatcher {
    jobs: Mutex<Vec<NotificationJob>>,
    reject_with: Option<SubmitError>,
}

impl RecordingDispatcher {
    /// Dispatcher whose queue never accepts anything.
    pub fn rejecting(error: SubmitError) -> Self {
        Self { jobs: Mutex::default(), reject_with: Some(error) }
    }

    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn submit(&self, job: NotificationJob) -> Result<(), SubmitError> {
        if let Some(error) = self.reject_with {
            return Err(error);
        }
        self.jobs.lock().push(job);
        Ok(())
    }
}

/// Sender that replays scripted results and records every attempt.
///
/// Once the script runs out every send succeeds.
#[derive(Default)]
pub struct ScriptedEmailSender {
    script: Mutex<VecDeque<DomainResult<()>>>,
    attempts: Mutex<Vec<OutboundEmail>>,
}

impl ScriptedEmailSender {
    pub fn with_script(results: Vec<DomainResult<()>>) -> Self {
        Self { script: Mutex::new(results.into()), attempts: Mutex::default() }
    }

    pub fn attempts(&self) -> Vec<OutboundEmail> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl EmailSender for ScriptedEmailSender {
    async fn send(&self, email: &OutboundEmail) -> DomainResult<()> {
        self.attempts.lock().push(email.clone());
        self.script.lock().pop_front().unwrap_or(Ok(()))
    }
}
