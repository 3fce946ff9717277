//! Lifecycle of the automatic follow-up tasks of a lead
//!
//! Two task kinds are managed here:
//!
//! - **Contact**: created once for a new contact lead, completed when the
//!   lead moves from NEW to CONTACTED.
//! - **Call**: one open task per unsuccessful call attempt, capped at
//!   [`MAX_CALL_ATTEMPTS`]. The attempt number is derived from the number of
//!   call tasks ever created, so deleting them resets the counter.
//!
//! The store enforces at most one open task per (lead, kind). Concurrent
//! callers that lose the insert race receive the winning task. Failed call
//! attempts are serialised by the store: each one is counted exactly once.

use std::sync::Arc;

use leadflow_domain::constants::{MAX_CALL_ATTEMPTS, UNREACHABLE_TAG_COLOR, UNREACHABLE_TAG_NAME};
use leadflow_domain::{Lead, LeadStatus, Result, Task, TaskKind};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::ports::{CallTaskAdvance, OpenTaskInsert, TaskRepository};
use crate::leads::ports::TagRepository;

/// Result of registering a failed call attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAttemptOutcome {
    pub attempt_count: u32,
    pub is_final_attempt: bool,
    /// The open call task for this attempt. `None` on the final attempt.
    pub task: Option<Task>,
}

/// Result of resetting the call counter after a successful call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResetOutcome {
    pub deleted_call_tasks: u64,
    pub tag_removed: bool,
}

/// Drives contact and call tasks for leads
#[derive(Clone)]
pub struct TaskStateMachine {
    tasks: Arc<dyn TaskRepository>,
    tags: Arc<dyn TagRepository>,
}

impl TaskStateMachine {
    pub fn new(tasks: Arc<dyn TaskRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { tasks, tags }
    }

    /// Ensure a fresh contact lead has its open contact task.
    ///
    /// Returns the id of the open contact task (new or pre-existing), or
    /// `None` when the lead does not qualify.
    #[instrument(skip(self, lead), fields(lead_id = %lead.id))]
    pub async fn on_lead_created(&self, lead: &Lead) -> Result<Option<Uuid>> {
        if !lead.wants_contact_task() {
            return Ok(None);
        }

        if let Some(existing) = self.tasks.find_open_task(lead.id, TaskKind::Contact).await? {
            debug!(task_id = %existing.id, "Contact task already open");
            return Ok(Some(existing.id));
        }

        let task = Task::contact(lead.account_id, lead.id, &lead.name);
        match self.tasks.insert_open_task(&task).await? {
            OpenTaskInsert::Created(task) => {
                info!(task_id = %task.id, "Contact task created");
                Ok(Some(task.id))
            }
            OpenTaskInsert::AlreadyOpen(task) => Ok(Some(task.id)),
        }
    }

    /// React to a status change. Only NEW → CONTACTED does anything: it
    /// completes every open contact task of the lead.
    #[instrument(skip(self))]
    pub async fn on_status_changed(
        &self,
        lead_id: Uuid,
        old_status: LeadStatus,
        new_status: LeadStatus,
    ) -> Result<u64> {
        if old_status != LeadStatus::New || new_status != LeadStatus::Contacted {
            return Ok(0);
        }

        let completed = self.tasks.complete_open_tasks(lead_id, Some(TaskKind::Contact)).await?;
        info!(completed, "Contact tasks completed after lead was contacted");
        Ok(completed)
    }

    /// Register an unsuccessful call.
    ///
    /// Attempts below the cap close the previous call task and open one for
    /// the new attempt. The final attempt tags the lead as unreachable and
    /// completes all of its open tasks instead.
    #[instrument(skip(self, lead), fields(lead_id = %lead.id))]
    pub async fn on_call_attempt_failed(&self, lead: &Lead) -> Result<CallAttemptOutcome> {
        let mut previous = self.tasks.count_tasks(lead.id, TaskKind::Call).await?;
        loop {
            let attempt = u32::try_from(previous).unwrap_or(u32::MAX).saturating_add(1);

            if attempt >= MAX_CALL_ATTEMPTS {
                let tag = self
                    .tags
                    .upsert_tag(lead.account_id, UNREACHABLE_TAG_NAME, UNREACHABLE_TAG_COLOR)
                    .await?;
                self.tags.attach_tag(lead.id, tag.id).await?;
                let closed = self.complete_all_open_tasks(lead.id).await?;
                info!(attempt, closed, "Call attempts exhausted; lead marked unreachable");
                return Ok(CallAttemptOutcome {
                    attempt_count: attempt,
                    is_final_attempt: true,
                    task: None,
                });
            }

            let task = Task::call(lead.account_id, lead.id, attempt);
            match self.tasks.advance_call_task(&task, previous).await? {
                CallTaskAdvance::Opened(task) => {
                    info!(attempt, task_id = %task.id, "Call task created");
                    return Ok(CallAttemptOutcome {
                        attempt_count: attempt,
                        is_final_attempt: false,
                        task: Some(task),
                    });
                }
                CallTaskAdvance::Stale(current) => {
                    debug!(expected = previous, current, "Concurrent call attempt; recounting");
                    previous = current;
                }
            }
        }
    }

    /// Reset after a successful call: delete every call task (which resets
    /// the attempt counter) and drop the unreachable tag.
    #[instrument(skip(self, lead), fields(lead_id = %lead.id))]
    pub async fn on_call_succeeded(&self, lead: &Lead) -> Result<CallResetOutcome> {
        let deleted_call_tasks = self.tasks.delete_tasks(lead.id, TaskKind::Call).await?;
        let tag_removed =
            self.tags.detach_tag_by_name(lead.account_id, lead.id, UNREACHABLE_TAG_NAME).await?;
        info!(deleted_call_tasks, tag_removed, "Call counter reset");
        Ok(CallResetOutcome { deleted_call_tasks, tag_removed })
    }

    /// Complete every open task of the lead, whatever its kind.
    pub async fn complete_all_open_tasks(&self, lead_id: Uuid) -> Result<u64> {
        self.tasks.complete_open_tasks(lead_id, None).await
    }
}
