//! Port interface for task persistence

use async_trait::async_trait;
use leadflow_domain::{Result, Task, TaskKind};
use uuid::Uuid;

/// Outcome of inserting a contact or call task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTaskInsert {
    Created(Task),
    /// An open task of the same kind already existed; this is it.
    AlreadyOpen(Task),
}

impl OpenTaskInsert {
    pub fn into_task(self) -> Task {
        match self {
            Self::Created(task) | Self::AlreadyOpen(task) => task,
        }
    }
}

/// Outcome of opening the call task for the next failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTaskAdvance {
    /// The previous call task was completed and this one inserted.
    Opened(Task),
    /// The call count no longer matched; carries the current count. Nothing
    /// was written.
    Stale(u64),
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// The open (PENDING or IN_PROGRESS) task of `kind`, if any.
    async fn find_open_task(&self, lead_id: Uuid, kind: TaskKind) -> Result<Option<Task>>;

    /// Number of tasks of `kind` ever created for the lead, any status.
    async fn count_tasks(&self, lead_id: Uuid, kind: TaskKind) -> Result<u64>;

    /// Insert a new task. For contact and call tasks the store guarantees at
    /// most one open task per (lead, kind); a losing insert reports the
    /// winner as `AlreadyOpen` instead of failing.
    async fn insert_open_task(&self, task: &Task) -> Result<OpenTaskInsert>;

    /// In one atomic step: verify the lead still has `expected_count` call
    /// tasks, complete its open call task and insert `task`.
    async fn advance_call_task(&self, task: &Task, expected_count: u64) -> Result<CallTaskAdvance>;

    /// Mark one task COMPLETED. Returns `false` if it was not open.
    async fn complete_task(&self, task_id: Uuid) -> Result<bool>;

    /// Mark every open task of the lead COMPLETED, optionally restricted to
    /// one kind. Returns the number of rows changed.
    async fn complete_open_tasks(&self, lead_id: Uuid, kind: Option<TaskKind>) -> Result<u64>;

    /// Delete every task of `kind` for the lead regardless of status.
    async fn delete_tasks(&self, lead_id: Uuid, kind: TaskKind) -> Result<u64>;

    /// Newest first.
    async fn tasks_for_lead(&self, lead_id: Uuid) -> Result<Vec<Task>>;
}
