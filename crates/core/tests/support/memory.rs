//! In-memory implementation of every record-store port

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use leadflow_core::{
    AccountRepository, CallTaskAdvance, CommunicationRepository, CompanyNameUpdate,
    CompanyRepository,
    LeadRepository, OpenTaskInsert, TagRepository, TaskRepository, WebhookRepository,
};
use leadflow_domain::{
    Account, Communication, Company, Lead, LeadFilter, LeadPage, LeadStatus, LeadflowError,
    PageRequest, Result as DomainResult, Tag, Task, TaskKind, TaskStatus, Webhook, WebhookLog,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// Raw tables, exposed for assertions.
#[derive(Default)]
pub struct Tables {
    pub accounts: Vec<Account>,
    pub companies: Vec<Company>,
    pub leads: Vec<Lead>,
    pub tasks: Vec<Task>,
    pub tags: Vec<Tag>,
    pub lead_tags: Vec<(Uuid, Uuid)>,
    pub communications: Vec<Communication>,
    pub webhooks: Vec<Webhook>,
    pub logs: Vec<WebhookLog>,
}

/// Mirrors the SQLite adapter's constraints: one open contact/call task
/// per lead, unique place ids per account, unique tag names per account.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_task_writes: AtomicBool,
    fail_lead_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn seed_account(&self, account: Account) {
        let mut tables = self.tables.lock();
        tables.accounts.retain(|a| a.id != account.id);
        tables.accounts.push(account);
    }

    pub fn seed_webhook(&self, webhook: Webhook) {
        let mut tables = self.tables.lock();
        tables.webhooks.retain(|w| w.id != webhook.id);
        tables.webhooks.push(webhook);
    }

    pub fn seed_lead(&self, lead: Lead) {
        self.tables.lock().leads.push(lead);
    }

    pub fn seed_task(&self, task: Task) {
        self.tables.lock().tasks.push(task);
    }

    /// Make every task write fail with a database error.
    pub fn fail_task_writes(&self) {
        self.fail_task_writes.store(true, Ordering::SeqCst);
    }

    /// Make lead inserts fail, aborting ingestion midway.
    pub fn fail_lead_inserts(&self) {
        self.fail_lead_inserts.store(true, Ordering::SeqCst);
    }

    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.tables.lock())
    }

    pub fn tasks_of(&self, lead_id: Uuid, kind: TaskKind) -> Vec<Task> {
        self.read(|t| {
            t.tasks.iter().filter(|task| task.lead_id == lead_id && task.kind == kind).cloned().collect()
        })
    }

    pub fn tag_names_of(&self, lead_id: Uuid) -> Vec<String> {
        self.read(|t| {
            t.lead_tags
                .iter()
                .filter(|(lead, _)| *lead == lead_id)
                .filter_map(|(_, tag_id)| t.tags.iter().find(|tag| tag.id == *tag_id))
                .map(|tag| tag.name.clone())
                .collect()
        })
    }

    fn check_task_writes(&self) -> DomainResult<()> {
        if self.fail_task_writes.load(Ordering::SeqCst) {
            return Err(LeadflowError::Database("database is locked".into()));
        }
        Ok(())
    }
}

fn place_conflict() -> LeadflowError {
    LeadflowError::Conflict(
        "UNIQUE constraint failed: companies.account_id, companies.external_place_id".into(),
    )
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn find_account(&self, account_id: Uuid) -> DomainResult<Option<Account>> {
        Ok(self.read(|t| t.accounts.iter().find(|a| a.id == account_id).cloned()))
    }

    async fn insert_account(&self, account: &Account) -> DomainResult<()> {
        self.seed_account(account.clone());
        Ok(())
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn upsert_company(
        &self,
        company: &Company,
        name: CompanyNameUpdate,
    ) -> DomainResult<Company> {
        let mut tables = self.tables.lock();
        let existing = tables.companies.iter_mut().find(|c| {
            c.account_id == company.account_id && c.external_place_id == company.external_place_id
        });
        if let Some(existing) = existing {
            let kept = Company {
                id: existing.id,
                name: match name {
                    CompanyNameUpdate::Replace => company.name.clone(),
                    CompanyNameUpdate::KeepStored => existing.name.clone(),
                },
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..company.clone()
            };
            *existing = kept.clone();
            return Ok(kept);
        }
        tables.companies.push(company.clone());
        Ok(company.clone())
    }

    async fn find_company(
        &self,
        account_id: Uuid,
        company_id: Uuid,
    ) -> DomainResult<Option<Company>> {
        Ok(self.read(|t| {
            t.companies.iter().find(|c| c.account_id == account_id && c.id == company_id).cloned()
        }))
    }

    async fn find_company_by_place_id(
        &self,
        account_id: Uuid,
        external_place_id: &str,
    ) -> DomainResult<Option<Company>> {
        Ok(self.read(|t| {
            t.companies
                .iter()
                .find(|c| c.account_id == account_id && c.external_place_id == external_place_id)
                .cloned()
        }))
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn find_lead(&self, account_id: Uuid, lead_id: Uuid) -> DomainResult<Option<Lead>> {
        Ok(self.read(|t| {
            t.leads.iter().find(|l| l.account_id == account_id && l.id == lead_id).cloned()
        }))
    }

    async fn find_lead_by_email(&self, account_id: Uuid, email: &str) -> DomainResult<Option<Lead>> {
        Ok(self.read(|t| {
            t.leads
                .iter()
                .filter(|l| l.account_id == account_id)
                .filter(|l| l.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
                .min_by_key(|l| l.created_at)
                .cloned()
        }))
    }

    async fn find_lead_by_phone(&self, account_id: Uuid, phone: &str) -> DomainResult<Option<Lead>> {
        Ok(self.read(|t| {
            t.leads
                .iter()
                .filter(|l| l.account_id == account_id && l.phone.as_deref() == Some(phone))
                .min_by_key(|l| l.created_at)
                .cloned()
        }))
    }

    async fn insert_lead(&self, lead: &Lead) -> DomainResult<()> {
        if self.fail_lead_inserts.load(Ordering::SeqCst) {
            return Err(LeadflowError::Database("disk I/O error".into()));
        }
        self.seed_lead(lead.clone());
        Ok(())
    }

    async fn update_lead_status(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> DomainResult<()> {
        let mut tables = self.tables.lock();
        let lead = tables
            .leads
            .iter_mut()
            .find(|l| l.account_id == account_id && l.id == lead_id)
            .ok_or_else(|| LeadflowError::NotFound(format!("lead {lead_id}")))?;
        lead.status = status;
        lead.updated_at = Utc::now();
        Ok(())
    }

    async fn list_leads(
        &self,
        account_id: Uuid,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> DomainResult<LeadPage> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut matching: Vec<Lead> = self.read(|t| {
            t.leads
                .iter()
                .filter(|l| l.account_id == account_id)
                .filter(|l| filter.status.map_or(true, |s| l.status == s))
                .filter(|l| filter.lead_type.map_or(true, |k| l.lead_type == k))
                .filter(|l| filter.source.as_deref().map_or(true, |s| l.source == s))
                .filter(|l| {
                    search.as_deref().map_or(true, |needle| {
                        [Some(l.name.as_str()), l.email.as_deref(), l.phone.as_deref()]
                            .into_iter()
                            .flatten()
                            .any(|field| field.to_lowercase().contains(needle))
                    })
                })
                .cloned()
                .collect()
        });
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .collect();
        Ok(LeadPage { total, page: page.page, per_page: page.per_page, items })
    }

    async fn create_with_company(
        &self,
        company: &Company,
        lead: &Lead,
        communications: &[Communication],
    ) -> DomainResult<()> {
        let mut tables = self.tables.lock();
        let taken = tables.companies.iter().any(|c| {
            c.account_id == company.account_id && c.external_place_id == company.external_place_id
        });
        if taken {
            return Err(place_conflict());
        }
        tables.companies.push(company.clone());
        tables.leads.push(lead.clone());
        tables.communications.extend(communications.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn find_open_task(&self, lead_id: Uuid, kind: TaskKind) -> DomainResult<Option<Task>> {
        Ok(self.read(|t| {
            t.tasks.iter().find(|task| task.lead_id == lead_id && task.kind == kind && task.is_open()).cloned()
        }))
    }

    async fn count_tasks(&self, lead_id: Uuid, kind: TaskKind) -> DomainResult<u64> {
        Ok(self.tasks_of(lead_id, kind).len() as u64)
    }

    async fn insert_open_task(&self, task: &Task) -> DomainResult<OpenTaskInsert> {
        self.check_task_writes()?;
        let mut tables = self.tables.lock();
        if task.kind != TaskKind::General {
            let open = tables
                .tasks
                .iter()
                .find(|t| t.lead_id == task.lead_id && t.kind == task.kind && t.is_open());
            if let Some(open) = open {
                return Ok(OpenTaskInsert::AlreadyOpen(open.clone()));
            }
        }
        tables.tasks.push(task.clone());
        Ok(OpenTaskInsert::Created(task.clone()))
    }

    async fn advance_call_task(
        &self,
        task: &Task,
        expected_count: u64,
    ) -> DomainResult<CallTaskAdvance> {
        self.check_task_writes()?;
        let mut tables = self.tables.lock();
        let calls = |t: &&mut Task| t.lead_id == task.lead_id && t.kind == TaskKind::Call;
        let current = tables.tasks.iter_mut().filter(calls).count() as u64;
        if current != expected_count {
            return Ok(CallTaskAdvance::Stale(current));
        }
        for open in tables.tasks.iter_mut().filter(calls).filter(|t| t.is_open()) {
            open.status = TaskStatus::Completed;
            open.completed_at = Some(Utc::now());
        }
        tables.tasks.push(task.clone());
        Ok(CallTaskAdvance::Opened(task.clone()))
    }

    async fn complete_task(&self, task_id: Uuid) -> DomainResult<bool> {
        self.check_task_writes()?;
        let mut tables = self.tables.lock();
        match tables.tasks.iter_mut().find(|t| t.id == task_id && t.is_open()) {
            Some(task) => {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_open_tasks(&self, lead_id: Uuid, kind: Option<TaskKind>) -> DomainResult<u64> {
        self.check_task_writes()?;
        let mut tables = self.tables.lock();
        let mut completed = 0;
        for task in tables.tasks.iter_mut().filter(|t| {
            t.lead_id == lead_id && t.is_open() && kind.map_or(true, |k| t.kind == k)
        }) {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            completed += 1;
        }
        Ok(completed)
    }

    async fn delete_tasks(&self, lead_id: Uuid, kind: TaskKind) -> DomainResult<u64> {
        self.check_task_writes()?;
        let mut tables = self.tables.lock();
        let before = tables.tasks.len();
        tables.tasks.retain(|t| !(t.lead_id == lead_id && t.kind == kind));
        Ok((before - tables.tasks.len()) as u64)
    }

    async fn tasks_for_lead(&self, lead_id: Uuid) -> DomainResult<Vec<Task>> {
        let mut tasks: Vec<Task> =
            self.read(|t| t.tasks.iter().filter(|task| task.lead_id == lead_id).cloned().collect());
        tasks.reverse();
        Ok(tasks)
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn upsert_tag(&self, account_id: Uuid, name: &str, color: &str) -> DomainResult<Tag> {
        let mut tables = self.tables.lock();
        if let Some(tag) = tables.tags.iter().find(|t| t.account_id == account_id && t.name == name) {
            return Ok(tag.clone());
        }
        let tag = Tag::new(account_id, name, color);
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn attach_tag(&self, lead_id: Uuid, tag_id: Uuid) -> DomainResult<bool> {
        let mut tables = self.tables.lock();
        if tables.lead_tags.contains(&(lead_id, tag_id)) {
            return Ok(false);
        }
        tables.lead_tags.push((lead_id, tag_id));
        Ok(true)
    }

    async fn detach_tag_by_name(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        name: &str,
    ) -> DomainResult<bool> {
        let mut tables = self.tables.lock();
        let Some(tag_id) =
            tables.tags.iter().find(|t| t.account_id == account_id && t.name == name).map(|t| t.id)
        else {
            return Ok(false);
        };
        let before = tables.lead_tags.len();
        tables.lead_tags.retain(|pair| *pair != (lead_id, tag_id));
        Ok(tables.lead_tags.len() < before)
    }

    async fn tags_for_lead(&self, lead_id: Uuid) -> DomainResult<Vec<Tag>> {
        Ok(self.read(|t| {
            t.lead_tags
                .iter()
                .filter(|(lead, _)| *lead == lead_id)
                .filter_map(|(_, tag_id)| t.tags.iter().find(|tag| tag.id == *tag_id).cloned())
                .collect()
        }))
    }
}

#[async_trait]
impl CommunicationRepository for MemoryStore {
    async fn append_communication(&self, communication: &Communication) -> DomainResult<()> {
        self.tables.lock().communications.push(communication.clone());
        Ok(())
    }

    async fn communications_for_lead(&self, lead_id: Uuid) -> DomainResult<Vec<Communication>> {
        let mut items: Vec<Communication> = self.read(|t| {
            t.communications.iter().filter(|c| c.lead_id == lead_id).cloned().collect()
        });
        items.reverse();
        Ok(items)
    }
}

#[async_trait]
impl WebhookRepository for MemoryStore {
    async fn find_webhook(&self, public_id: &str) -> DomainResult<Option<Webhook>> {
        Ok(self.read(|t| t.webhooks.iter().find(|w| w.webhook_id == public_id).cloned()))
    }

    async fn insert_webhook(&self, webhook: &Webhook) -> DomainResult<()> {
        self.seed_webhook(webhook.clone());
        Ok(())
    }

    async fn insert_log(&self, log: &WebhookLog) -> DomainResult<()> {
        self.tables.lock().logs.push(log.clone());
        Ok(())
    }

    async fn finish_log(
        &self,
        log_id: Uuid,
        success: bool,
        error: Option<&str>,
        lead_id: Option<Uuid>,
    ) -> DomainResult<()> {
        let mut tables = self.tables.lock();
        let log = tables
            .logs
            .iter_mut()
            .find(|l| l.id == log_id)
            .ok_or_else(|| LeadflowError::NotFound(format!("webhook log {log_id}")))?;
        log.success = success;
        log.error = error.map(str::to_string);
        log.lead_id = lead_id;
        log.updated_at = Utc::now();
        Ok(())
    }

    async fn find_log(&self, log_id: Uuid) -> DomainResult<Option<WebhookLog>> {
        Ok(self.read(|t| t.logs.iter().find(|l| l.id == log_id).cloned()))
    }

    async fn logs_for_webhook(&self, webhook_id: Uuid, limit: u32) -> DomainResult<Vec<WebhookLog>> {
        Ok(self.read(|t| {
            t.logs
                .iter()
                .rev()
                .filter(|l| l.webhook_id == webhook_id)
                .take(limit as usize)
                .cloned()
                .collect()
        }))
    }
}
