//! Port interfaces for accounts, companies, leads, tags and communications
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations. Every query is scoped by the
//! account id that owns the rows.

use async_trait::async_trait;
use leadflow_domain::{
    Account, Communication, Company, Lead, LeadFilter, LeadPage, LeadStatus, PageRequest, Result,
    Tag,
};
use uuid::Uuid;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>>;

    async fn insert_account(&self, account: &Account) -> Result<()>;
}

/// How an upsert treats the name of a company that is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyNameUpdate {
    /// The incoming name is authoritative.
    Replace,
    /// The incoming name is a stand-in; only used for a new row.
    KeepStored,
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Insert the company, or update the row that already holds its
    /// (`account_id`, `external_place_id`) key. Must be a single atomic
    /// statement. Returns the stored row; on update the existing id is kept.
    async fn upsert_company(&self, company: &Company, name: CompanyNameUpdate) -> Result<Company>;

    async fn find_company(&self, account_id: Uuid, company_id: Uuid) -> Result<Option<Company>>;

    async fn find_company_by_place_id(
        &self,
        account_id: Uuid,
        external_place_id: &str,
    ) -> Result<Option<Company>>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_lead(&self, account_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>>;

    /// Oldest lead of the account with this email (case-insensitive).
    async fn find_lead_by_email(&self, account_id: Uuid, email: &str) -> Result<Option<Lead>>;

    /// Oldest lead of the account with this phone number.
    async fn find_lead_by_phone(&self, account_id: Uuid, phone: &str) -> Result<Option<Lead>>;

    async fn insert_lead(&self, lead: &Lead) -> Result<()>;

    /// Fails with `NotFound` when the lead does not belong to the account.
    async fn update_lead_status(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> Result<()>;

    async fn list_leads(
        &self,
        account_id: Uuid,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> Result<LeadPage>;

    /// Insert company, lead and communications in one transaction.
    async fn create_with_company(
        &self,
        company: &Company,
        lead: &Lead,
        communications: &[Communication],
    ) -> Result<()>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Return the tag named `name`, creating it with `color` if absent.
    async fn upsert_tag(&self, account_id: Uuid, name: &str, color: &str) -> Result<Tag>;

    /// Attach a tag to a lead. Returns `false` if it was already attached.
    async fn attach_tag(&self, lead_id: Uuid, tag_id: Uuid) -> Result<bool>;

    /// Detach the tag called `name`. Returns `false` if it was not attached.
    async fn detach_tag_by_name(&self, account_id: Uuid, lead_id: Uuid, name: &str)
        -> Result<bool>;

    async fn tags_for_lead(&self, lead_id: Uuid) -> Result<Vec<Tag>>;
}

#[async_trait]
pub trait CommunicationRepository: Send + Sync {
    async fn append_communication(&self, communication: &Communication) -> Result<()>;

    /// Newest first.
    async fn communications_for_lead(&self, lead_id: Uuid) -> Result<Vec<Communication>>;
}
