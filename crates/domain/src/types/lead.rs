//! Leads and the lead listing query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::impl_domain_status_conversions;

/// Whether a lead represents a business or a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadType {
    Company,
    Contact,
}

impl_domain_status_conversions!(LeadType {
    Company => "COMPANY",
    Contact => "CONTACT",
});

/// Pipeline position. The order is conventional; transitions are not
/// restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
    Archived,
}

impl_domain_status_conversions!(LeadStatus {
    New => "NEW",
    Contacted => "CONTACTED",
    Qualified => "QUALIFIED",
    Proposal => "PROPOSAL",
    Negotiation => "NEGOTIATION",
    Won => "WON",
    Lost => "LOST",
    Archived => "ARCHIVED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl_domain_status_conversions!(LeadPriority {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
});

/// Campaign attribution captured from inbound forms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UtmAttribution {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

impl UtmAttribution {
    pub fn is_empty(&self) -> bool {
        self.utm_source.is_none()
            && self.utm_medium.is_none()
            && self.utm_campaign.is_none()
            && self.utm_term.is_none()
            && self.utm_content.is_none()
    }
}

/// A prospective customer owned by one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    /// Tenant boundary. Never changes after creation.
    pub account_id: Uuid,
    pub company_id: Option<Uuid>,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub status: LeadStatus,
    pub priority: LeadPriority,
    #[serde(flatten)]
    pub utm: UtmAttribution,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// New lead in status NEW with medium priority.
    pub fn new(
        account_id: Uuid,
        name: impl Into<String>,
        lead_type: LeadType,
        source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            account_id,
            company_id: None,
            name: name.into(),
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            source: source.into(),
            lead_type,
            status: LeadStatus::New,
            priority: LeadPriority::Medium,
            utm: UtmAttribution::default(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Leads that should receive the automatic "contact" follow-up task.
    pub fn wants_contact_task(&self) -> bool {
        self.status == LeadStatus::New && self.lead_type == LeadType::Contact
    }
}

/// Listing filter. All predicates are optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: Option<LeadType>,
    /// Case-insensitive substring over name, email and phone.
    pub search: Option<String>,
}

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// Page bounded to `1..` with a size in `1..=MAX_PAGE_SIZE`.
    pub fn clamped(self) -> Self {
        Self { page: self.page.max(1), per_page: self.per_page.clamp(1, MAX_PAGE_SIZE) }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// Page of leads plus the unpaged total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPage {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub items: Vec<Lead>,
}
