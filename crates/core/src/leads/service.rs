//! Lead service - manual entry, status changes, calls and place imports

use std::sync::Arc;

use leadflow_domain::constants::PLACE_IMPORT_NOTE_SUBJECT;
use leadflow_domain::impl_domain_status_conversions;
use leadflow_domain::{
    Communication, CommunicationType, Company, Direction, Lead, LeadFilter, LeadPage,
    LeadPriority, LeadStatus, LeadType, LeadflowError, PageRequest, Result, Tag, Task,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::ingestion::duplicate_guard::DuplicateGuard;
use crate::ingestion::field_mapper::assemble_name;
use crate::store::RecordStore;
use crate::tasks::{CallAttemptOutcome, CallResetOutcome, TaskStateMachine};

const MANUAL_SOURCE: &str = "Manuell";
const PLACES_SOURCE: &str = "Google Places";

/// Manually entered lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLead {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: Option<LeadType>,
    pub priority: Option<LeadPriority>,
    pub company_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Place details fetched by the caller from Google Places
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceImport {
    pub company: Company,
    pub lead: Lead,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub lead: Lead,
    pub previous_status: LeadStatus,
    pub completed_contact_tasks: u64,
}

/// Lead with everything hanging off it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetails {
    pub lead: Lead,
    pub company: Option<Company>,
    pub tasks: Vec<Task>,
    pub tags: Vec<Tag>,
    pub communications: Vec<Communication>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallOutcome {
    Reached,
    NotReached,
}

impl_domain_status_conversions!(CallOutcome {
    Reached => "REACHED",
    NotReached => "NOT_REACHED",
});

/// A phone call made by a user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReport {
    pub outcome: CallOutcome,
    #[serde(default)]
    pub notes: Option<String>,
    /// Number dialled; defaults to the lead's phone.
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum CallFollowUp {
    Reached { completed_tasks: u64, reset: CallResetOutcome },
    NotReached(CallAttemptOutcome),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecorded {
    pub communication: Communication,
    pub follow_up: CallFollowUp,
}

/// Lead use cases for the authenticated API
pub struct LeadService {
    store: RecordStore,
    guard: DuplicateGuard,
    tasks: TaskStateMachine,
}

impl LeadService {
    pub fn new(store: RecordStore) -> Self {
        Self {
            guard: DuplicateGuard::new(Arc::clone(&store.leads)),
            tasks: TaskStateMachine::new(Arc::clone(&store.tasks), Arc::clone(&store.tags)),
            store,
        }
    }

    /// Create a lead entered by hand. Rejects duplicates by email/phone.
    #[instrument(skip(self, input))]
    pub async fn create_manual(&self, account_id: Uuid, input: NewLead) -> Result<Lead> {
        let first_name = clean(input.first_name);
        let last_name = clean(input.last_name);
        let full_name = clean(input.name);
        let email = clean(input.email);
        let phone = clean(input.phone);

        if first_name.is_none()
            && last_name.is_none()
            && full_name.is_none()
            && email.is_none()
            && phone.is_none()
        {
            return Err(LeadflowError::InvalidInput(
                "a lead needs a name, an email or a phone number".into(),
            ));
        }

        if let Some(company_id) = input.company_id {
            if self.store.companies.find_company(account_id, company_id).await?.is_none() {
                return Err(LeadflowError::NotFound(format!("company {company_id}")));
            }
        }

        if let Some(existing) =
            self.guard.find_duplicate(account_id, email.as_deref(), phone.as_deref()).await?
        {
            return Err(LeadflowError::Conflict(format!("lead already exists: {}", existing.id)));
        }

        let name = assemble_name(
            first_name.as_deref(),
            last_name.as_deref(),
            full_name.as_deref(),
            email.as_deref(),
        );
        let source = clean(input.source).unwrap_or_else(|| MANUAL_SOURCE.to_string());
        let mut lead =
            Lead::new(account_id, name, input.lead_type.unwrap_or(LeadType::Contact), source);
        lead.first_name = first_name;
        lead.last_name = last_name;
        lead.email = email;
        lead.phone = phone;
        lead.company_id = input.company_id;
        lead.priority = input.priority.unwrap_or_default();
        lead.notes = clean(input.notes);

        self.store.leads.insert_lead(&lead).await?;
        info!(lead_id = %lead.id, "Lead created manually");

        if let Err(err) = self.tasks.on_lead_created(&lead).await {
            warn!(lead_id = %lead.id, error = %err, "Failed to create contact task");
        }
        Ok(lead)
    }

    /// Move a lead to another pipeline status.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> Result<StatusChange> {
        let mut lead = self.require_lead(account_id, lead_id).await?;
        let previous_status = lead.status;
        if previous_status == status {
            return Ok(StatusChange { lead, previous_status, completed_contact_tasks: 0 });
        }

        self.store.leads.update_lead_status(account_id, lead_id, status).await?;
        lead.status = status;

        let completed_contact_tasks =
            match self.tasks.on_status_changed(lead_id, previous_status, status).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(lead_id = %lead_id, error = %err, "Failed to update tasks after status change");
                    0
                }
            };

        Ok(StatusChange { lead, previous_status, completed_contact_tasks })
    }

    pub async fn list(
        &self,
        account_id: Uuid,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> Result<LeadPage> {
        self.store.leads.list_leads(account_id, filter, page.clamped()).await
    }

    pub async fn get(&self, account_id: Uuid, lead_id: Uuid) -> Result<LeadDetails> {
        let lead = self.require_lead(account_id, lead_id).await?;
        let company = match lead.company_id {
            Some(company_id) => self.store.companies.find_company(account_id, company_id).await?,
            None => None,
        };
        Ok(LeadDetails {
            tasks: self.store.tasks.tasks_for_lead(lead.id).await?,
            tags: self.store.tags.tags_for_lead(lead.id).await?,
            communications: self.store.communications.communications_for_lead(lead.id).await?,
            company,
            lead,
        })
    }

    /// Create company, COMPANY lead and an import note in one transaction.
    #[instrument(skip(self, place), fields(place_id = %place.place_id))]
    pub async fn import_place(&self, account_id: Uuid, place: PlaceDetails) -> Result<PlaceImport> {
        let place_id = place.place_id.trim();
        let name = place.name.trim();
        if place_id.is_empty() || name.is_empty() {
            return Err(LeadflowError::InvalidInput("place id and name are required".into()));
        }
        if self.store.companies.find_company_by_place_id(account_id, place_id).await?.is_some() {
            return Err(LeadflowError::Conflict(format!("place already imported: {place_id}")));
        }

        let mut company = Company::new(account_id, place_id, name);
        company.phone = place.phone.clone();
        company.email = place.email.clone();
        company.website = place.website.clone();
        company.address = place.address.clone();
        company.city = place.city.clone();
        company.postal_code = place.postal_code.clone();
        company.country = place.country.clone();
        company.rating = place.rating;
        company.review_count = place.review_count;
        company.refresh_completeness();

        let mut lead = Lead::new(account_id, name, LeadType::Company, PLACES_SOURCE);
        lead.company_id = Some(company.id);
        lead.phone = place.phone.clone();
        lead.email = place.email.clone();

        let note = Communication::new(
            account_id,
            lead.id,
            CommunicationType::Note,
            Direction::Inbound,
            place_summary(&place),
        )
        .with_subject(PLACE_IMPORT_NOTE_SUBJECT)
        .with_metadata(json!({ "placeId": place_id }));

        self.store.leads.create_with_company(&company, &lead, &[note]).await?;
        info!(lead_id = %lead.id, company_id = %company.id, "Place imported");
        Ok(PlaceImport { company, lead })
    }

    /// Log a call and advance the call-attempt state machine.
    #[instrument(skip(self, report), fields(outcome = %report.outcome))]
    pub async fn record_call(
        &self,
        account_id: Uuid,
        lead_id: Uuid,
        report: CallReport,
    ) -> Result<CallRecorded> {
        let lead = self.require_lead(account_id, lead_id).await?;
        let phone = clean(report.phone).or_else(|| lead.phone.clone());
        let content = clean(report.notes).unwrap_or_else(|| match report.outcome {
            CallOutcome::Reached => "Anruf: erreicht".to_string(),
            CallOutcome::NotReached => "Anruf: nicht erreicht".to_string(),
        });

        let communication = Communication::new(
            account_id,
            lead.id,
            CommunicationType::Call,
            Direction::Outbound,
            content,
        )
        .with_status(report.outcome.to_string())
        .with_metadata(json!({ "phone": phone, "outcome": report.outcome }));
        self.store.communications.append_communication(&communication).await?;

        let follow_up = match report.outcome {
            CallOutcome::Reached => {
                let completed_tasks = self.tasks.complete_all_open_tasks(lead.id).await?;
                let reset = self.tasks.on_call_succeeded(&lead).await?;
                CallFollowUp::Reached { completed_tasks, reset }
            }
            CallOutcome::NotReached => {
                CallFollowUp::NotReached(self.tasks.on_call_attempt_failed(&lead).await?)
            }
        };

        Ok(CallRecorded { communication, follow_up })
    }

    async fn require_lead(&self, account_id: Uuid, lead_id: Uuid) -> Result<Lead> {
        self.store
            .leads
            .find_lead(account_id, lead_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("lead {lead_id}")))
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn place_summary(place: &PlaceDetails) -> String {
    let mut lines = vec![format!("Unternehmen: {}", place.name.trim())];
    let location = [place.address.as_deref(), place.postal_code.as_deref(), place.city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    if !location.is_empty() {
        lines.push(format!("Adresse: {location}"));
    }
    if let Some(rating) = place.rating {
        let reviews = place.review_count.unwrap_or(0);
        lines.push(format!("Bewertung: {rating:.1} ({reviews} Rezensionen)"));
    }
    if let Some(website) = &place.website {
        lines.push(format!("Website: {website}"));
    }
    lines.join("\n")
}
