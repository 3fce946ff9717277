//! Identity heuristics for inbound leads and companies

use std::sync::Arc;

use chrono::Utc;
use leadflow_domain::constants::SYNTHETIC_PLACE_ID_PREFIX;
use leadflow_domain::{Lead, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::leads::ports::LeadRepository;

/// Best-effort duplicate detection for leads.
///
/// Email is the primary identity: when an email is given the phone number is
/// ignored, even if it would match a different lead. Without either, no
/// check is made. The lookup is not transactional with the later insert.
#[derive(Clone)]
pub struct DuplicateGuard {
    leads: Arc<dyn LeadRepository>,
}

impl DuplicateGuard {
    pub fn new(leads: Arc<dyn LeadRepository>) -> Self {
        Self { leads }
    }

    pub async fn find_duplicate(
        &self,
        account_id: Uuid,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Lead>> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());

        match (email, phone) {
            (Some(email), _) => self.leads.find_lead_by_email(account_id, email).await,
            (None, Some(phone)) => self.leads.find_lead_by_phone(account_id, phone).await,
            (None, None) => Ok(None),
        }
    }
}

/// Key used to upsert the company of an inbound lead.
///
/// Payloads without a place id get a unique synthetic key so that unrelated
/// webhook leads never collide on the company uniqueness constraint.
pub fn company_key(place_id: Option<&str>) -> String {
    match place_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => synthesize_place_id(),
    }
}

fn synthesize_place_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();
    format!("{SYNTHETIC_PLACE_ID_PREFIX}{}-{suffix}", Utc::now().timestamp_millis())
}
