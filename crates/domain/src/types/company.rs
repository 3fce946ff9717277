//! Companies a lead may belong to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business entity, unique per (`account_id`, `external_place_id`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Google place id, or a synthesized `webhook-…` key for companies that
    /// arrived without one.
    pub external_place_id: String,
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
    pub has_website: bool,
    pub has_phone: bool,
    pub has_email: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(
        account_id: Uuid,
        external_place_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            account_id,
            external_place_id: external_place_id.into(),
            name: name.into(),
            phone: None,
            email: None,
            website: None,
            address: None,
            city: None,
            postal_code: None,
            country: None,
            rating: None,
            review_count: None,
            has_website: false,
            has_phone: false,
            has_email: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the profile-completeness flags from the contact fields.
    pub fn refresh_completeness(&mut self) {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        self.has_website = present(&self.website);
        self.has_phone = present(&self.phone);
        self.has_email = present(&self.email);
    }
}
