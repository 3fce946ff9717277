//! Lead tags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label unique per (`account_id`, `name`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(account_id: Uuid, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            name: name.into(),
            color: color.into(),
            created_at: Utc::now(),
        }
    }
}
