//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// System-managed tag applied once the call attempts are exhausted
pub const UNREACHABLE_TAG_NAME: &str = "Nicht erreichbar";
pub const UNREACHABLE_TAG_COLOR: &str = "#EF4444";
pub const DEFAULT_TAG_COLOR: &str = "#6B7280";

// Call-attempt state machine
pub const MAX_CALL_ATTEMPTS: u32 = 3;

// Task titles. Legacy rows carry no kind column and are classified by these
// tokens (case-insensitive substring of the title).
pub const CONTACT_TASK_TOKEN: &str = "kontaktieren";
pub const CALL_TASK_TOKEN: &str = "anrufen";
pub const CONTACT_TASK_TITLE: &str = "Lead kontaktieren";
pub const CALL_TASK_TITLE: &str = "Lead anrufen";

// Lead naming
pub const UNKNOWN_LEAD_NAME: &str = "Unbekannt";

// Webhook ingestion
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";
pub const WEBHOOK_LOG_PROCESSING: &str = "Processing...";
pub const SYNTHETIC_PLACE_ID_PREFIX: &str = "webhook-";
pub const COMPLIANCE_ACKNOWLEDGMENT: &str = "Der Absender hat der Verarbeitung seiner Angaben \
                                             zur Bearbeitung der Anfrage zugestimmt (Art. 6 \
                                             Abs. 1 lit. b DSGVO).";

// Google Places import
pub const PLACE_IMPORT_NOTE_SUBJECT: &str = "Importiert aus Google Places";

// Listing
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
