//! # Leadflow Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the record store, email delivery
//!   and notification dispatch
//! - The webhook ingestion pipeline (field mapping, duplicate guard)
//! - The contact/call task state machine
//! - Lead use cases and notification planning
//!
//! ## Architecture Principles
//! - Only depends on `leadflow-domain`
//! - No database, HTTP server, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod accounts;
pub mod ingestion;
pub mod leads;
pub mod notifications;
pub mod store;
pub mod tasks;

// Re-export specific items to avoid ambiguity
pub use accounts::AccountService;
pub use ingestion::ports::WebhookRepository;
pub use ingestion::{
    DeliveryHeaders, DuplicateGuard, FieldMapper, InboundDelivery, IngestError, IngestionPipeline,
    IngestionReceipt,
};
pub use leads::ports::{
    AccountRepository, CommunicationRepository, CompanyNameUpdate, CompanyRepository,
    LeadRepository, TagRepository,
};
pub use leads::LeadService;
pub use notifications::ports::{EmailSender, NotificationDispatcher, SubmitError};
pub use notifications::{NotificationProcessor, RetryPolicy};
pub use store::RecordStore;
pub use tasks::ports::{CallTaskAdvance, OpenTaskInsert, TaskRepository};
pub use tasks::TaskStateMachine;
