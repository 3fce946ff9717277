//! Domain types and models
//!
//! Every entity is tenant-scoped through `account_id`. Timestamps are UTC;
//! identifiers are UUID v7 so that insertion order and id order agree.

pub mod account;
pub mod communication;
pub mod company;
pub mod lead;
pub mod notification;
pub mod tag;
pub mod task;
pub mod webhook;

pub use account::{Account, EmailSettings};
pub use communication::{Communication, CommunicationType, Direction};
pub use company::Company;
pub use lead::{Lead, LeadFilter, LeadPage, LeadPriority, LeadStatus, LeadType, PageRequest, UtmAttribution};
pub use notification::{NotificationJob, NotificationKind, NotificationRequest, OutboundEmail};
pub use tag::Tag;
pub use task::{Task, TaskKind, TaskStatus};
pub use webhook::{Webhook, WebhookLog, WebhookSettings};
