//! Lead use cases outside the webhook path

pub mod ports;
pub mod service;

pub use service::{
    CallFollowUp, CallOutcome, CallRecorded, CallReport, LeadDetails, LeadService, NewLead,
    PlaceDetails, PlaceImport, StatusChange,
};
