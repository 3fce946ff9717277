//! Inbound webhook lead ingestion

pub mod duplicate_guard;
pub mod errors;
pub mod field_mapper;
pub mod payload;
pub mod pipeline;
pub mod ports;

pub use duplicate_guard::DuplicateGuard;
pub use errors::IngestError;
pub use field_mapper::{CanonicalField, FieldMapper, Payload};
pub use payload::PayloadError;
pub use pipeline::{DeliveryHeaders, InboundDelivery, IngestionPipeline, IngestionReceipt};
