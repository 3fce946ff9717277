//! Auto-reply and owner notification emails

pub mod planner;
pub mod ports;
pub mod processor;

pub use planner::{compose, plan, render_template, TemplateVars};
pub use processor::{DeliveryReport, NotificationProcessor, RetryPolicy};
