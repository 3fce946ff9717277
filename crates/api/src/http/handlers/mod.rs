pub mod health;
pub mod leads;
pub mod places;
pub mod provisioning;
pub mod webhooks;
