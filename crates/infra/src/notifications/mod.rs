//! Notification delivery: bounded queue, background worker, email adapters

pub mod email;
pub mod queue;
pub mod worker;

pub use email::{HttpEmailSender, LogEmailSender};
pub use queue::{NotificationQueue, NotificationReceiver};
pub use worker::{NotificationWorker, NotificationWorkerConfig};
