// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod feed;
pub mod matcher;
pub mod notify;
pub mod poller;
pub mod telemetry;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::feed::IncidentRecord;
pub use crate::matcher::LocationMatcher;
pub use crate::notify::{Delivery, DispatchReport, Notifier};
pub use crate::poller::{PollError, PollLoop, RetryPolicy};
pub use crate::tracker::NotificationTracker;
