// src/notify/mod.rs
pub mod email;
pub mod message;
pub mod ntfy;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

use crate::config::Config;
use crate::feed::IncidentRecord;
use crate::tracker::NotificationTracker;

pub use email::ResendClient;
pub use message::{EmailMessage, PushMessage};
pub use ntfy::NtfyClient;

/// Per-call bound for every push and email request.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait PushSink: Send + Sync {
    async fn push(&self, msg: &PushMessage) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait EmailSink: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, msg: &EmailMessage) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Result of one channel for one incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Incident already alerted this session.
    Duplicate,
    /// Channel disabled, or gated off by the push result.
    Skipped,
    Failed(String),
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub push: Delivery,
    pub email: Delivery,
}

impl DispatchReport {
    /// A genuinely new alert: push went out for an unseen incident.
    pub fn is_new(&self) -> bool {
        self.push.is_sent()
    }
}

pub struct Notifier {
    push: Box<dyn PushSink>,
    email: Option<Box<dyn EmailSink>>,
    search_term: String,
}

impl Notifier {
    pub fn new(push: Box<dyn PushSink>, search_term: impl Into<String>) -> Self {
        Self {
            push,
            email: None,
            search_term: search_term.into(),
        }
    }

    pub fn with_email(mut self, email: Box<dyn EmailSink>) -> Self {
        self.email = Some(email);
        self
    }

    /// ntfy push always; Resend email only when the config enables it.
    pub fn from_config(cfg: &Config) -> Self {
        let push = NtfyClient::new(&cfg.ntfy_server, &cfg.topic);
        let notifier = Self::new(Box::new(push), cfg.search_term.clone());
        match &cfg.email {
            Some(e) => notifier.with_email(Box::new(
                ResendClient::new(e.api_key.clone(), e.from.clone(), e.to.clone())
                    .with_endpoint(cfg.resend_endpoint.clone()),
            )),
            None => notifier,
        }
    }

    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    /// Dedup-gated push. Marks the tracker only on a confirmed send.
    pub async fn send_push(
        &self,
        rec: &IncidentRecord,
        tracker: &mut NotificationTracker,
    ) -> Delivery {
        if tracker.has_notified(&rec.incident_id) {
            tracing::info!(incident = %rec.incident_id, "skipping duplicate notification");
            counter!("notifications_duplicate_total").increment(1);
            return Delivery::Duplicate;
        }

        let msg = message::push_message(rec, &self.search_term);
        match self.push.push(&msg).await {
            Ok(()) => {
                tracker.mark_notified(&rec.incident_id);
                counter!("notifications_sent_total", "channel" => "push").increment(1);
                tracing::info!(incident = %rec.incident_id, sink = self.push.name(), "notification sent");
                Delivery::Sent
            }
            Err(e) => {
                counter!("notifications_failed_total", "channel" => "push").increment(1);
                tracing::error!(incident = %rec.incident_id, error = %format!("{e:#}"), "push notification failed");
                Delivery::Failed(format!("{e:#}"))
            }
        }
    }

    pub async fn send_email(&self, rec: &IncidentRecord) -> Delivery {
        let Some(email) = &self.email else {
            tracing::debug!("email notifications not configured, skipping email");
            return Delivery::Skipped;
        };

        let msg = message::email_message(rec, &self.search_term);
        match email.send(&msg).await {
            Ok(id) => {
                counter!("notifications_sent_total", "channel" => "email").increment(1);
                tracing::info!(incident = %rec.incident_id, message_id = %id, sink = email.name(), "email notification sent");
                Delivery::Sent
            }
            Err(e) => {
                counter!("notifications_failed_total", "channel" => "email").increment(1);
                tracing::error!(incident = %rec.incident_id, sink = email.name(), error = %format!("{e:#}"), "email notification failed");
                Delivery::Failed(format!("{e:#}"))
            }
        }
    }

    /// Push first; email only follows a push that actually went out.
    pub async fn dispatch(
        &self,
        rec: &IncidentRecord,
        tracker: &mut NotificationTracker,
    ) -> DispatchReport {
        let push = self.send_push(rec, tracker).await;
        let email = if push.is_sent() {
            self.send_email(rec).await
        } else {
            Delivery::Skipped
        };
        DispatchReport { push, email }
    }
}
