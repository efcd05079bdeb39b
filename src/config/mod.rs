// src/config/mod.rs
pub mod cli;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use lettre::message::Mailbox;

use crate::feed::source::DEFAULT_FEED_URL;
use crate::notify::email::DEFAULT_RESEND_ENDPOINT;
use crate::notify::ntfy::DEFAULT_NTFY_SERVER;

pub const DEFAULT_SEARCH_TERM: &str = "FORELAND";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Email channel settings; only constructed when sender, key and a recipient are all set.
#[derive(Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("api_key", &"<redacted>")
            .field("from", &self.from.to_string())
            .field("to", &self.to.iter().map(|m| m.to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// Built once at startup; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub topic: String,
    /// Upper-cased at construction.
    pub search_term: String,
    pub poll_interval: Duration,
    pub feed_url: String,
    pub ntfy_server: String,
    pub resend_endpoint: String,
    pub email: Option<EmailSettings>,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    pub fn new(topic: impl Into<String>, search_term: &str, poll_interval: Duration) -> Self {
        Self {
            topic: topic.into(),
            search_term: search_term.to_uppercase(),
            poll_interval,
            feed_url: DEFAULT_FEED_URL.to_string(),
            ntfy_server: DEFAULT_NTFY_SERVER.to_string(),
            resend_endpoint: DEFAULT_RESEND_ENDPOINT.to_string(),
            email: None,
            metrics_addr: None,
        }
    }

    /// Enables email only if all three pieces are present; addresses must parse as mailboxes.
    pub fn with_email(
        mut self,
        api_key: Option<String>,
        from: Option<String>,
        to: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        let from = from.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        let to = to.as_deref().map(split_recipients).unwrap_or_default();

        let (Some(api_key), Some(from)) = (api_key, from) else {
            self.email = None;
            return Ok(self);
        };
        if to.is_empty() {
            self.email = None;
            return Ok(self);
        }

        let from: Mailbox = from
            .parse()
            .with_context(|| format!("invalid sender address {from:?}"))?;
        let to = to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .with_context(|| format!("invalid recipient address {addr:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        self.email = Some(EmailSettings { api_key, from, to });
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(anyhow!("ntfy topic must not be empty"));
        }
        if self.search_term.trim().is_empty() {
            return Err(anyhow!("search term must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be at least one second"));
        }
        Ok(())
    }

    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    pub fn ntfy_url(&self) -> String {
        format!("{}/{}", self.ntfy_server.trim_end_matches('/'), self.topic)
    }
}

/// Comma-separated recipients, trimmed, empties dropped.
pub fn split_recipients(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}
