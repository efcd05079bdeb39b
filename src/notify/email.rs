use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::message::EmailMessage;
use super::EmailSink;

pub const DEFAULT_RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: String,
    to: Vec<String>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Transactional email over the Resend HTTP API.
pub struct ResendClient {
    endpoint: String,
    api_key: String,
    from: Mailbox,
    to: Vec<Mailbox>,
    client: Client,
    timeout: Duration,
}

impl ResendClient {
    pub fn new(api_key: String, from: Mailbox, to: Vec<Mailbox>) -> Self {
        Self {
            endpoint: DEFAULT_RESEND_ENDPOINT.to_string(),
            api_key,
            from,
            to,
            client: Client::new(),
            timeout: super::NOTIFY_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl EmailSink for ResendClient {
    async fn send(&self, msg: &EmailMessage) -> Result<String> {
        let to: Vec<String> = self.to.iter().map(|m| m.to_string()).collect();
        tracing::debug!(to = %to.join(", "), "sending email");

        let body = SendEmailRequest {
            from: self.from.to_string(),
            to,
            subject: &msg.subject,
            html: &msg.html,
            text: &msg.text,
        };

        let resp: SendEmailResponse = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("resend post")?
            .error_for_status()
            .context("resend non-2xx")?
            .json()
            .await
            .context("resend response body")?;
        Ok(resp.id)
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
