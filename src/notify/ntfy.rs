use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::message::PushMessage;
use super::PushSink;

pub const DEFAULT_NTFY_SERVER: &str = "https://ntfy.sh";

/// ntfy topic publisher: plain-text POST to `<server>/<topic>`.
#[derive(Clone)]
pub struct NtfyClient {
    url: String,
    client: Client,
    timeout: Duration,
}

impl NtfyClient {
    pub fn new(server: &str, topic: &str) -> Self {
        Self {
            url: format!("{}/{}", server.trim_end_matches('/'), topic),
            client: Client::new(),
            timeout: super::NOTIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushSink for NtfyClient {
    async fn push(&self, msg: &PushMessage) -> Result<()> {
        tracing::debug!(url = %self.url, body = %msg.body, "posting ntfy message");
        self.client
            .post(&self.url)
            .timeout(self.timeout)
            .header("Title", &msg.title)
            .header("Priority", msg.priority)
            .header("Tags", msg.tags)
            .body(msg.body.clone())
            .send()
            .await
            .context("ntfy post")?
            .error_for_status()
            .context("ntfy non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ntfy"
    }
}
