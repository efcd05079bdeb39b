use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use super::{Config, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SEARCH_TERM};
use crate::feed::source::DEFAULT_FEED_URL;
use crate::notify::email::DEFAULT_RESEND_ENDPOINT;
use crate::notify::ntfy::DEFAULT_NTFY_SERVER;

/// Monitor Orlando PD active calls for specific locations
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Examples:\n  active-calls-monitor --topic my-alerts\n  active-calls-monitor --topic police-watch --search FORELAND --interval 60"
)]
pub struct Args {
    /// ntfy topic name to send notifications to
    #[arg(long, env = "NTFY_TOPIC")]
    pub topic: String,

    /// Search term for call locations (case-insensitive)
    #[arg(long, env = "SEARCH_TERM", default_value = DEFAULT_SEARCH_TERM)]
    pub search: String,

    /// Polling interval in seconds
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = DEFAULT_POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Resend API key for email notifications
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    /// Email address(es) to notify, comma-separated
    #[arg(long, env = "EMAIL_TO")]
    pub email_to: Option<String>,

    /// Sender address for email notifications
    #[arg(long, env = "EMAIL_FROM")]
    pub email_from: Option<String>,

    /// Active-calls XML feed
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// ntfy server base URL
    #[arg(long, env = "NTFY_SERVER", default_value = DEFAULT_NTFY_SERVER)]
    pub ntfy_server: String,

    /// Resend send-email endpoint
    #[arg(long, env = "RESEND_ENDPOINT", default_value = DEFAULT_RESEND_ENDPOINT)]
    pub resend_endpoint: String,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9184)
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let mut cfg = Config::new(self.topic, &self.search, Duration::from_secs(self.interval))
            .with_email(self.resend_api_key, self.email_from, self.email_to)?;
        cfg.feed_url = self.feed_url;
        cfg.ntfy_server = self.ntfy_server;
        cfg.resend_endpoint = self.resend_endpoint;
        cfg.metrics_addr = self.metrics_addr;
        cfg.validate()?;
        Ok(cfg)
    }
}
