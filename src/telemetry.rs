use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed fetch attempts.");
        describe_counter!("feed_fetch_errors_total", "Feed fetches that failed (transport or status).");
        describe_counter!("feed_parse_failures_total", "Feed bodies that were not valid markup.");
        describe_counter!("feed_records_total", "Complete call records parsed from the feed.");
        describe_counter!("feed_matches_total", "Records whose location matched the search term.");
        describe_counter!("notifications_sent_total", "Alerts delivered, by channel.");
        describe_counter!("notifications_failed_total", "Alert attempts that failed, by channel.");
        describe_counter!("notifications_duplicate_total", "Alerts suppressed as already sent.");
        describe_gauge!("tracker_incidents", "Incidents notified during this session.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("poll_cycle_ms", "Full poll cycle time in milliseconds.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener. Needs a tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: listen on {addr}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
