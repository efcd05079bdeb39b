//! Active Calls Monitor — Binary Entrypoint
//! Parses the CLI, wires the poll loop, and maps shutdown to an exit code.

use std::process::ExitCode;

use active_calls_monitor::config::cli::Args;
use active_calls_monitor::config::Config;
use active_calls_monitor::poller::PollLoop;
use active_calls_monitor::telemetry;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset: `--verbose` lifts only this crate to `debug`.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,active_calls_monitor=debug"
    } else {
        "info"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn log_startup(cfg: &Config) {
    info!(
        topic = %cfg.topic,
        search = %cfg.search_term,
        interval_secs = cfg.poll_interval.as_secs(),
        "active calls monitor starting"
    );
    match &cfg.email {
        Some(e) => {
            let to: Vec<String> = e.to.iter().map(|m| m.to_string()).collect();
            info!(from = %e.from, to = %to.join(", "), "email notifications enabled");
        }
        None => info!("email notifications disabled (missing configuration)"),
    }
    info!(feed = %cfg.feed_url, ntfy = %cfg.ntfy_url(), "endpoints");
}

/// Resolves on Ctrl+C (or SIGTERM on unix). A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.verbose);

    let cfg = match args.into_config() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    log_startup(&cfg);

    match cfg.metrics_addr {
        Some(addr) => {
            if let Err(e) = telemetry::install_prometheus(addr) {
                warn!("metrics exporter disabled: {e:#}");
            }
        }
        None => telemetry::ensure_metrics_described(),
    }

    let mut poller = match PollLoop::from_config(&cfg) {
        Ok(p) => p,
        Err(e) => {
            error!("fatal error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    info!("notification tracker initialized; press Ctrl+C to stop monitoring");

    let outcome = tokio::select! {
        r = poller.run() => Some(r),
        _ = shutdown_signal() => None,
    };

    let total = poller.tracker().count();
    match outcome {
        None => {
            info!("monitor stopped by user");
            info!(total, "final summary: notifications sent during this session");
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            error!("fatal error: {e}");
            info!(total, "final summary: notifications sent before error");
            ExitCode::FAILURE
        }
        Some(Ok(())) => ExitCode::SUCCESS,
    }
}
