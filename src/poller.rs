// src/poller.rs
use std::fmt;
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, gauge, histogram};

use crate::config::Config;
use crate::feed::source::{FeedSource, FetchError, HttpFeedSource};
use crate::feed::{self, ParsedFeed};
use crate::matcher::LocationMatcher;
use crate::notify::{Delivery, Notifier};
use crate::tracker::NotificationTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => f.write_str("network"),
            FailureKind::Unexpected => f.write_str("unexpected"),
        }
    }
}

/// Backoff after consecutive failed cycles. Both failure kinds share one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_consecutive_errors: u32,
    pub base: Duration,
    pub cap: Duration,
    pub unexpected: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
            base: Duration::from_secs(30),
            cap: Duration::from_secs(300),
            unexpected: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `consecutive` is the counter value after the failure was recorded (1-based).
    pub fn delay_for(&self, kind: FailureKind, consecutive: u32) -> Duration {
        match kind {
            FailureKind::Network => {
                let exp = consecutive.saturating_sub(1).min(31);
                self.base.saturating_mul(1u32 << exp).min(self.cap)
            }
            FailureKind::Unexpected => self.unexpected,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("too many consecutive errors ({attempts}), last {kind} error: {last}")]
    RetriesExhausted {
        attempts: u32,
        kind: FailureKind,
        last: String,
    },
}

/// Counters for one fetch→parse→filter→notify pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub records: usize,
    pub skipped: usize,
    pub matched: usize,
    pub sent: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Feed body was not a readable `<CALLS>` document.
    pub malformed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed(CycleReport),
    BackedOff { kind: FailureKind, delay: Duration },
}

pub struct PollLoop {
    source: Box<dyn FeedSource>,
    notifier: Notifier,
    matcher: LocationMatcher,
    tracker: NotificationTracker,
    interval: Duration,
    policy: RetryPolicy,
    consecutive_errors: u32,
    cycles: u64,
}

impl PollLoop {
    pub fn new(
        source: Box<dyn FeedSource>,
        notifier: Notifier,
        search_term: &str,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            notifier,
            matcher: LocationMatcher::new(search_term),
            tracker: NotificationTracker::new(),
            interval,
            policy: RetryPolicy::default(),
            consecutive_errors: 0,
            cycles: 0,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let source = HttpFeedSource::new(cfg.feed_url.clone())?;
        Ok(Self::new(
            Box::new(source),
            Notifier::from_config(cfg),
            &cfg.search_term,
            cfg.poll_interval,
        ))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tracker(&self) -> &NotificationTracker {
        &self.tracker
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// One pass without any sleeping. Only fetch failures surface as errors.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, FetchError> {
        let t0 = std::time::Instant::now();
        let raw = self.source.fetch().await?;

        let mut report = CycleReport::default();
        let parsed = match feed::try_parse_bytes(&raw) {
            Ok(p) => p,
            Err(e) => {
                // Content problem, not a liveness one: no error count, no backoff.
                tracing::warn!(error = %e, source = self.source.name(), "feed could not be parsed; treating as zero records");
                counter!("feed_parse_failures_total").increment(1);
                report.malformed = true;
                ParsedFeed::default()
            }
        };
        report.records = parsed.records.len();
        report.skipped = parsed.skipped;
        tracing::info!(records = report.records, "retrieved active calls");

        let matches = self.matcher.filter(&parsed.records);
        report.matched = matches.len();
        counter!("feed_matches_total").increment(matches.len() as u64);

        if matches.is_empty() {
            tracing::debug!(term = %self.matcher.term(), "no calls found containing term");
        } else {
            tracing::info!(count = matches.len(), term = %self.matcher.term(), "match found");
            for rec in matches {
                let r = self.notifier.dispatch(rec, &mut self.tracker).await;
                match r.push {
                    Delivery::Sent => report.sent += 1,
                    Delivery::Duplicate => report.duplicates += 1,
                    Delivery::Failed(_) => report.failed += 1,
                    Delivery::Skipped => {}
                }
            }
            tracing::info!(
                sent = report.sent,
                duplicates = report.duplicates,
                failed = report.failed,
                tracked = self.tracker.count(),
                "notification summary"
            );
        }

        gauge!("tracker_incidents").set(self.tracker.count() as f64);
        histogram!("poll_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(report)
    }

    /// One cycle plus the sleep that follows it (interval or backoff).
    pub async fn step(&mut self) -> Result<StepOutcome, PollError> {
        self.cycles += 1;
        tracing::debug!(cycle = self.cycles, "monitoring loop");

        match self.run_cycle().await {
            Ok(report) => {
                self.consecutive_errors = 0;
                if report.sent > 0 {
                    tracing::info!(sent = report.sent, "sent new notifications");
                }
                tracing::debug!(secs = self.interval.as_secs(), "sleeping until next poll");
                tokio::time::sleep(self.interval).await;
                Ok(StepOutcome::Completed(report))
            }
            Err(e) => {
                let kind = if e.is_transport() {
                    FailureKind::Network
                } else {
                    FailureKind::Unexpected
                };
                self.consecutive_errors += 1;
                tracing::error!(attempt = self.consecutive_errors, %kind, error = %e, "poll cycle failed");

                if self.consecutive_errors >= self.policy.max_consecutive_errors {
                    tracing::error!(attempts = self.consecutive_errors, "too many consecutive errors, stopping monitor");
                    return Err(PollError::RetriesExhausted {
                        attempts: self.consecutive_errors,
                        kind,
                        last: e.to_string(),
                    });
                }

                let delay = self.policy.delay_for(kind, self.consecutive_errors);
                tracing::info!(secs = delay.as_secs(), "waiting before retry");
                tokio::time::sleep(delay).await;
                Ok(StepOutcome::BackedOff { kind, delay })
            }
        }
    }

    /// Runs until the retry threshold is exhausted; only ever returns an error.
    pub async fn run(&mut self) -> Result<(), PollError> {
        tracing::info!(
            term = %self.matcher.term(),
            secs = self.interval.as_secs(),
            "starting continuous monitoring"
        );
        loop {
            self.step().await?;
        }
    }
}
