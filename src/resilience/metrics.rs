//! Rolling counters for one breaker.
//!
//! Lifetime counters only ever grow (until a reset). Health classification
//! uses the bucketed window instead, so a long history of successes cannot
//! mask a recent burst of failures.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::resilience::status::MetricsSnapshot;

/// Number of buckets the monitoring window is split into.
const WINDOW_BUCKETS: u32 = 30;

/// Classified result of one executed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    start: Instant,
    successes: u64,
    failures: u64,
}

/// Success/failure counts over the most recent `span`.
#[derive(Debug, Clone)]
pub(crate) struct RollingWindow {
    span: Duration,
    bucket_width: Duration,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    pub(crate) fn new(span: Duration) -> Self {
        let bucket_width = (span / WINDOW_BUCKETS).max(Duration::from_millis(1));
        Self {
            span,
            bucket_width,
            buckets: VecDeque::with_capacity(WINDOW_BUCKETS as usize + 1),
        }
    }

    pub(crate) fn record(&mut self, success: bool, now: Instant) {
        self.prune(now);
        let fresh = match self.buckets.back() {
            Some(b) => now.duration_since(b.start) >= self.bucket_width,
            None => true,
        };
        if fresh {
            self.buckets.push_back(Bucket { start: now, successes: 0, failures: 0 });
        }
        if let Some(bucket) = self.buckets.back_mut() {
            if success {
                bucket.successes += 1;
            } else {
                bucket.failures += 1;
            }
        }
    }

    /// Returns `(successes, failures)` still inside the window.
    pub(crate) fn counts(&self, now: Instant) -> (u64, u64) {
        self.buckets
            .iter()
            .filter(|b| now.duration_since(b.start) < self.span)
            .fold((0, 0), |(s, f), b| (s + b.successes, f + b.failures))
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.start) >= self.span {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Mutable metrics owned by a breaker. Always accessed under the breaker lock.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rejected_requests: u64,
    pub timeouts: u64,
    pub circuit_open_count: u64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    average_response_ms: f64,
    window: RollingWindow,
}

impl Metrics {
    pub fn new(monitoring_window: Duration) -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            rejected_requests: 0,
            timeouts: 0,
            circuit_open_count: 0,
            last_failure_time: None,
            last_success_time: None,
            average_response_ms: 0.0,
            window: RollingWindow::new(monitoring_window),
        }
    }

    /// Account for an executed call.
    pub fn record(&mut self, outcome: Outcome, elapsed: Duration, now: Instant) {
        self.total_requests += 1;
        match outcome {
            Outcome::Success => {
                self.successful_requests += 1;
                self.last_success_time = Some(Utc::now());
            }
            Outcome::Failure | Outcome::Timeout => {
                self.failed_requests += 1;
                if outcome == Outcome::Timeout {
                    self.timeouts += 1;
                }
                self.last_failure_time = Some(Utc::now());
            }
        }

        let sample = elapsed.as_secs_f64() * 1000.0;
        self.average_response_ms += (sample - self.average_response_ms) / self.total_requests as f64;

        self.window.record(outcome.is_success(), now);
    }

    pub fn record_rejection(&mut self) {
        self.rejected_requests += 1;
    }

    pub fn record_open(&mut self) {
        self.circuit_open_count += 1;
    }

    /// Lifetime success rate; 1.0 when nothing has executed yet.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    /// Success rate inside the monitoring window, if the window holds data.
    pub fn window_success_rate(&self, now: Instant) -> Option<f64> {
        let (successes, failures) = self.window.counts(now);
        let total = successes + failures;
        (total > 0).then(|| successes as f64 / total as f64)
    }

    /// Rate used for health: windowed when available, lifetime otherwise.
    pub fn health_rate(&self, now: Instant) -> f64 {
        self.window_success_rate(now).unwrap_or_else(|| self.success_rate())
    }

    pub fn reset(&mut self) {
        let span = self.window.span;
        *self = Self::new(span);
    }

    pub fn snapshot(&self, now: Instant) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            rejected_requests: self.rejected_requests,
            timeouts: self.timeouts,
            circuit_open_count: self.circuit_open_count,
            success_rate: self.success_rate(),
            window_success_rate: self.window_success_rate(now),
            average_response_time_ms: self.average_response_ms,
            last_failure_time: self.last_failure_time,
            last_success_time: self.last_success_time,
        }
    }
}
