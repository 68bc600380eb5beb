//! Circuit breaker for unreliable dependencies.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: one trial call at a time tests recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: first call after recovery_timeout (becomes the trial)
//! Half-Open → Closed: consecutive_successes >= success_threshold
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Design Decisions
//! - One mutex per breaker; never held while `work` runs
//! - Single trial in Half-Open; concurrent callers are rejected as if Open
//! - Every transition bumps a generation; outcomes of calls admitted under
//!   an older generation only count in metrics
//! - A dropped (cancelled) call counts as neither success nor failure
//! - A panic in `work` counts as a failure and is re-raised, in both call styles

use std::collections::VecDeque;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::time::Instant;

use crate::resilience::config::BreakerConfig;
use crate::resilience::error::BreakerError;
use crate::resilience::metrics::{Metrics, Outcome};
use crate::resilience::status::{BreakerStatus, CircuitState, HealthStatus, StateChange};
use crate::resilience::timeouts::{blocking_with_deadline, with_deadline};

/// Transitions kept for the status endpoint.
const TRANSITION_HISTORY: usize = 32;

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    /// Start of the current Open period.
    opened_at: Option<Instant>,
    /// Start of the outstanding Half-Open trial.
    trial_started: Option<Instant>,
    generation: u64,
    metrics: Metrics,
    transitions: VecDeque<StateChange>,
}

impl Inner {
    fn transition(&mut self, to: CircuitState, reason: impl Into<String>) {
        let from = self.state;
        self.state = to;
        self.generation += 1;
        self.trial_started = None;
        if to == CircuitState::Open {
            self.metrics.record_open();
        }
        if self.transitions.len() == TRANSITION_HISTORY {
            self.transitions.pop_front();
        }
        self.transitions.push_back(StateChange {
            timestamp: Utc::now(),
            from,
            to,
            reason: reason.into(),
        });
    }

    fn begin_trial(&mut self, now: Instant) {
        self.trial_started = Some(now);
    }
}

/// A named circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

/// Ticket for one admitted call. Dropping it unsettled abandons the call.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
    started: Instant,
    settled: bool,
}

impl CallPermit<'_> {
    fn settle(mut self, outcome: Outcome) -> CircuitState {
        self.settled = true;
        let elapsed = self.started.elapsed();
        self.breaker.apply_outcome(self.generation, self.trial, outcome, elapsed)
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abandon(self.generation, self.trial);
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let config = config.normalized();
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                trial_started: None,
                generation: 0,
                metrics: Metrics::new(config.monitoring_window),
                transitions: VecDeque::with_capacity(TRANSITION_HISTORY),
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state as last recorded (an expired Open period is only
    /// turned into Half-Open by the next call).
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute `work` under protection of this breaker.
    ///
    /// Returns the work's value on success. Rejections never invoke `work`.
    /// A panic in `work` is recorded as a failure and re-raised.
    pub async fn call<F, Fut, T, E>(&self, work: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire()?;
        let guarded = async move { with_deadline(self.config.call_timeout, work()).await };
        let outcome = match AssertUnwindSafe(guarded).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                permit.settle(Outcome::Failure);
                resume_unwind(panic)
            }
        };
        match outcome {
            Ok(Ok(value)) => {
                permit.settle(Outcome::Success);
                Ok(value)
            }
            Ok(Err(inner)) => {
                let state = permit.settle(Outcome::Failure);
                Err(BreakerError::Failed {
                    service: self.name.clone(),
                    state,
                    inner,
                })
            }
            Err(_) => {
                permit.settle(Outcome::Timeout);
                Err(self.timeout_error())
            }
        }
    }

    /// Execute synchronous `work` on the blocking pool under this breaker.
    ///
    /// On timeout the closure keeps running on its thread but its result is
    /// discarded. A panic in `work` is recorded as a failure and re-raised.
    pub async fn call_blocking<F, T, E>(&self, work: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let permit = self.acquire()?;
        match blocking_with_deadline(self.config.call_timeout, work).await {
            Ok(Ok(Ok(value))) => {
                permit.settle(Outcome::Success);
                Ok(value)
            }
            Ok(Ok(Err(inner))) => {
                let state = permit.settle(Outcome::Failure);
                Err(BreakerError::Failed {
                    service: self.name.clone(),
                    state,
                    inner,
                })
            }
            Ok(Err(join_err)) if join_err.is_panic() => {
                permit.settle(Outcome::Failure);
                resume_unwind(join_err.into_panic())
            }
            Ok(Err(_)) => {
                drop(permit);
                Err(BreakerError::Interrupted {
                    service: self.name.clone(),
                })
            }
            Err(_) => {
                permit.settle(Outcome::Timeout);
                Err(self.timeout_error())
            }
        }
    }

    fn timeout_error<E>(&self) -> BreakerError<E> {
        BreakerError::Timeout {
            service: self.name.clone(),
            timeout: self.config.call_timeout,
        }
    }

    /// Admission decision. Performs the Open → Half-Open transition.
    fn acquire<E>(&self) -> Result<CallPermit<'_>, BreakerError<E>> {
        let now = Instant::now();
        let mut inner = self.lock();

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.duration_since(at))
                    .unwrap_or(self.config.recovery_timeout);
                if elapsed < self.config.recovery_timeout {
                    inner.metrics.record_rejection();
                    return Err(self.rejection(self.config.recovery_timeout - elapsed));
                }
                inner.transition(CircuitState::HalfOpen, "recovery timeout elapsed");
                inner.consecutive_successes = 0;
                inner.begin_trial(now);
                true
            }
            CircuitState::HalfOpen => {
                if let Some(started) = inner.trial_started {
                    inner.metrics.record_rejection();
                    let waited = now.duration_since(started);
                    return Err(self.rejection(self.config.call_timeout.saturating_sub(waited)));
                }
                inner.begin_trial(now);
                true
            }
        };

        Ok(CallPermit {
            breaker: self,
            generation: inner.generation,
            trial,
            started: now,
            settled: false,
        })
    }

    fn rejection<E>(&self, retry_after: Duration) -> BreakerError<E> {
        BreakerError::Open {
            service: self.name.clone(),
            retry_after,
        }
    }

    /// Apply a classified outcome in one critical section.
    fn apply_outcome(
        &self,
        generation: u64,
        trial: bool,
        outcome: Outcome,
        elapsed: Duration,
    ) -> CircuitState {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.metrics.record(outcome, elapsed, now);

        if generation != inner.generation {
            return inner.state;
        }
        if trial {
            inner.trial_started = None;
        }

        match (inner.state, outcome.is_success()) {
            (CircuitState::Closed, true) => {
                inner.consecutive_failures = 0;
                inner.consecutive_successes = inner.consecutive_successes.saturating_add(1);
            }
            (CircuitState::Closed, false) => {
                inner.consecutive_successes = 0;
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    let reason = format!(
                        "failure threshold reached ({})",
                        inner.consecutive_failures
                    );
                    inner.opened_at = Some(now);
                    inner.transition(CircuitState::Open, reason);
                }
            }
            (CircuitState::HalfOpen, true) => {
                inner.consecutive_failures = 0;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.transition(CircuitState::Closed, "success threshold reached");
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                }
            }
            (CircuitState::HalfOpen, false) => {
                inner.consecutive_successes = 0;
                inner.consecutive_failures += 1;
                inner.opened_at = Some(now);
                inner.transition(CircuitState::Open, "trial call failed");
            }
            (CircuitState::Open, _) => {}
        }
        inner.state
    }

    /// Release a cancelled call without classifying it.
    fn abandon(&self, generation: u64, trial: bool) {
        let mut inner = self.lock();
        if trial && generation == inner.generation {
            inner.trial_started = None;
        }
    }

    /// Operator override: close the circuit and zero every counter.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            inner.transition(CircuitState::Closed, "manual reset");
        } else {
            inner.generation += 1;
            inner.trial_started = None;
        }
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.opened_at = None;
        inner.metrics.reset();
    }

    /// Emergency stop: open the circuit now, restarting the recovery timer.
    pub fn force_open(&self, reason: &str) {
        let mut inner = self.lock();
        inner.opened_at = Some(Instant::now());
        inner.consecutive_successes = 0;
        inner.transition(CircuitState::Open, format!("forced open: {reason}"));
    }

    /// Operator override: allow a trial call immediately.
    pub fn force_half_open(&self) {
        let mut inner = self.lock();
        inner.consecutive_successes = 0;
        inner.transition(CircuitState::HalfOpen, "forced half-open");
    }

    pub fn status(&self) -> BreakerStatus {
        let now = Instant::now();
        let inner = self.lock();
        BreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            trial_in_flight: inner.trial_started.is_some(),
            config: self.config,
            metrics: inner.metrics.snapshot(now),
            health_status: HealthStatus::classify(inner.state, inner.metrics.health_rate(now)),
            recent_transitions: inner.transitions.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn config(failures: u32, recovery_secs: u64, successes: u32) -> BreakerConfig {
        BreakerConfig::default()
            .with_failure_threshold(failures)
            .with_recovery_timeout(Duration::from_secs(recovery_secs))
            .with_success_threshold(successes)
            .with_call_timeout(Duration::from_secs(1))
            .with_monitoring_window(Duration::from_secs(60))
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.call(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<u32, BreakerError<&'static str>> {
        cb.call(|| async { Ok::<_, &'static str>(1) }).await
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let cb = CircuitBreaker::new("svc", BreakerConfig::default());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.status().health_status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_opens_after_failure_threshold() {
        let cb = CircuitBreaker::new("svc", config(3, 30, 2));
        for _ in 0..2 {
            assert!(matches!(fail(&cb).await, Err(BreakerError::Failed { .. })));
            assert_eq!(cb.state(), CircuitState::Closed);
        }
        let err = fail(&cb).await.unwrap_err();
        assert!(matches!(err, BreakerError::Failed { state: CircuitState::Open, .. }));
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.status().metrics.circuit_open_count, 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let cb = CircuitBreaker::new("svc", config(3, 30, 2));
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        succeed(&cb).await.unwrap();

        let status = cb.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.consecutive_successes, 1);
    }

    #[tokio::test]
    async fn test_leading_success_does_not_count() {
        let cb = CircuitBreaker::new("svc", config(2, 30, 2));
        succeed(&cb).await.unwrap();
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_without_invoking_work() {
        let cb = CircuitBreaker::new("svc", config(1, 30, 2));
        fail(&cb).await.unwrap_err();

        let invoked = AtomicU32::new(0);
        let counter = &invoked;
        for _ in 0..5 {
            let err = cb
                .call(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &'static str>(())
                })
                .await
                .unwrap_err();
            assert!(err.is_open());
            assert!(err.retry_after().unwrap() <= Duration::from_secs(30));
        }
        assert_eq!(invoked.load(Ordering::SeqCst), 0);

        let status = cb.status();
        assert_eq!(status.metrics.rejected_requests, 5);
        assert_eq!(status.metrics.total_requests, 1);
        assert_eq!(status.health_status, HealthStatus::Unhealthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_walkthrough() {
        let cb = CircuitBreaker::new("svc", config(3, 2, 2));
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(succeed(&cb).await.unwrap_err().is_open());

        tokio::time::advance(Duration::from_millis(2100)).await;
        assert_eq!(succeed(&cb).await.unwrap(), 1);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.status().health_status, HealthStatus::Recovering);

        succeed(&cb).await.unwrap();
        let status = cb.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.consecutive_successes, 0);

        let path: Vec<_> = status.recent_transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![CircuitState::Open, CircuitState::HalfOpen, CircuitState::Closed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new("svc", config(1, 5, 3));
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(5)).await;

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.status().consecutive_successes, 0);

        // Recovery timer restarted at the failed trial.
        assert!(succeed(&cb).await.unwrap_err().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let cb = CircuitBreaker::new("svc", config(2, 30, 2));
        let slow = || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, &'static str>(())
        };

        assert!(cb.call(slow).await.unwrap_err().is_timeout());
        assert_eq!(cb.status().consecutive_failures, 1);
        assert!(cb.call(slow).await.unwrap_err().is_timeout());
        assert_eq!(cb.state(), CircuitState::Open);

        let metrics = cb.status().metrics;
        assert_eq!(metrics.failed_requests, 2);
        assert_eq!(metrics.timeouts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_in_half_open() {
        let cb = Arc::new(CircuitBreaker::new("svc", config(1, 1, 2)));
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;

        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let trial = {
            let (cb, started, release) = (cb.clone(), started.clone(), release.clone());
            tokio::spawn(async move {
                cb.call(|| async move {
                    started.notify_one();
                    release.notified().await;
                    Ok::<_, &'static str>(())
                })
                .await
            })
        };
        started.notified().await;
        assert!(cb.status().trial_in_flight);

        let invoked = AtomicU32::new(0);
        let counter = &invoked;
        let err = cb
            .call(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(())
            })
            .await
            .unwrap_err();
        assert!(err.is_open());
        assert_eq!(invoked.load(Ordering::SeqCst), 0);

        release.notify_one();
        trial.await.unwrap().unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.status().trial_in_flight);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_trial_releases_slot() {
        let cb = Arc::new(CircuitBreaker::new("svc", config(1, 1, 1)));
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(1)).await;

        let started = Arc::new(Notify::new());
        let task = {
            let (cb, started) = (cb.clone(), started.clone());
            tokio::spawn(async move {
                cb.call(|| async move {
                    started.notify_one();
                    std::future::pending::<Result<(), &'static str>>().await
                })
                .await
            })
        };
        started.notified().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let status = cb.status();
        assert!(!status.trial_in_flight);
        assert_eq!(status.metrics.total_requests, 1);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let cb = CircuitBreaker::new("svc", config(1, 30, 2));
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        let once = cb.status();
        cb.reset();
        let twice = cb.status();

        assert_eq!(once.state, CircuitState::Closed);
        assert_eq!(once.consecutive_failures, 0);
        assert_eq!(once.consecutive_successes, 0);
        assert_eq!(once.metrics.total_requests, 0);
        assert_eq!(once.state, twice.state);
        assert_eq!(once.recent_transitions.len(), twice.recent_transitions.len());
        assert_eq!(once.metrics.total_requests, twice.metrics.total_requests);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_open_and_half_open() {
        let cb = CircuitBreaker::new("svc", config(5, 10, 1));
        cb.force_open("maintenance");
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(succeed(&cb).await.unwrap_err().is_open());

        let status = cb.status();
        assert_eq!(status.recent_transitions[0].reason, "forced open: maintenance");
        assert_eq!(status.metrics.circuit_open_count, 1);

        cb.force_half_open();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_outcome_after_reset_does_not_drive_state() {
        let cb = Arc::new(CircuitBreaker::new("svc", config(1, 30, 1)));
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let task = {
            let (cb, started, release) = (cb.clone(), started.clone(), release.clone());
            tokio::spawn(async move {
                cb.call(|| async move {
                    started.notify_one();
                    release.notified().await;
                    Err::<(), _>("late failure")
                })
                .await
            })
        };
        started.notified().await;
        cb.reset();
        release.notify_one();
        assert!(task.await.unwrap().is_err());

        let status = cb.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.metrics.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_call_blocking() {
        let cb = CircuitBreaker::new("cli", config(2, 30, 1));
        let out = cb
            .call_blocking(|| Ok::<_, String>("stdout".to_string()))
            .await
            .unwrap();
        assert_eq!(out, "stdout");

        let err = cb
            .call_blocking(|| Err::<String, _>("exit status 1".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_inner().as_deref(), Some("exit status 1"));
        assert_eq!(cb.status().metrics.total_requests, 2);
    }

    #[tokio::test]
    async fn test_call_blocking_timeout() {
        let cfg = config(1, 30, 1).with_call_timeout(Duration::from_millis(20));
        let cb = CircuitBreaker::new("cli", cfg);
        let err = cb
            .call_blocking(|| {
                std::thread::sleep(Duration::from_millis(300));
                Ok::<_, String>(())
            })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_call_blocking_panic_counts_as_failure() {
        let cb = Arc::new(CircuitBreaker::new("cli", config(1, 30, 1)));
        let guarded = cb.clone();
        let joined = tokio::spawn(async move {
            guarded
                .call_blocking(|| -> Result<(), String> { panic!("subprocess wrapper crashed") })
                .await
        })
        .await;

        assert!(joined.unwrap_err().is_panic());
        let status = cb.status();
        assert_eq!(status.metrics.failed_requests, 1);
        assert_eq!(status.metrics.total_requests, 1);
        assert_eq!(status.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_async_panic_counts_as_failure() {
        let cb = Arc::new(CircuitBreaker::new("gateway", config(1, 30, 1)));
        let guarded = cb.clone();
        let joined = tokio::spawn(async move {
            guarded
                .call(|| async {
                    if true {
                        panic!("client crashed");
                    }
                    Ok::<(), String>(())
                })
                .await
        })
        .await;

        assert!(joined.unwrap_err().is_panic());
        let status = cb.status();
        assert_eq!(status.metrics.failed_requests, 1);
        assert_eq!(status.metrics.total_requests, 1);
        assert_eq!(status.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_panic_matches_across_call_styles() {
        let cb_async = Arc::new(CircuitBreaker::new("a", config(3, 30, 1)));
        let cb_blocking = Arc::new(CircuitBreaker::new("b", config(3, 30, 1)));

        for _ in 0..2 {
            let guarded = cb_async.clone();
            let joined = tokio::spawn(async move {
                guarded
                    .call(|| async {
                        if true {
                            panic!("boom");
                        }
                        Ok::<(), ()>(())
                    })
                    .await
            })
            .await;
            assert!(joined.unwrap_err().is_panic());

            let guarded = cb_blocking.clone();
            let joined = tokio::spawn(async move {
                guarded
                    .call_blocking(|| -> Result<(), ()> { panic!("boom") })
                    .await
            })
            .await;
            assert!(joined.unwrap_err().is_panic());
        }

        let a = cb_async.status();
        let b = cb_blocking.status();
        assert_eq!(a.state, b.state);
        assert_eq!(a.consecutive_failures, 2);
        assert_eq!(b.consecutive_failures, 2);
        assert_eq!(a.metrics.failed_requests, b.metrics.failed_requests);
    }

    #[tokio::test]
    async fn test_metrics_consistency() {
        let cb = CircuitBreaker::new("svc", config(100, 30, 1));
        for i in 0..10 {
            if i % 4 == 0 {
                fail(&cb).await.unwrap_err();
            } else {
                succeed(&cb).await.unwrap();
            }
        }
        let m = cb.status().metrics;
        assert_eq!(m.total_requests, 10);
        assert_eq!(m.failed_requests, 3);
        assert_eq!(m.successful_requests, 7);
        assert!((m.success_rate - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_degraded_when_success_rate_low() {
        let cb = CircuitBreaker::new("svc", config(100, 30, 1));
        for _ in 0..3 {
            succeed(&cb).await.unwrap();
            fail(&cb).await.unwrap_err();
        }
        let status = cb.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.health_status, HealthStatus::Degraded);
    }
}
