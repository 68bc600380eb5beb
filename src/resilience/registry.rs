//! Named breaker registry.
//!
//! # Responsibilities
//! - Map service name → breaker, creating breakers on first use
//! - Resolve per-service configuration profiles
//! - Bulk status and reset for dashboards and operators
//!
//! # Design Decisions
//! - One registry per process, owned by the composition root and shared via `Arc`
//! - Sharded map: creating a breaker never blocks lookups of other names
//! - Creation is an atomic entry insert, so one name maps to exactly one breaker
//! - Profiles are swapped atomically on reload; existing breakers keep their config

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use dashmap::DashMap;

use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::config::BreakerConfig;
use crate::resilience::error::{BreakerError, RegistryError};
use crate::resilience::status::{BreakerStatus, RegistryStatus, StatusSummary};

/// Configuration used for breakers created by name alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakerProfiles {
    default: BreakerConfig,
    named: HashMap<String, BreakerConfig>,
}

impl BreakerProfiles {
    pub fn new(default: BreakerConfig) -> Self {
        Self {
            default,
            named: HashMap::new(),
        }
    }

    pub fn with_profile(mut self, name: impl Into<String>, config: BreakerConfig) -> Self {
        self.named.insert(name.into(), config);
        self
    }

    /// Profile for `name`, falling back to the default.
    pub fn resolve(&self, name: &str) -> BreakerConfig {
        self.named.get(name).copied().unwrap_or(self.default)
    }

    /// Names with an explicit profile.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

/// Process-wide set of circuit breakers keyed by service name.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    profiles: ArcSwap<BreakerProfiles>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: BreakerProfiles) -> Self {
        Self {
            breakers: DashMap::new(),
            profiles: ArcSwap::from_pointee(profiles),
        }
    }

    /// Return the breaker for `name`, creating it with `config` if absent.
    ///
    /// `config` is ignored when the breaker already exists.
    pub fn get_or_create(&self, name: &str, config: BreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.value().clone();
        }

        let mut created = false;
        let breaker = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(CircuitBreaker::new(name, config))
            })
            .value()
            .clone();

        if created {
            tracing::info!(
                service = %name,
                failure_threshold = config.failure_threshold,
                recovery_timeout_secs = config.recovery_timeout.as_secs_f64(),
                call_timeout_secs = config.call_timeout.as_secs_f64(),
                "Created circuit breaker"
            );
        }
        breaker
    }

    /// Return the breaker for `name`, creating it from the configured profiles.
    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.value().clone();
        }
        let config = self.profiles.load().resolve(name);
        self.get_or_create(name, config)
    }

    /// Lookup without creation.
    pub fn get_breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Run `work` through the breaker named `name`.
    pub async fn call<F, Fut, T, E>(&self, name: &str, work: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.breaker(name).call(work).await
    }

    fn existing(&self, name: &str) -> Result<Arc<CircuitBreaker>, RegistryError> {
        self.get_breaker(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn reset(&self, name: &str) -> Result<BreakerStatus, RegistryError> {
        let breaker = self.existing(name)?;
        breaker.reset();
        tracing::info!(service = %name, "Circuit breaker manually reset");
        Ok(breaker.status())
    }

    pub fn force_open(&self, name: &str, reason: &str) -> Result<BreakerStatus, RegistryError> {
        let breaker = self.existing(name)?;
        breaker.force_open(reason);
        tracing::warn!(service = %name, reason = %reason, "Circuit breaker forced open");
        Ok(breaker.status())
    }

    pub fn force_half_open(&self, name: &str) -> Result<BreakerStatus, RegistryError> {
        let breaker = self.existing(name)?;
        breaker.force_half_open();
        tracing::warn!(service = %name, "Circuit breaker forced half-open");
        Ok(breaker.status())
    }

    /// Reset every breaker. Returns how many were reset.
    pub fn reset_all(&self) -> usize {
        let breakers = self.snapshot_breakers();
        for breaker in &breakers {
            breaker.reset();
        }
        tracing::warn!(count = breakers.len(), "All circuit breakers reset");
        breakers.len()
    }

    pub fn get_all_status(&self) -> RegistryStatus {
        let circuit_breakers: BTreeMap<String, BreakerStatus> = self
            .snapshot_breakers()
            .iter()
            .map(|breaker| (breaker.name().to_string(), breaker.status()))
            .collect();
        let summary = StatusSummary::from_statuses(circuit_breakers.values());

        RegistryStatus {
            circuit_breakers,
            summary,
            timestamp: Utc::now(),
        }
    }

    /// Clone the breaker handles so no map shard stays locked while they are inspected.
    fn snapshot_breakers(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    pub fn profiles(&self) -> Arc<BreakerProfiles> {
        self.profiles.load_full()
    }

    /// Replace the profiles used for breakers created from now on.
    pub fn update_profiles(&self, profiles: BreakerProfiles) {
        self.profiles.store(Arc::new(profiles));
        tracing::info!("Circuit breaker profiles updated");
    }

    /// Create a breaker for every named profile so it is visible before first use.
    pub fn preload(&self) -> usize {
        let profiles = self.profiles.load_full();
        let mut count = 0;
        for name in profiles.names() {
            self.get_or_create(name, profiles.resolve(name));
            count += 1;
        }
        count
    }
}
