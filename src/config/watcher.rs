//! Configuration file watcher for hot reload.
//!
//! Only breaker settings are reloadable. Admin and observability changes
//! need a restart, so reloads that leave the breaker tables untouched are
//! dropped here instead of churning the registry profiles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{BreakerSettings, GuardConfig};

type BreakerTables = (BreakerSettings, BTreeMap<String, BreakerSettings>);

fn breaker_tables(config: &GuardConfig) -> BreakerTables {
    (config.defaults.clone(), config.breakers.clone())
}

/// Decides whether a freshly loaded config is worth forwarding.
#[derive(Debug, Default)]
pub(crate) struct ReloadFilter {
    last: Option<BreakerTables>,
}

impl ReloadFilter {
    pub(crate) fn seeded(config: &GuardConfig) -> Self {
        Self {
            last: Some(breaker_tables(config)),
        }
    }

    /// True when the breaker tables differ from the last accepted config.
    pub(crate) fn accept(&mut self, config: &GuardConfig) -> bool {
        let tables = breaker_tables(config);
        if self.last.as_ref() == Some(&tables) {
            return false;
        }
        self.last = Some(tables);
        true
    }
}

/// Watches the configuration file and forwards validated breaker changes.
pub struct ConfigWatcher {
    path: PathBuf,
    filter: ReloadFilter,
    update_tx: mpsc::UnboundedSender<GuardConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GuardConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            filter: ReloadFilter::default(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Treat `current` as already applied, so an unchanged rewrite is ignored.
    pub fn with_current(mut self, current: &GuardConfig) -> Self {
        self.filter = ReloadFilter::seeded(current);
        self
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            filter,
            update_tx,
        } = self;
        let filter = Mutex::new(filter);
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = ?e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }

                let config = match load_config(&reload_path) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::error!(error = %e, "Config reload rejected, keeping current profiles");
                        return;
                    }
                };

                let changed = filter
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .accept(&config);
                if changed {
                    tracing::info!(path = ?reload_path, breakers = config.breakers.len(), "Breaker settings reloaded");
                    let _ = update_tx.send(config);
                } else {
                    tracing::debug!(path = ?reload_path, "Config rewritten without breaker changes");
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_filter_skips_unchanged_breaker_tables() {
        let base = parse_config("[breakers.ollama]\npreset = \"local_llm\"\n").unwrap();
        let mut filter = ReloadFilter::seeded(&base);
        assert!(!filter.accept(&base));

        let mut admin_only = base.clone();
        admin_only.admin.request_timeout_secs = 99;
        assert!(!filter.accept(&admin_only));
    }

    #[test]
    fn test_filter_accepts_breaker_changes_once() {
        let base = parse_config("[breakers.ollama]\npreset = \"local_llm\"\n").unwrap();
        let mut filter = ReloadFilter::seeded(&base);

        let tuned = parse_config(
            "[breakers.ollama]\npreset = \"local_llm\"\nfailure_threshold = 7\n",
        )
        .unwrap();
        assert!(filter.accept(&tuned));
        assert!(!filter.accept(&tuned));
        assert!(filter.accept(&base));
    }

    #[test]
    fn test_unseeded_filter_accepts_first_load() {
        let mut filter = ReloadFilter::default();
        assert!(filter.accept(&GuardConfig::default()));
    }
}
