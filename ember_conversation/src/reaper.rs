//! Background eviction of idle sessions.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::store::SessionStore;

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often to sweep the cache.
    pub interval: Duration,
    /// Sessions idle longer than this are evicted.
    pub idle_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            idle_threshold: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Periodic sweep over the session cache. Cache-only: persisted history
/// survives eviction and reloads on the next contact.
pub struct SessionReaper {
    store: Arc<SessionStore>,
    config: ReaperConfig,
}

impl SessionReaper {
    #[must_use]
    pub const fn new(store: Arc<SessionStore>, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// Start the sweep loop. The returned handle stops it deterministically,
    /// so shutdown and tests never leave a detached loop behind.
    #[must_use]
    pub fn spawn(self) -> ReaperHandle {
        let (tx, mut rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                "Session reaper running: sweep every {:?}, idle threshold {:?}",
                self.config.interval, self.config.idle_threshold
            );

            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the first sweep should
            // happen one full interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.store.evict_idle(self.config.idle_threshold).await;
                        if evicted > 0 {
                            info!("Reaped {evicted} idle session(s)");
                        } else {
                            debug!("Reaper sweep: nothing to evict");
                        }
                    }
                    _ = rx.changed() => {
                        info!("Session reaper stopping");
                        break;
                    }
                }
            }
        });

        ReaperHandle { shutdown: tx, task }
    }
}

/// Owning handle for a running reaper.
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
