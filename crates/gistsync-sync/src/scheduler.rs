use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::engine::Reconciler;

/// Runs a reconciliation at startup, then every `interval`, until shut down.
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
}

impl Scheduler {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Loop until `shutdown` flips to `true` or its sender goes away.
    ///
    /// Cycles never overlap: a cycle that outlasts the interval delays the
    /// next tick instead of queueing another one. A shutdown arriving
    /// mid-cycle abandons that cycle.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "starting sync daemon");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut first = true;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                result = self.reconciler.run_once() => {
                    if let Err(e) = result {
                        if first {
                            tracing::error!(error = %e, "initial sync failed");
                        } else {
                            tracing::error!(error = %e, "scheduled sync failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    tracing::warn!("shutdown requested, abandoning in-flight sync");
                    break;
                }
            }
            first = false;
        }

        tracing::info!("sync daemon stopped");
    }
}
