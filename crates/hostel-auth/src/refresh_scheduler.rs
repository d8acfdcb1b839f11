//! Periodic background token refresh.

use crate::session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Spawns a task that calls [`SessionManager::refresh`] every `period`.
pub struct RefreshScheduler;

impl RefreshScheduler {
    /// The first refresh happens one full period after spawning.
    pub fn spawn(manager: Arc<SessionManager>, period: Duration) -> RefreshSchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "Refresh scheduler started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Refresh scheduler received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !manager.is_logged_in() {
                            debug!("No session, skipping scheduled refresh");
                            continue;
                        }
                        if let Err(e) = manager.refresh().await {
                            warn!(error = %e, "Scheduled token refresh failed");
                        }
                    }
                }
            }

            debug!("Refresh scheduler task stopped");
        });

        RefreshSchedulerHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Owns the scheduler task. Dropping it aborts the task.
pub struct RefreshSchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshSchedulerHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                warn!(error = %e, "Refresh scheduler task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshSchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
