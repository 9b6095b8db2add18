//! Expiration sweeper.
//!
//! Each cycle expires active carts whose time-to-live has elapsed, then
//! purges expired and closed carts past the retention cutoff. Expiring
//! always happens before purging, so a cart is never deleted while it is
//! still active.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use thiserror::Error;
use tokio::{
    sync::watch,
    task::{JoinError, JoinHandle},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::{
    clock::Clock,
    domain::carts::{
        records::{CartStatus, CartUuid},
        repositories::{CartsRepository, StoreError},
    },
    settings::SweeperSettings,
};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

const PURGEABLE: [CartStatus; 2] = [CartStatus::Expired, CartStatus::Closed];

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("storage error during sweep")]
    Store(#[from] StoreError),

    #[error("sweep cutoff out of range")]
    Cutoff(#[source] jiff::Error),

    #[error("sweeper task failed")]
    Join(#[from] JoinError),
}

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Active carts moved to expired.
    pub expired: u64,

    /// Expired or closed carts deleted.
    pub purged: u64,
}

impl SweepReport {
    pub fn is_noop(&self) -> bool {
        self.expired == 0 && self.purged == 0
    }
}

pub struct ExpirationSweeper {
    repository: Arc<dyn CartsRepository>,
    clock: Arc<dyn Clock>,
    settings: SweeperSettings,
}

impl ExpirationSweeper {
    pub fn new(
        repository: Arc<dyn CartsRepository>,
        clock: Arc<dyn Clock>,
        settings: SweeperSettings,
    ) -> Self {
        Self {
            repository,
            clock,
            settings,
        }
    }

    /// Run a single cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] if the store fails or the retention cutoff cannot be
    /// computed. Work committed before the failure stays committed.
    pub async fn run_once(&self) -> Result<SweepReport, SweepError> {
        let now = self.clock.now();

        let stale: Vec<CartUuid> = self
            .repository
            .list_expired_active(now)
            .await?
            .into_iter()
            .map(|record| record.uuid)
            .collect();

        let expired = if stale.is_empty() {
            0
        } else {
            self.repository
                .update_statuses(&stale, CartStatus::Expired)
                .await?
        };

        let cutoff = now
            .checked_sub(self.settings.retention)
            .map_err(SweepError::Cutoff)?;

        let purged = self
            .repository
            .delete_stale_before(cutoff, &PURGEABLE)
            .await?;

        Ok(SweepReport { expired, purged })
    }

    /// Start the periodic loop. The first cycle runs immediately.
    ///
    /// Failed cycles are logged and retried on the next tick. The loop ends
    /// when [`SweeperHandle::stop`] is called or the handle is dropped.
    #[must_use = "dropping the handle stops the sweeper"]
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let period = self.settings.interval.max(MIN_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(?period, retention = %self.settings.retention, "expiration sweeper started");

            loop {
                tokio::select! {
                    biased;

                    _ = stopped.changed() => break,
                    _ = ticker.tick() => match self.run_once().await {
                        Ok(report) if report.is_noop() => debug!("sweep found nothing to do"),
                        Ok(report) => info!(
                            expired = report.expired,
                            purged = report.purged,
                            "sweep completed"
                        ),
                        Err(sweep_error) => error!("sweep failed, retrying next tick: {sweep_error}"),
                    },
                }
            }

            info!("expiration sweeper stopped");
        });

        SweeperHandle {
            shutdown,
            task: Some(task),
        }
    }
}

impl Debug for ExpirationSweeper {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExpirationSweeper")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Owns a running sweeper loop.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the loop to stop and wait for it. A cycle already in progress
    /// is allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Join`] if the task panicked.
    pub async fn stop(mut self) -> Result<(), SweepError> {
        self.shutdown.send_replace(true);

        if let Some(task) = self.task.take() {
            task.await?;
        }

        Ok(())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
