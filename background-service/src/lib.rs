mod admission;
mod barrier;
pub mod budget;
#[cfg(any(test, feature = "test-util"))]
pub mod mocks;
mod report;
mod shutdown;
mod tests;

pub use admission::AdmissionController;
pub use barrier::{BarrierOutcome, CompletionBarrier};
pub use report::{
    AbandonedEntry, AdmittedTorrent, CycleReport, FeedFailure, SkipCounts, SkipReason,
};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};

use seedgate_core::{CoreError, ErrorExt, FeedSource, TorrentClient};
use std::time::Duration;
use tracing::{error, info};

/// Drives the admission controller once per poll interval until shutdown.
pub struct BackgroundService<F, T> {
    controller: AdmissionController<F, T>,
    poll_interval: Duration,
}

impl<F, T> BackgroundService<F, T>
where
    F: FeedSource,
    T: TorrentClient,
{
    pub fn new(controller: AdmissionController<F, T>, poll_interval: Duration) -> Self {
        Self {
            controller,
            poll_interval,
        }
    }

    pub fn controller(&self) -> &AdmissionController<F, T> {
        &self.controller
    }

    /// Runs poll cycles back to back, sleeping in between. Returns the number
    /// of cycles run once shutdown is observed.
    pub async fn run(&mut self, shutdown: &Shutdown) -> usize {
        info!(
            "Background service started, polling every {}s",
            self.poll_interval.as_secs()
        );

        let mut cycles = 0;
        while !shutdown.is_cancelled() {
            let report = self.controller.run_cycle(shutdown).await;
            report.log();
            cycles += 1;

            if report.cancelled {
                break;
            }

            info!("Next poll in {}s", self.poll_interval.as_secs());
            if !shutdown.sleep(self.poll_interval).await {
                break;
            }
        }

        info!("Background service stopped after {} poll cycles", cycles);
        cycles
    }
}

/// Startup probe of the torrent client. Failure is fatal to the caller.
pub async fn check_connectivity<T: TorrentClient>(client: &T) -> Result<(), CoreError> {
    info!("Checking connection to {}", client.endpoint());
    client.probe().await.map_err(|e| {
        e.log_error();
        error!("Torrent client at {} is not reachable", client.endpoint());
        e
    })
}
