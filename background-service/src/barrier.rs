use crate::shutdown::Shutdown;
use seedgate_core::{ErrorExt, TorrentClient, TorrentRecord, WaitScope};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Nothing in scope is downloading any more.
    Quiescent,
    Cancelled,
}

/// Holds the admission loop until downloads in scope have finished.
///
/// There is no timeout: only quiescence or shutdown releases the barrier.
#[derive(Debug, Clone)]
pub struct CompletionBarrier {
    interval: Duration,
    scope: WaitScope,
}

impl CompletionBarrier {
    pub fn new(interval: Duration, scope: WaitScope) -> Self {
        Self { interval, scope }
    }

    pub fn scope(&self) -> WaitScope {
        self.scope
    }

    pub async fn wait<T: TorrentClient>(
        &self,
        client: &T,
        admitted_id: i64,
        shutdown: &Shutdown,
    ) -> BarrierOutcome {
        let mut polls = 0u32;
        loop {
            if shutdown.is_cancelled() {
                return BarrierOutcome::Cancelled;
            }

            polls += 1;
            match client.list().await {
                Ok(records) => {
                    let blocking = self.blocking(&records, admitted_id);
                    if blocking.is_empty() {
                        info!("Downloads finished after {} checks", polls);
                        return BarrierOutcome::Quiescent;
                    }
                    debug!(
                        "Waiting on {} downloading torrents: {}",
                        blocking.len(),
                        blocking.join(", ")
                    );
                }
                Err(e) => {
                    e.log_warn();
                    warn!(
                        "Could not check download progress, retrying in {}s",
                        self.interval.as_secs()
                    );
                }
            }

            if !shutdown.sleep(self.interval).await {
                return BarrierOutcome::Cancelled;
            }
        }
    }

    fn blocking<'a>(&self, records: &'a [TorrentRecord], admitted_id: i64) -> Vec<&'a str> {
        records
            .iter()
            .filter(|record| record.status.is_downloading())
            .filter(|record| match self.scope {
                WaitScope::All => true,
                WaitScope::Admitted => record.id == admitted_id,
            })
            .map(|record| record.name.as_str())
            .collect()
    }
}
