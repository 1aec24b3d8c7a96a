use crate::barrier::{BarrierOutcome, CompletionBarrier};
use crate::budget;
use crate::report::{AbandonedEntry, AdmittedTorrent, CycleReport, FeedFailure, SkipReason};
use crate::shutdown::Shutdown;
use seedgate_core::{
    CoreError, ErrorExt, FeedEntry, FeedSource, FilterConfig, Rejection, TorrentClient,
};
use storage::DedupStore;
use tracing::{debug, error, info, warn};

enum EntryOutcome {
    Skipped(SkipReason),
    Admitted(AdmittedTorrent, BarrierOutcome),
    AlreadyInClient(String),
    Rejected(Rejection),
    Abandoned(AbandonedEntry),
}

/// Decides, entry by entry, which feed links reach the torrent client.
///
/// Admissions are serialized: after each one the controller waits on the
/// completion barrier before looking at the next entry. A link is recorded in
/// the dedup store only once the client has accepted it and both the size and
/// budget gates passed.
pub struct AdmissionController<F, T> {
    feeds: Vec<String>,
    filter: FilterConfig,
    dedup: DedupStore,
    feed_source: F,
    client: T,
    barrier: CompletionBarrier,
}

impl<F, T> AdmissionController<F, T>
where
    F: FeedSource,
    T: TorrentClient,
{
    pub fn new(
        feeds: Vec<String>,
        filter: FilterConfig,
        dedup: DedupStore,
        feed_source: F,
        client: T,
        barrier: CompletionBarrier,
    ) -> Self {
        Self {
            feeds,
            filter,
            dedup,
            feed_source,
            client,
            barrier,
        }
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// One pass over every feed in order.
    ///
    /// Stops early when the budget gate rejects a torrent or shutdown is requested.
    pub async fn run_cycle(&mut self, shutdown: &Shutdown) -> CycleReport {
        let mut report = CycleReport::begin();
        let feeds = self.feeds.clone();

        'feeds: for feed_url in &feeds {
            if shutdown.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let entries = match self.feed_source.fetch(feed_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    e.log_warn();
                    report.feed_failures.push(FeedFailure {
                        url: feed_url.clone(),
                        reason: e.user_friendly_message(),
                    });
                    continue;
                }
            };
            report.feeds_processed += 1;
            debug!("Processing {} entries from {}", entries.len(), feed_url);

            for entry in &entries {
                if shutdown.is_cancelled() {
                    report.cancelled = true;
                    break 'feeds;
                }

                match self.process_entry(entry, shutdown).await {
                    EntryOutcome::Skipped(reason) => report.record_skip(reason),
                    EntryOutcome::AlreadyInClient(link) => report.already_in_client.push(link),
                    EntryOutcome::Abandoned(abandoned) => report.abandoned.push(abandoned),
                    EntryOutcome::Admitted(admitted, outcome) => {
                        report.admitted.push(admitted);
                        if outcome == BarrierOutcome::Cancelled {
                            report.cancelled = true;
                            break 'feeds;
                        }
                    }
                    EntryOutcome::Rejected(rejection) => {
                        info!("Rejected {}", rejection);
                        let exhausted = matches!(rejection, Rejection::BudgetExceeded { .. });
                        report.rejections.push(rejection);
                        if exhausted {
                            warn!("Seeding budget exhausted, skipping the rest of this cycle");
                            report.aborted = true;
                            break 'feeds;
                        }
                    }
                }
            }
        }

        report.finish()
    }

    async fn process_entry(&mut self, entry: &FeedEntry, shutdown: &Shutdown) -> EntryOutcome {
        let Some(link) = entry.torrent_link() else {
            return EntryOutcome::Skipped(SkipReason::NoTorrentLink);
        };
        if !self.filter.matches_title(&entry.title) {
            return EntryOutcome::Skipped(SkipReason::NoKeywordMatch);
        }
        if self.dedup.contains(link) {
            debug!("Already added: {}", link);
            return EntryOutcome::Skipped(SkipReason::AlreadyAdded);
        }

        let used_gb = match budget::current_seeding_gb(&self.client).await {
            Ok(used) => used,
            Err(e) => return abandon(link, "could not read the seeding budget", e),
        };

        let added = match self.client.add(link).await {
            Ok(added) => added,
            Err(e) => return abandon(link, "could not add the torrent", e),
        };

        if added.duplicate {
            return self.record_duplicate(entry, link, added.id).await;
        }

        let record = match self.client.get(added.id).await {
            Ok(record) => record,
            Err(e) => {
                self.retract(added.id).await;
                return abandon(link, "could not read the added torrent", e);
            }
        };
        let size_gb = record.total_size_gb();

        if self.filter.exceeds_size_limit(size_gb) {
            self.retract(added.id).await;
            return EntryOutcome::Rejected(Rejection::SizeExceeded {
                title: entry.title.clone(),
                size_gb,
                limit_gb: self.filter.max_torrent_size_gb,
            });
        }

        if used_gb + size_gb > self.filter.max_seeding_size_gb {
            self.retract(added.id).await;
            return EntryOutcome::Rejected(Rejection::BudgetExceeded {
                title: entry.title.clone(),
                current_gb: used_gb,
                size_gb,
                limit_gb: self.filter.max_seeding_size_gb,
            });
        }

        if let Err(e) = self.client.start(added.id).await {
            self.retract(added.id).await;
            return abandon(link, "could not start the torrent", e);
        }

        // Once started, a failed write leaves the torrent running; the next
        // cycle sees it as a client duplicate and records it then.
        if let Err(e) = self.dedup.record(link).await {
            return abandon(link, "could not record the link", e);
        }

        info!(
            "Accepted {} ({:.2} GB). Seeding usage {:.2} GB -> {:.2} GB of {:.2} GB",
            entry.title,
            size_gb,
            used_gb,
            used_gb + size_gb,
            self.filter.max_seeding_size_gb
        );

        let outcome = self.barrier.wait(&self.client, added.id, shutdown).await;
        EntryOutcome::Admitted(
            AdmittedTorrent {
                id: added.id,
                title: entry.title.clone(),
                link: link.to_string(),
                size_gb,
            },
            outcome,
        )
    }

    /// Records a link the client already holds, unless it breaks the size limit.
    ///
    /// The torrent is never removed here since this pass did not add it.
    async fn record_duplicate(&mut self, entry: &FeedEntry, link: &str, id: i64) -> EntryOutcome {
        let record = match self.client.get(id).await {
            Ok(record) => record,
            Err(e) => return abandon(link, "could not read the existing torrent", e),
        };
        let size_gb = record.total_size_gb();

        if self.filter.exceeds_size_limit(size_gb) {
            warn!(
                "Torrent {} already in {} exceeds the size limit, leaving {} unrecorded",
                id,
                self.client.endpoint(),
                link
            );
            return EntryOutcome::Rejected(Rejection::SizeExceeded {
                title: entry.title.clone(),
                size_gb,
                limit_gb: self.filter.max_torrent_size_gb,
            });
        }

        info!(
            "{} is already in the torrent client as {}, recording it",
            entry.title, id
        );
        match self.dedup.record(link).await {
            Ok(_) => EntryOutcome::AlreadyInClient(link.to_string()),
            Err(e) => abandon(link, "could not record the link", e),
        }
    }

    /// Removes a torrent that was added paused but will not be kept.
    async fn retract(&self, id: i64) {
        if let Err(e) = self.client.remove(id, true).await {
            e.log_warn();
            warn!(
                "Torrent {} could not be removed and remains in {} untracked",
                id,
                self.client.endpoint()
            );
        }
    }
}

fn abandon(link: &str, context: &str, error: CoreError) -> EntryOutcome {
    error.log_error();
    error!("Abandoning {}: {}", link, context);
    EntryOutcome::Abandoned(AbandonedEntry {
        link: link.to_string(),
        reason: format!("{}: {}", context, error.user_friendly_message()),
    })
}
