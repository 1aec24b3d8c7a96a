use chrono::{DateTime, Local};
use seedgate_core::Rejection;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoTorrentLink,
    NoKeywordMatch,
    AlreadyAdded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub no_torrent_link: usize,
    pub no_keyword_match: usize,
    pub already_added: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.no_torrent_link + self.no_keyword_match + self.already_added
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedTorrent {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub size_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub url: String,
    pub reason: String,
}

/// An entry given up on for this cycle; its link stays unrecorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedEntry {
    pub link: String,
    pub reason: String,
}

/// Everything one admission pass decided.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub feeds_processed: usize,
    pub feed_failures: Vec<FeedFailure>,
    pub admitted: Vec<AdmittedTorrent>,
    /// Links the client already held, recorded without a new download.
    pub already_in_client: Vec<String>,
    pub skipped: SkipCounts,
    pub rejections: Vec<Rejection>,
    pub abandoned: Vec<AbandonedEntry>,
    /// Set when the budget gate stopped the pass.
    pub aborted: bool,
    pub cancelled: bool,
}

impl CycleReport {
    pub(crate) fn begin() -> Self {
        let now = Local::now();
        Self {
            started_at: now,
            finished_at: now,
            feeds_processed: 0,
            feed_failures: Vec::new(),
            admitted: Vec::new(),
            already_in_client: Vec::new(),
            skipped: SkipCounts::default(),
            rejections: Vec::new(),
            abandoned: Vec::new(),
            aborted: false,
            cancelled: false,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Local::now();
        self
    }

    pub(crate) fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NoTorrentLink => self.skipped.no_torrent_link += 1,
            SkipReason::NoKeywordMatch => self.skipped.no_keyword_match += 1,
            SkipReason::AlreadyAdded => self.skipped.already_added += 1,
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} admitted, {} already in client, {} skipped ({} without torrent link, {} without keyword, {} already added), {} rejected, {} abandoned, {} of {} feeds failed",
            self.admitted.len(),
            self.already_in_client.len(),
            self.skipped.total(),
            self.skipped.no_torrent_link,
            self.skipped.no_keyword_match,
            self.skipped.already_added,
            self.rejections.len(),
            self.abandoned.len(),
            self.feed_failures.len(),
            self.feeds_processed + self.feed_failures.len(),
        );
        if self.aborted {
            summary.push_str(", aborted on seeding budget");
        }
        if self.cancelled {
            summary.push_str(", cancelled");
        }
        summary
    }

    pub fn log(&self) {
        let elapsed = self.finished_at - self.started_at;
        info!(
            "Poll cycle finished in {}s: {}",
            elapsed.num_seconds(),
            self.summary()
        );
        for rejection in &self.rejections {
            info!("Rejected {}", rejection);
        }
        for failure in &self.feed_failures {
            warn!("Feed {} skipped: {}", failure.url, failure.reason);
        }
        for entry in &self.abandoned {
            warn!("Abandoned {}: {}", entry.link, entry.reason);
        }
    }
}
