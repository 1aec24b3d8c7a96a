use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Mime type a feed enclosure must declare to be treated as a torrent link.
pub const BITTORRENT_MIME_TYPE: &str = "application/x-bittorrent";

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub mime_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub enclosures: Vec<Enclosure>,
}

impl FeedEntry {
    /// First enclosure declaring a bittorrent payload.
    pub fn torrent_link(&self) -> Option<&str> {
        self.enclosures
            .iter()
            .find(|enclosure| enclosure.mime_type.eq_ignore_ascii_case(BITTORRENT_MIME_TYPE))
            .map(|enclosure| enclosure.url.as_str())
    }
}

/// Filter criteria collected on first run and persisted between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Largest single torrent accepted, 0 means unlimited.
    pub max_torrent_size_gb: f64,
    /// Lowercase keywords, a title matching any one of them is considered.
    pub keywords: BTreeSet<String>,
    /// Hard cap on the aggregate size of seeding and downloading torrents.
    pub max_seeding_size_gb: f64,
}

impl FilterConfig {
    pub fn new<I, S>(max_torrent_size_gb: f64, keywords: I, max_seeding_size_gb: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_torrent_size_gb,
            keywords: normalize_keywords(keywords),
            max_seeding_size_gb,
        }
    }

    /// Case-insensitive substring match against any configured keyword.
    pub fn matches_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords.iter().any(|keyword| title.contains(keyword.as_str()))
    }

    pub fn exceeds_size_limit(&self, size_gb: f64) -> bool {
        self.max_torrent_size_gb > 0.0 && size_gb > self.max_torrent_size_gb
    }
}

pub fn normalize_keywords<I, S>(keywords: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|keyword| keyword.as_ref().trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorrentStatus {
    Stopped,
    CheckPending,
    Checking,
    DownloadPending,
    Downloading,
    SeedPending,
    Seeding,
    Unknown(i64),
}

impl TorrentStatus {
    /// Maps the numeric status used by the Transmission RPC.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TorrentStatus::Stopped,
            1 => TorrentStatus::CheckPending,
            2 => TorrentStatus::Checking,
            3 => TorrentStatus::DownloadPending,
            4 => TorrentStatus::Downloading,
            5 => TorrentStatus::SeedPending,
            6 => TorrentStatus::Seeding,
            other => TorrentStatus::Unknown(other),
        }
    }

    /// Counted against the seeding budget.
    pub fn occupies_budget(&self) -> bool {
        matches!(self, TorrentStatus::Downloading | TorrentStatus::Seeding)
    }

    /// Blocks the completion barrier. Queued downloads count as in flight.
    pub fn is_downloading(&self) -> bool {
        matches!(
            self,
            TorrentStatus::Downloading | TorrentStatus::DownloadPending
        )
    }
}

impl fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentStatus::Stopped => write!(f, "stopped"),
            TorrentStatus::CheckPending => write!(f, "check pending"),
            TorrentStatus::Checking => write!(f, "checking"),
            TorrentStatus::DownloadPending => write!(f, "download pending"),
            TorrentStatus::Downloading => write!(f, "downloading"),
            TorrentStatus::SeedPending => write!(f, "seed pending"),
            TorrentStatus::Seeding => write!(f, "seeding"),
            TorrentStatus::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentRecord {
    pub id: i64,
    pub name: String,
    pub total_size_bytes: u64,
    pub status: TorrentStatus,
    /// Verified bytes already on disk.
    pub have_valid_bytes: u64,
}

impl TorrentRecord {
    pub fn total_size_gb(&self) -> f64 {
        bytes_to_gb(self.total_size_bytes)
    }
}

/// Result of submitting a link to the torrent client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedTorrent {
    pub id: i64,
    pub name: String,
    /// The client already knew this torrent before the call.
    pub duplicate: bool,
}

/// Policy decisions that turn an admitted torrent away.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    SizeExceeded {
        title: String,
        size_gb: f64,
        limit_gb: f64,
    },
    BudgetExceeded {
        title: String,
        current_gb: f64,
        size_gb: f64,
        limit_gb: f64,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SizeExceeded {
                title,
                size_gb,
                limit_gb,
            } => write!(
                f,
                "{}: torrent size {:.2} GB exceeds the single torrent limit of {:.2} GB",
                title, size_gb, limit_gb
            ),
            Rejection::BudgetExceeded {
                title,
                current_gb,
                size_gb,
                limit_gb,
            } => write!(
                f,
                "{}: current usage {:.2} GB plus torrent size {:.2} GB exceeds the seeding limit of {:.2} GB",
                title, current_gb, size_gb, limit_gb
            ),
        }
    }
}
