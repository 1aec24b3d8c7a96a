//! In-memory collaborators for driving the admission loop in tests.
//!
//! Both mocks are cheap to clone and share their state, so a test can keep a
//! handle for assertions after moving one into the controller.
//!
//! ```ignore
//! let feeds = MockFeedSource::new();
//! feeds.set_entries("https://tracker.test/rss", vec![torrent_entry("Linux ISO", LINK)]);
//!
//! let client = MockTorrentClient::new();
//! client.register_link(LINK, "linux.iso", 2 * GB);
//! ```

use seedgate_core::{
    AddedTorrent, CoreError, Enclosure, FeedEntry, FeedError, FeedSource, TorrentClient,
    TorrentClientError, TorrentRecord, TorrentStatus, BITTORRENT_MIME_TYPE, BYTES_PER_GB,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const GB: u64 = BYTES_PER_GB as u64;

pub fn torrent_entry(title: &str, link: &str) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        enclosures: vec![Enclosure {
            mime_type: BITTORRENT_MIME_TYPE.to_string(),
            url: link.to_string(),
        }],
    }
}

// ============================================================================
// Mock feed source
// ============================================================================

#[derive(Clone, Default)]
pub struct MockFeedSource {
    feeds: Arc<Mutex<HashMap<String, Result<Vec<FeedEntry>, FeedError>>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entries(&self, url: &str, entries: Vec<FeedEntry>) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(entries));
    }

    pub fn set_failure(&self, url: &str, error: FeedError) {
        self.feeds
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(error));
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl FeedSource for MockFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, CoreError> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.feeds.lock().unwrap().get(url) {
            Some(Ok(entries)) => Ok(entries.clone()),
            Some(Err(error)) => Err(error.clone().into()),
            None => Err(FeedError::Unreachable {
                url: url.to_string(),
                reason: "no such feed".to_string(),
            }
            .into()),
        }
    }
}

// ============================================================================
// Mock torrent client
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Probe,
    Add(String),
    Get(i64),
    List,
    Start(i64),
    Remove { id: i64, delete_data: bool },
}

#[derive(Default)]
struct ClientState {
    /// Torrent name and size served for each known link.
    catalog: HashMap<String, (String, u64)>,
    torrents: BTreeMap<i64, TorrentRecord>,
    links: HashMap<String, i64>,
    next_id: i64,
    failing_adds: HashSet<String>,
    probe_fails: bool,
    list_fails: bool,
    download_polls: u32,
    /// Remaining list calls before a started torrent finishes.
    downloading: HashMap<i64, u32>,
    calls: Vec<ClientCall>,
}

/// Simulated Transmission daemon.
///
/// Added torrents start out stopped. Once started they report as downloading
/// for the configured number of `list` calls, then as fully seeded.
#[derive(Clone, Default)]
pub struct MockTorrentClient {
    state: Arc<Mutex<ClientState>>,
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `link` resolvable by `add`.
    pub fn register_link(&self, link: &str, name: &str, size_bytes: u64) {
        self.state
            .lock()
            .unwrap()
            .catalog
            .insert(link.to_string(), (name.to_string(), size_bytes));
    }

    /// Places a torrent in the client that this tool never added.
    pub fn insert_existing(
        &self,
        name: &str,
        status: TorrentStatus,
        size_bytes: u64,
        have_bytes: u64,
    ) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.torrents.insert(
            id,
            TorrentRecord {
                id,
                name: name.to_string(),
                total_size_bytes: size_bytes,
                status,
                have_valid_bytes: have_bytes,
            },
        );
        id
    }

    /// Places a seeding torrent for `link` so adding it again reports a duplicate.
    pub fn insert_existing_link(&self, link: &str, name: &str, size_bytes: u64) -> i64 {
        let id = self.insert_existing(name, TorrentStatus::Seeding, size_bytes, size_bytes);
        self.state.lock().unwrap().links.insert(link.to_string(), id);
        id
    }

    pub fn fail_add(&self, link: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_adds
            .insert(link.to_string());
    }

    pub fn allow_add(&self, link: &str) {
        self.state.lock().unwrap().failing_adds.remove(link);
    }

    pub fn fail_probe(&self) {
        self.state.lock().unwrap().probe_fails = true;
    }

    pub fn fail_list(&self, fails: bool) {
        self.state.lock().unwrap().list_fails = fails;
    }

    /// Number of `list` calls a started torrent keeps downloading for.
    pub fn set_download_polls(&self, polls: u32) {
        self.state.lock().unwrap().download_polls = polls;
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn added_links(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClientCall::Add(link) => Some(link),
                _ => None,
            })
            .collect()
    }

    pub fn removed_ids(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClientCall::Remove { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn torrents(&self) -> Vec<TorrentRecord> {
        self.state.lock().unwrap().torrents.values().cloned().collect()
    }

    fn not_found(id: i64) -> CoreError {
        TorrentClientError::TorrentNotFound { id }.into()
    }
}

impl TorrentClient for MockTorrentClient {
    async fn probe(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Probe);
        if state.probe_fails {
            return Err(TorrentClientError::Connectivity {
                endpoint: "mock://transmission".to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn add(&self, link: &str) -> Result<AddedTorrent, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Add(link.to_string()));

        if state.failing_adds.contains(link) {
            return Err(TorrentClientError::AddTorrentFailed {
                link: link.to_string(),
                reason: "invalid or corrupt torrent file".to_string(),
            }
            .into());
        }

        if let Some(id) = state.links.get(link).copied() {
            let name = state
                .torrents
                .get(&id)
                .map(|torrent| torrent.name.clone())
                .unwrap_or_default();
            return Ok(AddedTorrent {
                id,
                name,
                duplicate: true,
            });
        }

        let (name, size) = state.catalog.get(link).cloned().ok_or_else(|| {
            TorrentClientError::AddTorrentFailed {
                link: link.to_string(),
                reason: "http error 404: Not Found".to_string(),
            }
        })?;

        state.next_id += 1;
        let id = state.next_id;
        state.links.insert(link.to_string(), id);
        state.torrents.insert(
            id,
            TorrentRecord {
                id,
                name: name.clone(),
                total_size_bytes: size,
                status: TorrentStatus::Stopped,
                have_valid_bytes: 0,
            },
        );

        Ok(AddedTorrent {
            id,
            name,
            duplicate: false,
        })
    }

    async fn get(&self, id: i64) -> Result<TorrentRecord, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Get(id));
        state.torrents.get(&id).cloned().ok_or_else(|| Self::not_found(id))
    }

    async fn list(&self) -> Result<Vec<TorrentRecord>, CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::List);
        if state.list_fails {
            return Err(TorrentClientError::ServerError { status_code: 503 }.into());
        }

        let snapshot = state.torrents.values().cloned().collect();

        let mut finished = Vec::new();
        for (id, remaining) in state.downloading.iter_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                finished.push(*id);
            }
        }
        for id in finished {
            state.downloading.remove(&id);
            if let Some(torrent) = state.torrents.get_mut(&id) {
                torrent.status = TorrentStatus::Seeding;
                torrent.have_valid_bytes = torrent.total_size_bytes;
            }
        }

        Ok(snapshot)
    }

    async fn start(&self, id: i64) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Start(id));
        let polls = state.download_polls;
        let torrent = state.torrents.get_mut(&id).ok_or_else(|| Self::not_found(id))?;

        if polls == 0 {
            torrent.status = TorrentStatus::Seeding;
            torrent.have_valid_bytes = torrent.total_size_bytes;
        } else {
            torrent.status = TorrentStatus::Downloading;
            state.downloading.insert(id, polls);
        }
        Ok(())
    }

    async fn remove(&self, id: i64, delete_data: bool) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClientCall::Remove { id, delete_data });
        state.torrents.remove(&id).ok_or_else(|| Self::not_found(id))?;
        state.downloading.remove(&id);
        state.links.retain(|_, torrent_id| *torrent_id != id);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "mock://transmission"
    }
}
