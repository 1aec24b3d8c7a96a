//! Narrow interfaces to the collaborators the admission loop drives.

use crate::{AddedTorrent, CoreError, FeedEntry, TorrentRecord};

/// Pull-based access to a syndication feed.
pub trait FeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, CoreError>;
}

/// Remote torrent download client.
pub trait TorrentClient {
    /// Connectivity check used once at startup.
    async fn probe(&self) -> Result<(), CoreError>;

    /// Registers the link with the client without starting the transfer.
    async fn add(&self, link: &str) -> Result<AddedTorrent, CoreError>;

    async fn get(&self, id: i64) -> Result<TorrentRecord, CoreError>;

    async fn list(&self) -> Result<Vec<TorrentRecord>, CoreError>;

    async fn start(&self, id: i64) -> Result<(), CoreError>;

    async fn remove(&self, id: i64, delete_data: bool) -> Result<(), CoreError>;

    /// Human readable location of the client, for log lines.
    fn endpoint(&self) -> &str;
}
