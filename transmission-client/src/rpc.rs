//! Wire types for the Transmission JSON-RPC protocol.

use seedgate_core::{TorrentRecord, TorrentStatus};
use serde::{Deserialize, Serialize};

pub const TORRENT_FIELDS: &[&str] = &["id", "name", "totalSize", "status", "haveValid"];

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, A> {
    pub method: &'a str,
    pub arguments: A,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<R> {
    pub result: String,
    pub arguments: Option<R>,
}

#[derive(Debug, Serialize)]
pub struct TorrentAddArgs<'a> {
    pub filename: &'a str,
    pub paused: bool,
}

#[derive(Debug, Deserialize)]
pub struct TorrentAddResult {
    #[serde(rename = "torrent-added")]
    pub added: Option<AddedTorrentWire>,
    #[serde(rename = "torrent-duplicate")]
    pub duplicate: Option<AddedTorrentWire>,
}

#[derive(Debug, Deserialize)]
pub struct AddedTorrentWire {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TorrentGetArgs<'a> {
    pub fields: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct TorrentGetResult {
    pub torrents: Vec<TorrentWire>,
}

#[derive(Debug, Deserialize)]
pub struct TorrentWire {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "totalSize", default)]
    pub total_size: i64,
    pub status: i64,
    #[serde(rename = "haveValid", default)]
    pub have_valid: i64,
}

impl From<TorrentWire> for TorrentRecord {
    fn from(wire: TorrentWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            total_size_bytes: wire.total_size.max(0) as u64,
            status: TorrentStatus::from_code(wire.status),
            have_valid_bytes: wire.have_valid.max(0) as u64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TorrentIdsArgs {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct TorrentRemoveArgs {
    pub ids: Vec<i64>,
    #[serde(rename = "delete-local-data")]
    pub delete_local_data: bool,
}

/// Placeholder for responses whose arguments carry nothing we use.
#[derive(Debug, Deserialize)]
pub struct Ignored {}
