//! Seeding budget accounting.
//!
//! The budget is always derived from a fresh listing of the client; the
//! client's state changes underneath us between calls.

use seedgate_core::{bytes_to_gb, CoreError, TorrentClient, TorrentRecord};
use tracing::debug;

/// Sum of verified on-disk bytes of every downloading or seeding torrent, in GB.
pub fn seeding_budget_gb(records: &[TorrentRecord]) -> f64 {
    let bytes: u64 = records
        .iter()
        .filter(|record| record.status.occupies_budget())
        .map(|record| record.have_valid_bytes)
        .sum();
    bytes_to_gb(bytes)
}

pub async fn current_seeding_gb<T: TorrentClient>(client: &T) -> Result<f64, CoreError> {
    let records = client.list().await?;
    let used = seeding_budget_gb(&records);
    debug!(
        "Current seeding usage: {:.2} GB across {} torrents",
        used,
        records.len()
    );
    Ok(used)
}
