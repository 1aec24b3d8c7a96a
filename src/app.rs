//! Startup sequence shared by the binary and its tests.

use background_service::{
    check_connectivity, AdmissionController, BackgroundService, CompletionBarrier, Shutdown,
};
use seedgate_core::{AppSettings, CoreError, FeedSource, TorrentClient};
use std::io::{BufRead, Write};
use storage::{ConfigStore, DedupStore};
use tracing::{info, warn};

/// Probes the client, loads or prompts for the filter, then polls until shutdown.
///
/// Returns the number of poll cycles run. A failed probe returns before any
/// feed is read or any file is written.
pub async fn run<F, T, R, W>(
    settings: &AppSettings,
    feed_source: F,
    client: T,
    input: &mut R,
    output: &mut W,
    shutdown: &Shutdown,
) -> Result<usize, CoreError>
where
    F: FeedSource,
    T: TorrentClient,
    R: BufRead,
    W: Write,
{
    check_connectivity(&client).await?;

    let config_store = ConfigStore::new(&settings.paths.filter_config);
    let filter = match config_store.load().await? {
        Some(filter) => filter,
        None => {
            info!(
                "No usable filter configuration in {}, asking for one",
                config_store.path().display()
            );
            config_store.prompt_and_save(input, output).await?
        }
    };
    info!(
        "Filtering on keywords [{}], max torrent size {} GB, max seeding size {} GB",
        filter.keywords.iter().cloned().collect::<Vec<_>>().join(", "),
        filter.max_torrent_size_gb,
        filter.max_seeding_size_gb
    );

    let dedup = DedupStore::load(&settings.paths.dedup).await?;

    if settings.feeds.is_empty() {
        warn!("No feeds configured, poll cycles will have nothing to do");
    }

    let barrier = CompletionBarrier::new(
        settings.polling.completion_wait_interval(),
        settings.polling.wait_scope,
    );
    let controller = AdmissionController::new(
        settings.feeds.clone(),
        filter,
        dedup,
        feed_source,
        client,
        barrier,
    );
    let mut service = BackgroundService::new(controller, settings.polling.poll_interval());

    Ok(service.run(shutdown).await)
}
