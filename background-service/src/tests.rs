#[cfg(test)]
mod tests {
    use crate::mocks::{torrent_entry, ClientCall, MockFeedSource, MockTorrentClient, GB};
    use crate::{
        shutdown_channel, AdmissionController, BackgroundService, BarrierOutcome,
        CompletionBarrier, Shutdown,
    };
    use seedgate_core::{
        Enclosure, FeedEntry, FeedError, FilterConfig, Rejection, TorrentStatus, WaitScope,
    };
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use storage::DedupStore;
    use uuid::Uuid;

    const FEED_A: &str = "https://tracker-a.test/rss";
    const FEED_B: &str = "https://tracker-b.test/rss";
    const LINUX_ISO: &str = "https://tracker-a.test/download/linux-iso.torrent";
    const LINUX_BIG: &str = "https://tracker-a.test/download/linux-big.torrent";
    const WINDOWS: &str = "https://tracker-a.test/download/windows.torrent";

    fn temp_dedup_path() -> PathBuf {
        std::env::temp_dir().join(format!("seedgate-dedup-{}.txt", Uuid::new_v4()))
    }

    fn linux_filter(max_torrent_gb: f64, max_seeding_gb: f64) -> FilterConfig {
        FilterConfig::new(max_torrent_gb, ["linux"], max_seeding_gb)
    }

    async fn controller(
        feeds: &[&str],
        filter: FilterConfig,
        dedup_path: &Path,
        feed_source: &MockFeedSource,
        client: &MockTorrentClient,
        scope: WaitScope,
    ) -> AdmissionController<MockFeedSource, MockTorrentClient> {
        let dedup = DedupStore::load(dedup_path)
            .await
            .expect("Failed to load dedup store");
        AdmissionController::new(
            feeds.iter().map(|feed| feed.to_string()).collect(),
            filter,
            dedup,
            feed_source.clone(),
            client.clone(),
            CompletionBarrier::new(Duration::from_millis(1), scope),
        )
    }

    /// A shutdown whose trigger is gone, so it never fires.
    fn idle_shutdown() -> Shutdown {
        shutdown_channel().1
    }

    #[tokio::test]
    async fn test_budget_exhaustion_aborts_cycle() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(
            FEED_A,
            vec![
                torrent_entry("Linux ISO", LINUX_ISO),
                torrent_entry("Windows Update", WINDOWS),
                torrent_entry("Linux Big", LINUX_BIG),
            ],
        );
        feeds.set_entries(
            FEED_B,
            vec![torrent_entry("Linux Small", "https://tracker-b.test/small.torrent")],
        );

        let client = MockTorrentClient::new();
        client.insert_existing("already seeding", TorrentStatus::Seeding, 3 * GB, 3 * GB);
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);
        client.register_link(WINDOWS, "windows.iso", GB);
        client.register_link(LINUX_BIG, "linux-big.iso", 9 * GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A, FEED_B],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.admitted.len(), 1);
        assert_eq!(report.admitted[0].link, LINUX_ISO);
        assert_eq!(report.skipped.no_keyword_match, 1);
        assert!(report.aborted);
        assert!(!report.cancelled);
        match &report.rejections[..] {
            [Rejection::BudgetExceeded {
                title,
                current_gb,
                size_gb,
                limit_gb,
            }] => {
                assert_eq!(title, "Linux Big");
                assert_eq!(*current_gb, 5.0);
                assert_eq!(*size_gb, 9.0);
                assert_eq!(*limit_gb, 10.0);
            }
            other => panic!("Expected one budget rejection, got {:?}", other),
        }

        assert_eq!(client.added_links(), vec![LINUX_ISO, LINUX_BIG]);
        assert!(controller.dedup().contains(LINUX_ISO));
        assert!(!controller.dedup().contains(LINUX_BIG));
        assert_eq!(feeds.fetched(), vec![FEED_A]);

        let removals = client
            .calls()
            .into_iter()
            .filter(|call| matches!(call, ClientCall::Remove { .. }))
            .collect::<Vec<_>>();
        assert_eq!(
            removals,
            vec![ClientCall::Remove {
                id: 3,
                delete_data: true
            }]
        );
        assert!(client.torrents().iter().all(|t| t.name != "linux-big.iso"));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_same_link_in_two_feeds_is_added_once() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);
        feeds.set_entries(FEED_B, vec![torrent_entry("linux iso mirror", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A, FEED_B],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.admitted.len(), 1);
        assert_eq!(report.skipped.already_added, 1);
        assert_eq!(client.added_links(), vec![LINUX_ISO]);
        assert_eq!(feeds.fetched(), vec![FEED_A, FEED_B]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\n", LINUX_ISO)
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_oversized_torrent_is_retracted_and_cycle_continues() {
        let small = "https://tracker-a.test/download/linux-small.torrent";
        let feeds = MockFeedSource::new();
        feeds.set_entries(
            FEED_A,
            vec![
                torrent_entry("Linux Big", LINUX_BIG),
                torrent_entry("Linux Small", small),
            ],
        );

        let client = MockTorrentClient::new();
        client.register_link(LINUX_BIG, "linux-big.iso", 6 * GB);
        client.register_link(small, "linux-small.iso", GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(4.0, 100.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert!(!report.aborted);
        assert!(matches!(
            &report.rejections[..],
            [Rejection::SizeExceeded { size_gb, limit_gb, .. }] if *size_gb == 6.0 && *limit_gb == 4.0
        ));
        assert_eq!(report.admitted.len(), 1);
        assert!(report.admitted.iter().all(|admitted| admitted.size_gb <= 4.0));

        assert!(!controller.dedup().contains(LINUX_BIG));
        assert!(controller.dedup().contains(small));
        assert_eq!(client.removed_ids().len(), 1);
        assert_eq!(client.torrents().len(), 1);
        assert_eq!(client.torrents()[0].name, "linux-small.iso");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_rejected_torrent_is_never_started() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux Big", LINUX_BIG)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_BIG, "linux-big.iso", 20 * GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        controller.run_cycle(&idle_shutdown()).await;

        assert!(!client
            .calls()
            .iter()
            .any(|call| matches!(call, ClientCall::Start(_))));
        assert!(controller.dedup().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_failing_feed_is_skipped() {
        let feeds = MockFeedSource::new();
        feeds.set_failure(
            FEED_A,
            FeedError::Malformed {
                url: FEED_A.to_string(),
                details: "unexpected end of document".to_string(),
            },
        );
        feeds.set_entries(FEED_B, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A, FEED_B],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.feed_failures.len(), 1);
        assert_eq!(report.feed_failures[0].url, FEED_A);
        assert_eq!(report.feeds_processed, 1);
        assert_eq!(report.admitted.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_entries_without_match_are_never_submitted() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(
            FEED_A,
            vec![
                torrent_entry("Windows Update", WINDOWS),
                FeedEntry {
                    title: "Linux podcast".to_string(),
                    enclosures: vec![Enclosure {
                        mime_type: "audio/mpeg".to_string(),
                        url: "https://tracker-a.test/episode.mp3".to_string(),
                    }],
                },
                FeedEntry {
                    title: "Linux without enclosure".to_string(),
                    enclosures: Vec::new(),
                },
            ],
        );

        let client = MockTorrentClient::new();
        client.register_link(WINDOWS, "windows.iso", GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.skipped.no_keyword_match, 1);
        assert_eq!(report.skipped.no_torrent_link, 2);
        assert!(report.admitted.is_empty());
        assert!(client.calls().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_add_failure_is_retried_next_cycle() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);
        client.fail_add(LINUX_ISO);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;
        let shutdown = idle_shutdown();

        let first = controller.run_cycle(&shutdown).await;
        assert_eq!(first.abandoned.len(), 1);
        assert_eq!(first.abandoned[0].link, LINUX_ISO);
        assert!(!controller.dedup().contains(LINUX_ISO));

        client.allow_add(LINUX_ISO);
        let second = controller.run_cycle(&shutdown).await;
        assert_eq!(second.admitted.len(), 1);
        assert!(controller.dedup().contains(LINUX_ISO));
        assert_eq!(client.added_links(), vec![LINUX_ISO, LINUX_ISO]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_budget_snapshot_failure_abandons_entry() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);
        client.fail_list(true);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.abandoned.len(), 1);
        assert!(client.added_links().is_empty());
        assert!(controller.dedup().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_duplicate_in_client_is_recorded_without_waiting() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.insert_existing_link(LINUX_ISO, "linux.iso", 2 * GB);
        client.insert_existing("foreign", TorrentStatus::Downloading, 4 * GB, GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.already_in_client, vec![LINUX_ISO.to_string()]);
        assert!(report.admitted.is_empty());
        assert!(controller.dedup().contains(LINUX_ISO));
        assert_eq!(
            client.calls(),
            vec![
                ClientCall::List,
                ClientCall::Add(LINUX_ISO.to_string()),
                ClientCall::Get(1)
            ]
        );
        assert_eq!(client.torrents().len(), 2);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_oversized_duplicate_is_left_unrecorded() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux Big", LINUX_BIG)]);

        let client = MockTorrentClient::new();
        let existing = client.insert_existing_link(LINUX_BIG, "linux-big.iso", 50 * GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(4.0, 100.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert!(!controller.dedup().contains(LINUX_BIG));
        assert!(report.already_in_client.is_empty());
        assert!(!report.aborted);
        assert!(matches!(
            &report.rejections[..],
            [Rejection::SizeExceeded { size_gb, limit_gb, .. }] if *size_gb == 50.0 && *limit_gb == 4.0
        ));
        assert!(client.removed_ids().is_empty());
        assert!(client.torrents().iter().any(|torrent| torrent.id == existing));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dedup_survives_restart() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);

        let path = temp_dedup_path();
        {
            let mut first_run = controller(
                &[FEED_A],
                linux_filter(0.0, 10.0),
                &path,
                &feeds,
                &client,
                WaitScope::All,
            )
            .await;
            first_run.run_cycle(&idle_shutdown()).await;
        }

        let mut second_run = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;
        let report = second_run.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.skipped.already_added, 1);
        assert_eq!(client.added_links(), vec![LINUX_ISO]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_admitted_scope_ignores_foreign_downloads() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.insert_existing("foreign", TorrentStatus::Downloading, 10 * GB, GB);
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);
        client.set_download_polls(2);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 100.0),
            &path,
            &feeds,
            &client,
            WaitScope::Admitted,
        )
        .await;

        let report = controller.run_cycle(&idle_shutdown()).await;

        assert_eq!(report.admitted.len(), 1);
        assert!(!report.cancelled);
        let lists = client
            .calls()
            .iter()
            .filter(|call| **call == ClientCall::List)
            .count();
        // Budget snapshot, two polls while downloading, one once seeding.
        assert_eq!(lists, 4);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_all_scope_waits_on_foreign_downloads_until_shutdown() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(
            FEED_A,
            vec![
                torrent_entry("Linux ISO", LINUX_ISO),
                torrent_entry("Linux Big", LINUX_BIG),
            ],
        );

        let client = MockTorrentClient::new();
        client.insert_existing("foreign", TorrentStatus::Downloading, 10 * GB, GB);
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);
        client.register_link(LINUX_BIG, "linux-big.iso", 3 * GB);

        let path = temp_dedup_path();
        let mut controller = controller(
            &[FEED_A],
            linux_filter(0.0, 100.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;

        let (trigger, shutdown) = shutdown_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let report = controller.run_cycle(&shutdown).await;

        assert!(report.cancelled);
        assert_eq!(report.admitted.len(), 1);
        assert_eq!(client.added_links(), vec![LINUX_ISO]);
        assert!(controller.dedup().contains(LINUX_ISO));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_barrier_keeps_polling_through_list_errors() {
        let client = MockTorrentClient::new();
        client.fail_list(true);

        let toggler = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            toggler.fail_list(false);
        });

        let barrier = CompletionBarrier::new(Duration::from_millis(1), WaitScope::All);
        let outcome = barrier.wait(&client, 1, &idle_shutdown()).await;

        assert_eq!(outcome, BarrierOutcome::Quiescent);
        assert!(client.calls().len() >= 2);
    }

    #[tokio::test]
    async fn test_queued_torrent_holds_the_barrier() {
        let client = MockTorrentClient::new();
        let queued = client.insert_existing("queued.iso", TorrentStatus::DownloadPending, GB, 0);
        client.insert_existing("seeding.iso", TorrentStatus::Seeding, GB, GB);

        let (trigger, shutdown) = shutdown_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.trigger();
        });

        let barrier = CompletionBarrier::new(Duration::from_millis(1), WaitScope::All);
        assert_eq!(
            barrier.wait(&client, queued + 100, &shutdown).await,
            BarrierOutcome::Cancelled
        );
        assert!(client.calls().len() >= 2);

        let seeding_only = MockTorrentClient::new();
        seeding_only.insert_existing("seeding.iso", TorrentStatus::Seeding, GB, GB);
        assert_eq!(
            barrier.wait(&seeding_only, 1, &idle_shutdown()).await,
            BarrierOutcome::Quiescent
        );
    }

    #[tokio::test]
    async fn test_barrier_returns_when_already_cancelled() {
        let client = MockTorrentClient::new();
        let (trigger, shutdown) = shutdown_channel();
        trigger.trigger();

        let barrier = CompletionBarrier::new(Duration::from_secs(60), WaitScope::All);
        assert_eq!(
            barrier.wait(&client, 1, &shutdown).await,
            BarrierOutcome::Cancelled
        );
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_service_stops_on_shutdown() {
        let feeds = MockFeedSource::new();
        feeds.set_entries(FEED_A, vec![torrent_entry("Linux ISO", LINUX_ISO)]);

        let client = MockTorrentClient::new();
        client.register_link(LINUX_ISO, "linux.iso", 2 * GB);

        let path = temp_dedup_path();
        let controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;
        let mut service = BackgroundService::new(controller, Duration::from_secs(3600));

        let (trigger, shutdown) = shutdown_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let cycles = tokio::time::timeout(Duration::from_secs(5), service.run(&shutdown))
            .await
            .expect("service did not stop");

        assert_eq!(cycles, 1);
        assert_eq!(feeds.fetched(), vec![FEED_A]);
        assert!(service.controller().dedup().contains(LINUX_ISO));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_service_does_not_poll_after_early_shutdown() {
        let feeds = MockFeedSource::new();
        let client = MockTorrentClient::new();
        let path = temp_dedup_path();
        let controller = controller(
            &[FEED_A],
            linux_filter(0.0, 10.0),
            &path,
            &feeds,
            &client,
            WaitScope::All,
        )
        .await;
        let mut service = BackgroundService::new(controller, Duration::from_secs(3600));

        let (trigger, shutdown) = shutdown_channel();
        trigger.trigger();

        assert_eq!(service.run(&shutdown).await, 0);
        assert!(feeds.fetched().is_empty());
    }
}
