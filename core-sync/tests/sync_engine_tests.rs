//! Integration tests for the synchronization engine
//!
//! Covers:
//! - Idempotent passes and one CACHED row per filename
//! - Retention against a controlled clock
//! - Per-file failure isolation and cleanup of interrupted copies
//! - Revoked source access
//! - The busy flag and event reporting

mod common;

use chrono::Duration;
use common::{FakeSource, Harness, DAY_MS, NOW};
use core_library::{Category, StatusRepository};
use core_runtime::events::{CoreEvent, LibraryEvent, SyncEvent};
use core_sync::SyncError;
use std::path::Path;
use std::sync::Arc;

const FIVE: [&str; 5] = ["1.jpg", "2.mp4", "3.jpg", "4.png", "5.mp4"];

#[tokio::test]
async fn test_first_pass_caches_every_file() {
    let h = Harness::new(FakeSource::with_files(&FIVE)).await;

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (5, 0));
    assert!(report.source_available);
    assert_eq!(report.newly_cached.len(), 5);
    assert_eq!(h.count(Category::Cached).await, 5);
    assert_eq!(h.cache_entries(), 5);

    let record = h
        .statuses
        .find_by_filename("3.jpg", Category::Cached)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.recorded_at, NOW);
    assert_eq!(record.discovered_at, NOW - 60_000);
    assert_eq!(record.origin_locator, FakeSource::locator("3.jpg"));
    assert_eq!(record.size_bytes, "bytes of 3.jpg".len() as i64);
    assert_eq!(
        tokio::fs::read(&record.local_path).await.unwrap(),
        b"bytes of 3.jpg"
    );
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let h = Harness::new(FakeSource::with_files(&FIVE)).await;

    h.coordinator.synchronize().await.unwrap();
    let opens_after_first = h.source.opens();
    let second = h.coordinator.synchronize().await.unwrap();

    assert_eq!(second.counts(), (0, 5));
    assert!(second.newly_cached.is_empty());
    assert_eq!(h.source.opens(), opens_after_first, "no file re-read");
    for name in FIVE {
        assert_eq!(h.rows_for(name, Category::Cached).await, 1);
    }
}

#[tokio::test]
async fn test_new_source_file_is_picked_up_later() {
    let h = Harness::new(FakeSource::with_files(&["a.jpg"])).await;
    h.coordinator.synchronize().await.unwrap();

    h.source.add("b.mp4", b"video");
    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (1, 1));
    assert_eq!(report.newly_cached[0].filename, "b.mp4");
}

#[tokio::test]
async fn test_concurrent_engines_never_duplicate_rows() {
    let h = Harness::new(FakeSource::with_files(&FIVE)).await;
    let other = h.second_coordinator();

    let (first, second) = tokio::join!(h.coordinator.synchronize(), other.synchronize());
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.copied + second.copied, 5);
    assert_eq!(first.skipped + second.skipped, 5);
    for name in FIVE {
        assert_eq!(h.rows_for(name, Category::Cached).await, 1, "{name}");
    }

    // Every surviving row still points at a file.
    for record in h.statuses.list_by_category(Category::Cached, None).await.unwrap() {
        assert!(Path::new(&record.local_path).exists(), "{}", record.filename);
    }

    let third = h.coordinator.synchronize().await.unwrap();
    assert_eq!(third.counts(), (0, 5));
}

#[tokio::test]
async fn test_busy_flag_rejects_overlapping_pass() {
    let h = Harness::new(FakeSource::with_files(&["a.jpg"])).await;
    h.source.hold_listing();

    let coordinator = Arc::clone(&h.coordinator);
    let running = tokio::spawn(async move { coordinator.synchronize().await });
    h.source.wait_for_listing().await;

    assert!(h.coordinator.is_busy());
    assert!(matches!(
        h.coordinator.synchronize().await,
        Err(SyncError::SyncInProgress)
    ));
    assert!(matches!(
        h.coordinator.run_retention().await,
        Err(SyncError::SyncInProgress)
    ));

    h.source.release_listing();
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.counts(), (1, 0));
    assert!(!h.coordinator.is_busy());
}

#[tokio::test]
async fn test_retention_removes_only_expired_records() {
    let h = Harness::new(FakeSource::default()).await;
    let ten_days = h.seed_cached("ten.jpg", NOW - 10 * DAY_MS).await;
    let eight_days = h.seed_cached("eight.mp4", NOW - 8 * DAY_MS).await;
    let one_day = h.seed_cached("one.jpg", NOW - DAY_MS).await;
    h.settings.set_retention_days(7).await.unwrap();

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.retention_deleted, 2);
    assert_eq!(report.counts(), (0, 0));
    assert!(!Path::new(&ten_days.local_path).exists());
    assert!(!Path::new(&eight_days.local_path).exists());
    assert!(Path::new(&one_day.local_path).exists());

    let remaining = h.statuses.list_by_category(Category::Cached, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, one_day.id);
}

#[tokio::test]
async fn test_retention_window_change_applies_on_next_pass() {
    let h = Harness::new(FakeSource::default()).await;
    h.seed_cached("a.jpg", NOW - 3 * DAY_MS).await;
    h.seed_cached("b.jpg", NOW - 2 * DAY_MS).await;

    assert_eq!(h.coordinator.run_retention().await.unwrap(), 0);

    h.settings.set_retention_days(1).await.unwrap();
    assert_eq!(h.coordinator.run_retention().await.unwrap(), 2);
    assert_eq!(h.count(Category::Cached).await, 0);
}

#[tokio::test]
async fn test_records_age_out_as_clock_advances() {
    let h = Harness::new(FakeSource::with_files(&["a.jpg"])).await;
    h.coordinator.synchronize().await.unwrap();

    h.clock.advance(Duration::days(7));
    let at_boundary = h.coordinator.synchronize().await.unwrap();
    assert_eq!(at_boundary.retention_deleted, 0, "cutoff is exclusive");

    h.clock.advance(Duration::milliseconds(1));
    let expired = h.coordinator.synchronize().await.unwrap();
    assert_eq!(expired.retention_deleted, 1);

    // Still in the source, so the pass after that caches it again.
    assert_eq!(h.coordinator.synchronize().await.unwrap().counts(), (1, 0));
}

#[tokio::test]
async fn test_failed_copy_is_isolated() {
    let source = FakeSource::with_files(&FIVE);
    source.fail_reads_of("3.jpg");
    let h = Harness::new(source).await;

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (4, 1));
    assert_eq!(h.rows_for("3.jpg", Category::Cached).await, 0);
    assert!(!h.layout.cache_dir().join("3.jpg").exists(), "partial copy removed");
    assert_eq!(h.count(Category::Cached).await, 4);
}

#[tokio::test]
async fn test_pass_clears_interrupted_copies() {
    let h = Harness::new(FakeSource::with_files(&["a.jpg"])).await;
    tokio::fs::create_dir_all(h.layout.cache_dir()).await.unwrap();
    let leftover = h.layout.cache_dir().join(".a.jpg.deadbeef.part");
    tokio::fs::write(&leftover, b"par").await.unwrap();

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (1, 0));
    assert!(!leftover.exists());
    assert_eq!(h.cache_entries(), 1);
}

#[tokio::test]
async fn test_zero_length_source_file_is_skipped() {
    let source = FakeSource::with_files(&["a.jpg"]);
    source.add("empty.jpg", b"");
    let h = Harness::new(source).await;

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (1, 1));
    assert_eq!(h.rows_for("empty.jpg", Category::Cached).await, 0);
}

#[tokio::test]
async fn test_revoked_source_changes_nothing() {
    let h = Harness::new(FakeSource::with_files(&FIVE)).await;
    h.coordinator.synchronize().await.unwrap();
    h.source.revoke();
    let mut events = h.events.subscribe();

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (0, 0));
    assert!(!report.source_available);
    assert_eq!(report.retention_deleted, 0);
    assert_eq!(h.count(Category::Cached).await, 5);
    assert_eq!(h.cache_entries(), 5);

    let mut saw_unavailable = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Sync(SyncEvent::SourceUnavailable { pass_id }) = event {
            assert_eq!(pass_id, report.pass_id);
            saw_unavailable = true;
        }
    }
    assert!(saw_unavailable);
}

#[tokio::test]
async fn test_retention_still_runs_without_source_access() {
    let h = Harness::new(FakeSource::default()).await;
    h.source.revoke();
    h.seed_cached("old.jpg", NOW - 30 * DAY_MS).await;
    h.seed_cached("new.jpg", NOW - DAY_MS).await;

    let report = h.coordinator.synchronize().await.unwrap();

    assert_eq!(report.counts(), (0, 0));
    assert_eq!(report.retention_deleted, 1);
    assert_eq!(h.count(Category::Cached).await, 1);
}

#[tokio::test]
async fn test_pass_emits_lifecycle_events() {
    let h = Harness::new(FakeSource::with_files(&["a.jpg"])).await;
    let mut events = h.events.subscribe();

    let report = h.coordinator.synchronize().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert!(matches!(
        received.first(),
        Some(CoreEvent::Sync(SyncEvent::Started { pass_id })) if *pass_id == report.pass_id
    ));
    assert!(received.iter().any(|e| matches!(
        e,
        CoreEvent::Library(LibraryEvent::StatusCached { filename, .. }) if filename == "a.jpg"
    )));
    assert!(received.iter().any(|e| matches!(
        e,
        CoreEvent::Sync(SyncEvent::RetentionCompleted { retention_days: 7, .. })
    )));
    assert!(matches!(
        received.last(),
        Some(CoreEvent::Sync(SyncEvent::Completed { copied: 1, skipped: 0, .. }))
    ));
}

#[tokio::test]
async fn test_closed_store_propagates() {
    let h = Harness::new(FakeSource::with_files(&["a.jpg"])).await;
    let mut events = h.events.subscribe();
    h.pool.close().await;

    let err = h.coordinator.synchronize().await.unwrap_err();
    assert!(matches!(err, SyncError::StoreUnavailable(_)));
    assert!(!h.coordinator.is_busy());

    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        saw_failed |= matches!(event, CoreEvent::Sync(SyncEvent::Failed { .. }));
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn test_remove_duplicates_reports_count() {
    let h = Harness::new(FakeSource::default()).await;
    let record = h.seed_cached("a.jpg", NOW).await;
    sqlx::query(
        "INSERT INTO statuses (filename, origin_locator, local_path, media_kind, category, discovered_at, recorded_at, size_bytes)
         SELECT filename, origin_locator, local_path, media_kind, category, discovered_at, recorded_at, size_bytes
         FROM statuses WHERE id = ?",
    )
    .bind(record.id)
    .execute(&h.pool)
    .await
    .unwrap();
    assert_eq!(h.rows_for("a.jpg", Category::Cached).await, 2);

    assert_eq!(h.coordinator.remove_duplicates().await.unwrap(), 1);
    assert_eq!(h.rows_for("a.jpg", Category::Cached).await, 1);
    assert!(Path::new(&record.local_path).exists(), "shared file kept");
}
