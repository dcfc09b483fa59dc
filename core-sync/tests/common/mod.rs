//! Shared fixtures for synchronization and promotion tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{SqliteSettingsStore, TokioFileSystem, TracingMediaScanner};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::MediaKind;
use bridge_traits::scanner::MediaScanner;
use bridge_traits::source::{SourceDirectory, SourceFile};
use bridge_traits::time::ManualClock;
use core_library::{
    create_test_pool, Category, NewStatusRecord, SqliteDownloadMarkerRepository,
    SqliteStatusRepository, StatusRecord, StatusRepository,
};
use core_runtime::events::EventBus;
use core_runtime::settings::StatusSettings;
use core_sync::{PromotionService, RecordRemover, StorageLayout, SyncCoordinator};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::Notify;

pub const DAY_MS: i64 = 86_400_000;
pub const NOW: i64 = 1_700_000_000_000;

/// In-memory source directory with switchable access and per-file failures
#[derive(Default)]
pub struct FakeSource {
    files: Mutex<Vec<(SourceFile, Vec<u8>)>>,
    failing: Mutex<HashSet<String>>,
    revoked: AtomicBool,
    opens: AtomicUsize,
    hold_listing: AtomicBool,
    listing_entered: Notify,
    listing_released: Notify,
}

impl FakeSource {
    pub fn with_files(names: &[&str]) -> Self {
        let source = Self::default();
        for name in names {
            source.add(name, format!("bytes of {name}").as_bytes());
        }
        source
    }

    pub fn add(&self, filename: &str, bytes: &[u8]) {
        let file = SourceFile {
            filename: filename.to_string(),
            locator: format!("fake://{filename}"),
            media_kind: MediaKind::from_filename(filename).unwrap_or(MediaKind::Image),
            size_bytes: bytes.len() as u64,
            last_modified: NOW - 60_000,
        };
        self.files.lock().unwrap().push((file, bytes.to_vec()));
    }

    pub fn locator(filename: &str) -> String {
        format!("fake://{filename}")
    }

    /// Reads of this file fail part-way with an I/O error.
    pub fn fail_reads_of(&self, filename: &str) {
        self.failing.lock().unwrap().insert(filename.to_string());
    }

    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Make the next listing block until [`FakeSource::release_listing`].
    pub fn hold_listing(&self) {
        self.hold_listing.store(true, Ordering::SeqCst);
    }

    pub async fn wait_for_listing(&self) {
        self.listing_entered.notified().await;
    }

    pub fn release_listing(&self) {
        self.listing_released.notify_one();
    }
}

/// Yields a few bytes, then fails.
struct FailingReader {
    sent: bool,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "read interrupted")));
        }
        self.sent = true;
        buf.put_slice(b"par");
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl SourceDirectory for FakeSource {
    async fn is_accessible(&self) -> bool {
        !self.revoked.load(Ordering::SeqCst)
    }

    async fn list_files(&self) -> Vec<SourceFile> {
        if self.revoked.load(Ordering::SeqCst) {
            return Vec::new();
        }
        if self.hold_listing.swap(false, Ordering::SeqCst) {
            self.listing_entered.notify_one();
            self.listing_released.notified().await;
        }
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(file, _)| file.clone())
            .collect()
    }

    async fn open_read(&self, locator: &str) -> BridgeResult<Box<dyn AsyncRead + Send + Unpin>> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("source directory".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);

        let files = self.files.lock().unwrap();
        let (file, bytes) = files
            .iter()
            .find(|(file, _)| file.locator == locator)
            .ok_or_else(|| BridgeError::NotFound(locator.to_string()))?;

        if self.failing.lock().unwrap().contains(&file.filename) {
            return Ok(Box::new(FailingReader { sent: false }));
        }
        Ok(Box::new(io::Cursor::new(bytes.clone())))
    }
}

/// Every component wired over one in-memory store and a temp directory
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub pool: SqlitePool,
    pub source: Arc<FakeSource>,
    pub fs: Arc<TokioFileSystem>,
    pub statuses: Arc<SqliteStatusRepository>,
    pub downloads: Arc<SqliteDownloadMarkerRepository>,
    pub settings: StatusSettings,
    pub clock: Arc<ManualClock>,
    pub events: EventBus,
    pub layout: StorageLayout,
    pub scanner: Arc<dyn MediaScanner>,
    pub remover: Arc<RecordRemover>,
    pub coordinator: Arc<SyncCoordinator>,
    pub promotion: Arc<PromotionService>,
}

impl Harness {
    pub async fn new(source: FakeSource) -> Self {
        Self::with_scanner(source, Arc::new(TracingMediaScanner::new())).await
    }

    pub async fn with_scanner(source: FakeSource, scanner: Arc<dyn MediaScanner>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_test_pool().await.unwrap();
        let source = Arc::new(source);
        let fs = Arc::new(TokioFileSystem::new());
        let statuses = Arc::new(SqliteStatusRepository::new(pool.clone()));
        let downloads = Arc::new(SqliteDownloadMarkerRepository::new(pool.clone()));
        let settings = StatusSettings::new(Arc::new(
            SqliteSettingsStore::from_pool(pool.clone()).await.unwrap(),
        ));
        let clock = Arc::new(ManualClock::from_millis(NOW));
        let events = EventBus::default();
        let layout = StorageLayout::new(dir.path().join("cache"), dir.path().join("saved"));

        let remover = Arc::new(RecordRemover::new(
            fs.clone(),
            statuses.clone(),
            downloads.clone(),
            scanner.clone(),
            events.clone(),
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            source.clone(),
            fs.clone(),
            statuses.clone(),
            remover.clone(),
            settings.clone(),
            layout.clone(),
            clock.clone(),
            events.clone(),
        ));
        let promotion = Arc::new(PromotionService::new(
            source.clone(),
            fs.clone(),
            statuses.clone(),
            downloads.clone(),
            remover.clone(),
            scanner.clone(),
            layout.clone(),
            clock.clone(),
            events.clone(),
        ));

        Self {
            dir,
            pool,
            source,
            fs,
            statuses,
            downloads,
            settings,
            clock,
            events,
            layout,
            scanner,
            remover,
            coordinator,
            promotion,
        }
    }

    /// A second engine over the same store and directories, standing in for
    /// another process.
    pub fn second_coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(
            self.source.clone(),
            self.fs.clone(),
            self.statuses.clone(),
            self.remover.clone(),
            self.settings.clone(),
            self.layout.clone(),
            self.clock.clone(),
            self.events.clone(),
        )
    }

    pub fn second_promotion(&self) -> PromotionService {
        PromotionService::new(
            self.source.clone(),
            self.fs.clone(),
            self.statuses.clone(),
            self.downloads.clone(),
            self.remover.clone(),
            self.scanner.clone(),
            self.layout.clone(),
            self.clock.clone(),
            self.events.clone(),
        )
    }

    /// Store a CACHED record with a real file recorded at `recorded_at`.
    pub async fn seed_cached(&self, filename: &str, recorded_at: i64) -> StatusRecord {
        let path = self.layout.cache_dir().join(filename);
        tokio::fs::create_dir_all(self.layout.cache_dir())
            .await
            .unwrap();
        tokio::fs::write(&path, b"cached bytes").await.unwrap();

        self.statuses
            .insert(&NewStatusRecord {
                filename: filename.to_string(),
                origin_locator: FakeSource::locator(filename),
                local_path: path.to_string_lossy().into_owned(),
                media_kind: MediaKind::from_filename(filename).unwrap_or(MediaKind::Image),
                category: Category::Cached,
                discovered_at: recorded_at,
                recorded_at,
                size_bytes: 12,
            })
            .await
            .unwrap()
    }

    pub async fn rows_for(&self, filename: &str, category: Category) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM statuses WHERE filename = ? AND category = ?")
            .bind(filename)
            .bind(category.as_str())
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn count(&self, category: Category) -> u64 {
        self.statuses.count_by_category(category).await.unwrap()
    }

    pub fn cache_entries(&self) -> usize {
        std::fs::read_dir(self.layout.cache_dir())
            .map(|rd| rd.count())
            .unwrap_or(0)
    }
}
