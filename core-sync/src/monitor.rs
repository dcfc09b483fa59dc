//! # Background Sync Monitor
//!
//! A single background task that runs a synchronization pass immediately,
//! then on every interval tick and on every [`SyncMonitor::trigger`].
//!
//! A pass rejected because another one is active is skipped. Any other
//! failure is logged and the loop waits for the next tick, so an unavailable
//! store never turns into a crash loop.

use crate::coordinator::{SyncCoordinator, SyncReport};
use crate::promotion::{PromotionOutcome, PromotionService};
use crate::{Result, SyncError};
use core_runtime::settings::StatusSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct MonitorInner {
    coordinator: Arc<SyncCoordinator>,
    promotion: Arc<PromotionService>,
    settings: StatusSettings,
    trigger: Notify,
    last_report: RwLock<Option<SyncReport>>,
}

struct RunningTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct SyncMonitor {
    inner: Arc<MonitorInner>,
    interval: Duration,
    task: Mutex<Option<RunningTask>>,
}

impl SyncMonitor {
    pub fn new(
        coordinator: Arc<SyncCoordinator>,
        promotion: Arc<PromotionService>,
        settings: StatusSettings,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                coordinator,
                promotion,
                settings,
                trigger: Notify::new(),
                last_report: RwLock::new(None),
            }),
            interval,
            task: Mutex::new(None),
        }
    }

    /// Spawn the background loop. Returns `false` if it is already running.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.inner),
            self.interval,
            token.clone(),
        ));
        *task = Some(RunningTask { token, handle });

        info!(interval_secs = self.interval.as_secs(), "Sync monitor started");
        true
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        task.token.cancel();
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Sync monitor task ended abnormally");
        }
        info!("Sync monitor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Ask the running loop for a pass as soon as possible.
    pub fn trigger(&self) {
        self.inner.trigger.notify_one();
    }

    /// Run a pass on the caller's task, including auto-save.
    ///
    /// `Ok(None)` when another pass was already running.
    pub async fn run_now(&self) -> Result<Option<SyncReport>> {
        self.inner.run_pass().await
    }

    pub async fn last_report(&self) -> Option<SyncReport> {
        self.inner.last_report.read().await.clone()
    }
}

impl MonitorInner {
    async fn run_pass(&self) -> Result<Option<SyncReport>> {
        let report = match self.coordinator.synchronize().await {
            Ok(report) => report,
            Err(SyncError::SyncInProgress) => {
                debug!("Pass already running; skipping trigger");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        self.auto_save(&report).await?;
        *self.last_report.write().await = Some(report.clone());
        Ok(Some(report))
    }

    async fn auto_save(&self, report: &SyncReport) -> Result<u64> {
        if report.newly_cached.is_empty() {
            return Ok(0);
        }
        let enabled = match self.settings.auto_save_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(error = %e, "Failed to read auto-save setting");
                false
            }
        };
        if !enabled {
            return Ok(0);
        }

        let mut saved = 0u64;
        for record in &report.newly_cached {
            match self.promotion.promote_cached(record).await? {
                PromotionOutcome::Saved(_) => saved += 1,
                PromotionOutcome::AlreadySaved => {}
                PromotionOutcome::Failed { reason } => {
                    warn!(filename = %record.filename, reason = %reason, "Auto-save failed");
                }
            }
        }
        if saved > 0 {
            info!(saved, "Auto-saved new statuses");
        }
        Ok(saved)
    }
}

async fn run_loop(inner: Arc<MonitorInner>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
            _ = inner.trigger.notified() => debug!("On-demand sync requested"),
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = inner.run_pass() => {
                if let Err(e) = result {
                    error!(error = %e, "Background sync failed; retrying next interval");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StorageLayout;
    use crate::removal::RecordRemover;
    use bridge_desktop::{
        LocalSourceDirectory, SqliteSettingsStore, TokioFileSystem, TracingMediaScanner,
    };
    use bridge_traits::time::SystemClock;
    use core_library::{
        create_test_pool, Category, SqliteDownloadMarkerRepository, SqliteStatusRepository,
        StatusRepository,
    };
    use core_runtime::events::EventBus;

    struct Fixture {
        source_dir: tempfile::TempDir,
        _storage_dir: tempfile::TempDir,
        statuses: Arc<SqliteStatusRepository>,
        settings: StatusSettings,
        monitor: SyncMonitor,
    }

    async fn fixture(interval: Duration) -> Fixture {
        let source_dir = tempfile::tempdir().unwrap();
        let storage_dir = tempfile::tempdir().unwrap();
        let pool = create_test_pool().await.unwrap();

        let statuses = Arc::new(SqliteStatusRepository::new(pool.clone()));
        let downloads = Arc::new(SqliteDownloadMarkerRepository::new(pool.clone()));
        let settings = StatusSettings::new(Arc::new(
            SqliteSettingsStore::from_pool(pool).await.unwrap(),
        ));
        let fs = Arc::new(TokioFileSystem::new());
        let scanner = Arc::new(TracingMediaScanner::new());
        let source = Arc::new(LocalSourceDirectory::new(source_dir.path()));
        let layout = StorageLayout::new(
            storage_dir.path().join("cache"),
            storage_dir.path().join("saved"),
        );
        let events = EventBus::default();
        let clock = Arc::new(SystemClock);

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
            source, fs, statuses.clone(), downloads, remover, scanner, layout, clock, events,
        ));

        Fixture {
            source_dir,
            _storage_dir: storage_dir,
            statuses,
            settings: settings.clone(),
            monitor: SyncMonitor::new(coordinator, promotion, settings, interval),
        }
    }

    #[tokio::test]
    async fn test_run_now_caches_and_records_report() {
        let f = fixture(Duration::from_secs(3600)).await;
        tokio::fs::write(f.source_dir.path().join("a.jpg"), b"a")
            .await
            .unwrap();

        let report = f.monitor.run_now().await.unwrap().unwrap();
        assert_eq!(report.counts(), (1, 0));
        assert_eq!(f.monitor.last_report().await, Some(report));
        assert_eq!(
            f.statuses.count_by_category(Category::Saved).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_auto_save_promotes_new_records() {
        let f = fixture(Duration::from_secs(3600)).await;
        f.settings.set_auto_save(true).await.unwrap();
        tokio::fs::write(f.source_dir.path().join("a.jpg"), b"a")
            .await
            .unwrap();
        tokio::fs::write(f.source_dir.path().join("b.mp4"), b"b")
            .await
            .unwrap();

        f.monitor.run_now().await.unwrap();
        assert_eq!(
            f.statuses.count_by_category(Category::Saved).await.unwrap(),
            2
        );

        // Nothing new on the second pass, so nothing is promoted again.
        let report = f.monitor.run_now().await.unwrap().unwrap();
        assert!(report.newly_cached.is_empty());
        assert_eq!(
            f.statuses.count_by_category(Category::Saved).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_background_loop_runs_and_stops() {
        let f = fixture(Duration::from_secs(3600)).await;
        tokio::fs::write(f.source_dir.path().join("a.jpg"), b"a")
            .await
            .unwrap();

        assert!(f.monitor.start().await);
        assert!(!f.monitor.start().await);
        assert!(f.monitor.is_running().await);

        // The first tick fires immediately.
        let mut waited = 0;
        while f.monitor.last_report().await.is_none() && waited < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        assert_eq!(f.monitor.last_report().await.unwrap().counts(), (1, 0));

        tokio::fs::write(f.source_dir.path().join("b.jpg"), b"b")
            .await
            .unwrap();
        f.monitor.trigger();

        let mut waited = 0;
        while f.statuses.count_by_category(Category::Cached).await.unwrap() < 2 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        assert_eq!(
            f.statuses.count_by_category(Category::Cached).await.unwrap(),
            2
        );

        f.monitor.stop().await;
        assert!(!f.monitor.is_running().await);
    }
}
