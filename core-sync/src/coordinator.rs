//! # Sync Coordinator
//!
//! Brings the local CACHED set into agreement with the source directory and
//! enforces the retention window.
//!
//! ## Workflow
//!
//! 1. Take the busy flag; a concurrent pass is rejected with
//!    [`SyncError::SyncInProgress`]
//! 2. Check that the source grant is usable, then list its files
//! 3. For each file without a CACHED row: copy it into the cache directory,
//!    verify it, and insert a CACHED record
//! 4. Delete CACHED records older than the retention window, with their files
//! 5. Report `(copied, skipped)` plus retention and timing details
//!
//! Individual file failures are counted as skips. Only an unavailable store
//! ends a pass early.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let report = coordinator.synchronize().await?;
//! let (copied, skipped) = report.counts();
//! ```

use crate::removal::RecordRemover;
use crate::transfer::{self, copy_verified};
use crate::{layout::StorageLayout, Result, SyncError};
use bridge_traits::source::{SourceDirectory, SourceFile};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use core_library::{Category, NewStatusRecord, StatusRecord, StatusRepository};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
use core_runtime::settings::{RetentionDays, StatusSettings};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Outcome of one synchronization pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub pass_id: String,
    /// Files newly copied and recorded as CACHED
    pub copied: u64,
    /// Files already cached, or whose copy or insert did not go through
    pub skipped: u64,
    /// CACHED records removed by retention
    pub retention_deleted: u64,
    /// Whether the source grant was usable during this pass
    pub source_available: bool,
    /// Records created during this pass
    pub newly_cached: Vec<StatusRecord>,
    /// Epoch ms
    pub started_at: i64,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn counts(&self) -> (u64, u64) {
        (self.copied, self.skipped)
    }
}

enum FileOutcome {
    Cached(StatusRecord),
    Skipped,
}

/// Cleared when dropped, so an aborted pass never leaves the flag set.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Synchronization engine for one store and cache directory
pub struct SyncCoordinator {
    source: Arc<dyn SourceDirectory>,
    file_system: Arc<dyn FileSystemAccess>,
    statuses: Arc<dyn StatusRepository>,
    remover: Arc<RecordRemover>,
    settings: StatusSettings,
    layout: StorageLayout,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    busy: AtomicBool,
}

impl SyncCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn SourceDirectory>,
        file_system: Arc<dyn FileSystemAccess>,
        statuses: Arc<dyn StatusRepository>,
        remover: Arc<RecordRemover>,
        settings: StatusSettings,
        layout: StorageLayout,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            source,
            file_system,
            statuses,
            remover,
            settings,
            layout,
            clock,
            event_bus,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a pass is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| SyncError::SyncInProgress)
    }

    fn emit(&self, event: CoreEvent) {
        self.event_bus.emit(event).ok();
    }

    /// Run one synchronization pass.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SyncInProgress`] if another pass is active
    /// - [`SyncError::StoreUnavailable`] if the status store fails
    #[instrument(skip(self))]
    pub async fn synchronize(&self) -> Result<SyncReport> {
        let _guard = self.try_begin()?;

        let pass_id = Uuid::new_v4().to_string();
        let started_at = self.clock.unix_timestamp_millis();
        let timer = Instant::now();

        info!(pass_id = %pass_id, "Starting synchronization pass");
        self.emit(CoreEvent::Sync(SyncEvent::Started {
            pass_id: pass_id.clone(),
        }));

        match self.run_pass(&pass_id, started_at).await {
            Ok(mut report) => {
                report.duration_ms = timer.elapsed().as_millis() as u64;
                info!(
                    pass_id = %pass_id,
                    copied = report.copied,
                    skipped = report.skipped,
                    retention_deleted = report.retention_deleted,
                    duration_ms = report.duration_ms,
                    "Synchronization pass completed"
                );
                self.emit(CoreEvent::Sync(SyncEvent::Completed {
                    pass_id,
                    copied: report.copied,
                    skipped: report.skipped,
                    retention_deleted: report.retention_deleted,
                    duration_ms: report.duration_ms,
                }));
                Ok(report)
            }
            Err(e) => {
                error!(pass_id = %pass_id, error = %e, "Synchronization pass failed");
                self.emit(CoreEvent::Sync(SyncEvent::Failed {
                    pass_id,
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    async fn run_pass(&self, pass_id: &str, started_at: i64) -> Result<SyncReport> {
        let mut copied = 0u64;
        let mut skipped = 0u64;
        let mut newly_cached = Vec::new();

        transfer::sweep_staging(self.file_system.as_ref(), self.layout.cache_dir()).await;

        let source_available = self.source.is_accessible().await;
        if source_available {
            let files = self.source.list_files().await;
            debug!(count = files.len(), "Source listing");

            for file in &files {
                match self.cache_file(file).await? {
                    FileOutcome::Cached(record) => {
                        copied += 1;
                        newly_cached.push(record);
                    }
                    FileOutcome::Skipped => skipped += 1,
                }
            }
        } else {
            warn!(pass_id = %pass_id, "Source directory unavailable; skipping copy phase");
            self.emit(CoreEvent::Sync(SyncEvent::SourceUnavailable {
                pass_id: pass_id.to_string(),
            }));
        }

        let retention_deleted = self.apply_retention().await?;

        Ok(SyncReport {
            pass_id: pass_id.to_string(),
            copied,
            skipped,
            retention_deleted,
            source_available,
            newly_cached,
            started_at,
            duration_ms: 0,
        })
    }

    #[instrument(skip(self, file), fields(filename = %file.filename))]
    async fn cache_file(&self, file: &SourceFile) -> Result<FileOutcome> {
        if self.statuses.exists(&file.filename, Category::Cached).await? {
            return Ok(FileOutcome::Skipped);
        }

        let Some(destination) =
            self.layout
                .destination(Category::Cached, file.media_kind, &file.filename)
        else {
            warn!("Unusable source filename");
            return Ok(FileOutcome::Skipped);
        };

        let reader = match self.source.open_read(&file.locator).await {
            Ok(reader) => reader,
            Err(e) => {
                warn!(error = %e, "Failed to open source file");
                return Ok(FileOutcome::Skipped);
            }
        };

        let size = match copy_verified(reader, self.file_system.as_ref(), &destination).await {
            Ok(size) => size,
            Err(e) => {
                warn!(error = %e, "Failed to copy source file");
                return Ok(FileOutcome::Skipped);
            }
        };

        let local_path = destination.to_string_lossy().into_owned();
        let record = NewStatusRecord {
            filename: file.filename.clone(),
            origin_locator: file.locator.clone(),
            local_path: local_path.clone(),
            media_kind: file.media_kind,
            category: Category::Cached,
            discovered_at: file.last_modified,
            recorded_at: self.clock.unix_timestamp_millis(),
            size_bytes: size as i64,
        };

        match self.statuses.insert(&record).await {
            Ok(stored) => {
                debug!(id = %stored.id, size, "Cached status");
                self.emit(CoreEvent::Library(LibraryEvent::StatusCached {
                    id: stored.id.value(),
                    filename: stored.filename.clone(),
                    media_kind: stored.media_kind.to_string(),
                }));
                Ok(FileOutcome::Cached(stored))
            }
            Err(e) if e.is_conflict() => {
                // The winner may already point at this same path.
                let winner = self
                    .statuses
                    .find_by_filename(&file.filename, Category::Cached)
                    .await?;
                if winner.map_or(true, |w| w.local_path != local_path) {
                    transfer::discard(self.file_system.as_ref(), &destination).await;
                }
                debug!("Lost insert race; skipping");
                Ok(FileOutcome::Skipped)
            }
            Err(e) => {
                transfer::discard(self.file_system.as_ref(), &destination).await;
                Err(e.into())
            }
        }
    }

    /// Delete expired CACHED records outside of a full pass.
    ///
    /// # Errors
    ///
    /// [`SyncError::SyncInProgress`] while a pass is running (it applies
    /// retention itself), or [`SyncError::StoreUnavailable`].
    #[instrument(skip(self))]
    pub async fn run_retention(&self) -> Result<u64> {
        let _guard = self.try_begin()?;
        self.apply_retention().await
    }

    async fn apply_retention(&self) -> Result<u64> {
        let retention = match self.settings.retention_days().await {
            Ok(retention) => retention,
            Err(e) => {
                warn!(error = %e, "Failed to read retention window; using default");
                RetentionDays::default()
            }
        };
        let cutoff = retention.cutoff(self.clock.unix_timestamp_millis());

        let expired = self
            .statuses
            .list_older_than(Category::Cached, cutoff)
            .await?;

        let mut deleted = 0u64;
        for record in &expired {
            if self.remover.remove(record).await? {
                deleted += 1;
            }
        }

        if deleted > 0 {
            info!(deleted, retention = %retention, "Removed expired cached statuses");
        }
        self.emit(CoreEvent::Sync(SyncEvent::RetentionCompleted {
            deleted,
            retention_days: retention.days(),
            cutoff,
        }));
        Ok(deleted)
    }

    /// Collapse historical duplicate rows. Files are shared by the
    /// duplicates and are left alone.
    #[instrument(skip(self))]
    pub async fn remove_duplicates(&self) -> Result<u64> {
        let count = self.statuses.remove_duplicate_rows().await?;
        if count > 0 {
            info!(count, "Removed duplicate status rows");
            self.emit(CoreEvent::Library(LibraryEvent::DuplicatesRemoved { count }));
        }
        Ok(count)
    }
}
