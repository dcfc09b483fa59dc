//! # Promotion Service
//!
//! Copies a LIVE or CACHED status into permanent, gallery-visible storage and
//! records it as SAVED plus a download marker, at most once per filename.
//!
//! Expected failures (unreadable source, unwritable destination) are reported
//! as [`PromotionOutcome::Failed`] and leave nothing behind. Only an
//! unavailable store is returned as an error.

use crate::removal::RecordRemover;
use crate::transfer::{self, copy_verified, TransferError};
use crate::{layout::StorageLayout, Result};
use bridge_traits::media::{mime_type, MediaKind};
use bridge_traits::scanner::MediaScanner;
use bridge_traits::source::{SourceDirectory, SourceFile};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use core_library::{
    Category, DownloadMarker, DownloadMarkerRepository, NewStatusRecord, StatusId, StatusRecord,
    StatusRepository,
};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// Result of a promotion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// A new SAVED record was created
    Saved(StatusRecord),
    /// A SAVED record already existed; nothing was copied
    AlreadySaved,
    /// Nothing was stored
    Failed { reason: String },
}

impl PromotionOutcome {
    /// `Saved` and `AlreadySaved` both count as success.
    pub fn is_success(&self) -> bool {
        !matches!(self, PromotionOutcome::Failed { .. })
    }

    fn failed(reason: impl Into<String>) -> Self {
        PromotionOutcome::Failed {
            reason: reason.into(),
        }
    }
}

/// Where promoted bytes are read from
enum Origin<'a> {
    Source(&'a str),
    Local(&'a Path),
}

struct PromotionRequest<'a> {
    filename: &'a str,
    media_kind: MediaKind,
    origin_locator: &'a str,
    discovered_at: Option<i64>,
    origin: Origin<'a>,
}

pub struct PromotionService {
    source: Arc<dyn SourceDirectory>,
    file_system: Arc<dyn FileSystemAccess>,
    statuses: Arc<dyn StatusRepository>,
    downloads: Arc<dyn DownloadMarkerRepository>,
    remover: Arc<RecordRemover>,
    scanner: Arc<dyn MediaScanner>,
    layout: StorageLayout,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PromotionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn SourceDirectory>,
        file_system: Arc<dyn FileSystemAccess>,
        statuses: Arc<dyn StatusRepository>,
        downloads: Arc<dyn DownloadMarkerRepository>,
        remover: Arc<RecordRemover>,
        scanner: Arc<dyn MediaScanner>,
        layout: StorageLayout,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            source,
            file_system,
            statuses,
            downloads,
            remover,
            scanner,
            layout,
            clock,
            event_bus,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Promote a file straight from the source directory.
    #[instrument(skip(self, source_locator))]
    pub async fn promote(
        &self,
        filename: &str,
        source_locator: &str,
        media_kind: MediaKind,
    ) -> Result<PromotionOutcome> {
        self.run(PromotionRequest {
            filename,
            media_kind,
            origin_locator: source_locator,
            discovered_at: None,
            origin: Origin::Source(source_locator),
        })
        .await
    }

    /// Promote a source listing entry, keeping its modification time.
    pub async fn promote_live(&self, file: &SourceFile) -> Result<PromotionOutcome> {
        self.run(PromotionRequest {
            filename: &file.filename,
            media_kind: file.media_kind,
            origin_locator: &file.locator,
            discovered_at: Some(file.last_modified),
            origin: Origin::Source(&file.locator),
        })
        .await
    }

    /// Promote a CACHED record from its local copy.
    #[instrument(skip(self, record), fields(filename = %record.filename))]
    pub async fn promote_cached(&self, record: &StatusRecord) -> Result<PromotionOutcome> {
        match record.category {
            Category::Cached => {}
            Category::Saved => return Ok(PromotionOutcome::AlreadySaved),
            Category::Live => {
                return Ok(PromotionOutcome::failed(
                    "live statuses are promoted from the source directory",
                ))
            }
        }

        self.run(PromotionRequest {
            filename: &record.filename,
            media_kind: record.media_kind,
            origin_locator: &record.origin_locator,
            discovered_at: Some(record.discovered_at),
            origin: Origin::Local(Path::new(&record.local_path)),
        })
        .await
    }

    /// Serializes promotions of the same filename within this process.
    async fn lock_filename(&self, filename: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(in_flight.entry(filename.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    async fn open(
        &self,
        origin: &Origin<'_>,
    ) -> std::result::Result<Box<dyn AsyncRead + Send + Unpin>, TransferError> {
        let reader = match origin {
            Origin::Source(locator) => self.source.open_read(locator).await,
            Origin::Local(path) => self.file_system.open_read_stream(path).await,
        };
        reader.map_err(TransferError::Source)
    }

    async fn run(&self, request: PromotionRequest<'_>) -> Result<PromotionOutcome> {
        let filename = request.filename;
        let _lock = self.lock_filename(filename).await;

        if self.statuses.exists(filename, Category::Saved).await? {
            debug!(filename, "Already saved");
            return Ok(PromotionOutcome::AlreadySaved);
        }

        let Some(destination) = self
            .layout
            .destination(Category::Saved, request.media_kind, filename)
        else {
            return Ok(PromotionOutcome::failed(format!(
                "unusable filename: {filename}"
            )));
        };

        let copied = match self.open(&request.origin).await {
            Ok(reader) => copy_verified(reader, self.file_system.as_ref(), &destination).await,
            Err(e) => Err(e),
        };
        let size = match copied {
            Ok(size) => size,
            Err(e) => {
                warn!(filename, error = %e, "Promotion copy failed");
                return Ok(PromotionOutcome::failed(e.to_string()));
            }
        };

        let now = self.clock.unix_timestamp_millis();
        let saved_locator = destination.to_string_lossy().into_owned();
        let new_record = NewStatusRecord {
            filename: filename.to_string(),
            origin_locator: request.origin_locator.to_string(),
            local_path: saved_locator.clone(),
            media_kind: request.media_kind,
            category: Category::Saved,
            discovered_at: request.discovered_at.unwrap_or(now),
            recorded_at: now,
            size_bytes: size as i64,
        };

        let record = match self.statuses.insert(&new_record).await {
            Ok(record) => record,
            Err(e) if e.is_conflict() => {
                debug!(filename, "Lost save race");
                self.discard_unless_winner(filename, &destination).await;
                return Ok(PromotionOutcome::AlreadySaved);
            }
            Err(e) => {
                transfer::discard(self.file_system.as_ref(), &destination).await;
                return Err(e.into());
            }
        };

        let marker = DownloadMarker::new(filename, request.origin_locator, &saved_locator, now);
        if let Err(e) = self.downloads.mark_downloaded(&marker).await {
            self.roll_back(&record, &destination).await;
            return Err(e.into());
        }

        self.scanner
            .scan(&destination, Some(mime_type(filename, request.media_kind)))
            .await;
        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::StatusSaved {
                id: record.id.value(),
                filename: record.filename.clone(),
                media_kind: record.media_kind.to_string(),
                saved_locator,
            }))
            .ok();

        info!(filename, id = %record.id, size, "Saved status");
        Ok(PromotionOutcome::Saved(record))
    }

    /// After losing an insert race, drop our copy unless the winning record
    /// points at the same path. A shared path was overwritten by the winner's
    /// rename and holds bytes of the same source file.
    async fn discard_unless_winner(&self, filename: &str, destination: &Path) {
        let ours = destination.to_string_lossy();
        match self.statuses.find_by_filename(filename, Category::Saved).await {
            Ok(Some(winner)) if winner.local_path == ours => {}
            Ok(_) => transfer::discard(self.file_system.as_ref(), destination).await,
            Err(e) => {
                warn!(filename, error = %e, "Failed to look up winning record; keeping copy")
            }
        }
    }

    async fn roll_back(&self, record: &StatusRecord, destination: &Path) {
        if let Err(e) = self.statuses.delete(record).await {
            warn!(id = %record.id, error = %e, "Failed to roll back saved record");
        }
        transfer::discard(self.file_system.as_ref(), destination).await;
    }

    /// Delete a SAVED record, its file and its download marker.
    ///
    /// `false` if no SAVED record has this id.
    pub async fn delete_saved(&self, id: StatusId) -> Result<bool> {
        self.delete_in(id, Category::Saved).await
    }

    /// Delete a CACHED record and its file.
    ///
    /// `false` if no CACHED record has this id.
    pub async fn delete_cached(&self, id: StatusId) -> Result<bool> {
        self.delete_in(id, Category::Cached).await
    }

    #[instrument(skip(self))]
    async fn delete_in(&self, id: StatusId, category: Category) -> Result<bool> {
        match self.statuses.find_by_id(id).await? {
            Some(record) if record.category == category => self.remover.remove(&record).await,
            Some(_) => {
                debug!("Record belongs to another category");
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
