//! Record removal shared by retention and user deletes
//!
//! The row is authoritative: once it is gone the record is untracked, whether
//! or not the file could be removed.

use crate::{transfer, Result};
use bridge_traits::media::mime_type;
use bridge_traits::scanner::MediaScanner;
use bridge_traits::storage::FileSystemAccess;
use core_library::{DownloadMarkerRepository, StatusRecord, StatusRepository};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct RecordRemover {
    file_system: Arc<dyn FileSystemAccess>,
    statuses: Arc<dyn StatusRepository>,
    downloads: Arc<dyn DownloadMarkerRepository>,
    scanner: Arc<dyn MediaScanner>,
    event_bus: EventBus,
}

impl RecordRemover {
    pub fn new(
        file_system: Arc<dyn FileSystemAccess>,
        statuses: Arc<dyn StatusRepository>,
        downloads: Arc<dyn DownloadMarkerRepository>,
        scanner: Arc<dyn MediaScanner>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            file_system,
            statuses,
            downloads,
            scanner,
            event_bus,
        }
    }

    /// Remove `record`'s file, row and (for SAVED) download marker.
    ///
    /// Returns whether a row was deleted. A missing or undeletable file does
    /// not affect the outcome.
    #[instrument(skip(self, record), fields(id = %record.id, category = %record.category))]
    pub async fn remove(&self, record: &StatusRecord) -> Result<bool> {
        let policy = record.category.policy();
        let path = Path::new(&record.local_path);

        let has_file = !record.local_path.is_empty();
        if has_file {
            transfer::discard(self.file_system.as_ref(), path).await;
        }

        let removed = match self.statuses.delete(record).await {
            Ok(removed) => removed,
            Err(e) => {
                if has_file {
                    warn!(
                        filename = %record.filename,
                        path = %record.local_path,
                        error = %e,
                        "File removed but row remains; record points at a missing file"
                    );
                }
                return Err(e.into());
            }
        };

        if policy.clears_download_marker {
            self.downloads.remove(&record.filename).await?;
        }

        if !removed {
            debug!("Record was already gone");
            return Ok(false);
        }

        self.event_bus
            .emit(CoreEvent::Library(LibraryEvent::StatusDeleted {
                id: record.id.value(),
                filename: record.filename.clone(),
                category: record.category.to_string(),
            }))
            .ok();

        if policy.gallery_visible {
            self.scanner
                .scan(path, Some(mime_type(&record.filename, record.media_kind)))
                .await;
        }

        debug!(filename = %record.filename, "Removed status record");
        Ok(true)
    }
}
