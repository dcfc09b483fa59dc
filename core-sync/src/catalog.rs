//! Read-side views for the three status categories

use crate::Result;
use bridge_traits::media::MediaKind;
use bridge_traits::source::{SourceDirectory, SourceFile};
use core_library::{Category, DownloadMarkerRepository, StatusRecord, StatusRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A file currently visible in the source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub file: SourceFile,
    /// The user already holds a permanent copy of this filename
    pub is_downloaded: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub live: u64,
    pub cached: u64,
    pub saved: u64,
}

pub struct StatusCatalog {
    source: Arc<dyn SourceDirectory>,
    statuses: Arc<dyn StatusRepository>,
    downloads: Arc<dyn DownloadMarkerRepository>,
}

impl StatusCatalog {
    pub fn new(
        source: Arc<dyn SourceDirectory>,
        statuses: Arc<dyn StatusRepository>,
        downloads: Arc<dyn DownloadMarkerRepository>,
    ) -> Self {
        Self {
            source,
            statuses,
            downloads,
        }
    }

    /// Current source listing, newest first. Empty when access is missing.
    pub async fn live(&self, media_kind: Option<MediaKind>) -> Result<Vec<LiveStatus>> {
        let downloaded = self.downloads.all_downloaded_filenames().await?;

        let mut files: Vec<SourceFile> = self
            .source
            .list_files()
            .await
            .into_iter()
            .filter(|f| media_kind.map_or(true, |kind| f.media_kind == kind))
            .collect();
        files.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        Ok(files
            .into_iter()
            .map(|file| LiveStatus {
                is_downloaded: downloaded.contains(&file.filename),
                file,
            })
            .collect())
    }

    pub async fn cached(&self, media_kind: Option<MediaKind>) -> Result<Vec<StatusRecord>> {
        Ok(self
            .statuses
            .list_by_category(Category::Cached, media_kind)
            .await?)
    }

    pub async fn saved(&self, media_kind: Option<MediaKind>) -> Result<Vec<StatusRecord>> {
        Ok(self
            .statuses
            .list_by_category(Category::Saved, media_kind)
            .await?)
    }

    pub async fn counts(&self) -> Result<CategoryCounts> {
        Ok(CategoryCounts {
            live: self.source.list_files().await.len() as u64,
            cached: self.statuses.count_by_category(Category::Cached).await?,
            saved: self.statuses.count_by_category(Category::Saved).await?,
        })
    }

    pub async fn is_downloaded(&self, filename: &str) -> Result<bool> {
        Ok(self.downloads.is_downloaded(filename).await?)
    }
}
