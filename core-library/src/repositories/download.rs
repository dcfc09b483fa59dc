//! Download marker persistence

use crate::error::{LibraryError, Result};
use crate::models::DownloadMarker;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, error, instrument};

/// Repository trait for download markers
#[async_trait]
pub trait DownloadMarkerRepository: Send + Sync {
    /// Record (or replace) the marker for `marker.filename`.
    async fn mark_downloaded(&self, marker: &DownloadMarker) -> Result<()>;

    async fn is_downloaded(&self, filename: &str) -> Result<bool>;

    async fn find(&self, filename: &str) -> Result<Option<DownloadMarker>>;

    async fn all_downloaded_filenames(&self) -> Result<HashSet<String>>;

    /// Every marker, most recently marked first.
    async fn list_all(&self) -> Result<Vec<DownloadMarker>>;

    /// Returns whether a marker was removed.
    async fn remove(&self, filename: &str) -> Result<bool>;
}

/// SQLite implementation of [`DownloadMarkerRepository`]
#[derive(Clone)]
pub struct SqliteDownloadMarkerRepository {
    pool: SqlitePool,
}

impl SqliteDownloadMarkerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DownloadMarkerRepository for SqliteDownloadMarkerRepository {
    #[instrument(skip(self, marker), fields(filename = %marker.filename))]
    async fn mark_downloaded(&self, marker: &DownloadMarker) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO download_markers (filename, origin_locator, saved_locator, marked_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                origin_locator = excluded.origin_locator,
                saved_locator = excluded.saved_locator,
                marked_at = excluded.marked_at
            "#,
        )
        .bind(&marker.filename)
        .bind(&marker.origin_locator)
        .bind(&marker.saved_locator)
        .bind(marker.marked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to store download marker: {}", e);
            LibraryError::Database(e)
        })?;

        debug!("Marked as downloaded");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_downloaded(&self, filename: &str) -> Result<bool> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM download_markers WHERE filename = ?)")
                .bind(filename)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to query download marker: {}", e);
                    LibraryError::Database(e)
                })?;

        Ok(found)
    }

    #[instrument(skip(self))]
    async fn find(&self, filename: &str) -> Result<Option<DownloadMarker>> {
        sqlx::query_as::<_, DownloadMarker>(
            "SELECT filename, origin_locator, saved_locator, marked_at FROM download_markers WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to query download marker: {}", e);
            LibraryError::Database(e)
        })
    }

    #[instrument(skip(self))]
    async fn all_downloaded_filenames(&self) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT filename FROM download_markers")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list download markers: {}", e);
                LibraryError::Database(e)
            })?;

        Ok(names.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<DownloadMarker>> {
        sqlx::query_as::<_, DownloadMarker>(
            "SELECT filename, origin_locator, saved_locator, marked_at FROM download_markers ORDER BY marked_at DESC, filename ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list download markers: {}", e);
            LibraryError::Database(e)
        })
    }

    #[instrument(skip(self))]
    async fn remove(&self, filename: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM download_markers WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to remove download marker: {}", e);
                LibraryError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
