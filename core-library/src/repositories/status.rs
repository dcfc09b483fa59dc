//! Status record persistence
//!
//! The table carries no UNIQUE constraint on `(filename, category)`; the
//! guard lives in [`StatusRepository::insert`], which checks and inserts in a
//! single statement so two concurrent writers cannot both succeed.

use crate::error::{LibraryError, Result};
use crate::models::{Category, MediaKind, NewStatusRecord, StatusId, StatusRecord, StatusRow};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, error, instrument};

const SELECT_COLUMNS: &str = "SELECT id, filename, origin_locator, local_path, media_kind, \
     category, discovered_at, recorded_at, size_bytes FROM statuses";

/// Repository trait for status records
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Whether a row exists for `(filename, category)`.
    async fn exists(&self, filename: &str, category: Category) -> Result<bool>;

    /// Insert a record and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// [`LibraryError::Conflict`] if a row for the same `(filename, category)`
    /// already exists. Callers treat this as "already handled".
    async fn insert(&self, record: &NewStatusRecord) -> Result<StatusRecord>;

    async fn find_by_id(&self, id: StatusId) -> Result<Option<StatusRecord>>;

    async fn find_by_filename(
        &self,
        filename: &str,
        category: Category,
    ) -> Result<Option<StatusRecord>>;

    /// Records in a category, newest `recorded_at` first.
    async fn list_by_category(
        &self,
        category: Category,
        media_kind: Option<MediaKind>,
    ) -> Result<Vec<StatusRecord>>;

    /// Records with `recorded_at` strictly before `cutoff`.
    async fn list_older_than(&self, category: Category, cutoff: i64) -> Result<Vec<StatusRecord>>;

    /// Delete the row for `record`; returns whether a row was removed.
    async fn delete(&self, record: &StatusRecord) -> Result<bool>;

    async fn delete_by_id(&self, id: StatusId) -> Result<bool>;

    /// Delete every row with `recorded_at` strictly before `cutoff`.
    async fn delete_older_than(&self, category: Category, cutoff: i64) -> Result<u64>;

    async fn count_by_category(&self, category: Category) -> Result<u64>;

    /// Keep only the lowest id per `(filename, category)`; returns rows removed.
    async fn remove_duplicate_rows(&self) -> Result<u64>;
}

/// SQLite implementation of [`StatusRepository`]
#[derive(Clone)]
pub struct SqliteStatusRepository {
    pool: SqlitePool,
}

impl SqliteStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn convert(rows: Vec<StatusRow>) -> Result<Vec<StatusRecord>> {
        rows.into_iter().map(StatusRecord::try_from).collect()
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> LibraryError {
    move |e| {
        error!(error = %e, "{}", context);
        LibraryError::Database(e)
    }
}

#[async_trait]
impl StatusRepository for SqliteStatusRepository {
    #[instrument(skip(self))]
    async fn exists(&self, filename: &str, category: Category) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM statuses WHERE filename = ? AND category = ?)",
        )
        .bind(filename)
        .bind(category.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check status existence"))?;

        Ok(found)
    }

    #[instrument(skip(self, record), fields(filename = %record.filename, category = %record.category))]
    async fn insert(&self, record: &NewStatusRecord) -> Result<StatusRecord> {
        if !record.category.policy().persisted {
            return Err(LibraryError::InvalidInput {
                field: "category".to_string(),
                message: format!("{} records are not stored", record.category),
            });
        }
        record
            .validate()
            .map_err(|message| LibraryError::InvalidInput {
                field: "record".to_string(),
                message,
            })?;

        let result = sqlx::query(
            r#"
            INSERT INTO statuses (
                filename, origin_locator, local_path, media_kind, category,
                discovered_at, recorded_at, size_bytes
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM statuses WHERE filename = ? AND category = ?
            )
            "#,
        )
        .bind(&record.filename)
        .bind(&record.origin_locator)
        .bind(&record.local_path)
        .bind(record.media_kind.as_str())
        .bind(record.category.as_str())
        .bind(record.discovered_at)
        .bind(record.recorded_at)
        .bind(record.size_bytes)
        .bind(&record.filename)
        .bind(record.category.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert status record"))?;

        if result.rows_affected() == 0 {
            debug!("Status record already present");
            return Err(LibraryError::Conflict {
                filename: record.filename.clone(),
                category: record.category.to_string(),
            });
        }

        let id = StatusId(result.last_insert_rowid());
        debug!(id = %id, "Inserted status record");
        Ok(record.clone().into_record(id))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: StatusId) -> Result<Option<StatusRecord>> {
        let row = sqlx::query_as::<_, StatusRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to query status by id"))?;

        row.map(StatusRecord::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_filename(
        &self,
        filename: &str,
        category: Category,
    ) -> Result<Option<StatusRecord>> {
        let row = sqlx::query_as::<_, StatusRow>(&format!(
            "{SELECT_COLUMNS} WHERE filename = ? AND category = ? ORDER BY id ASC LIMIT 1"
        ))
        .bind(filename)
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to query status by filename"))?;

        row.map(StatusRecord::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_by_category(
        &self,
        category: Category,
        media_kind: Option<MediaKind>,
    ) -> Result<Vec<StatusRecord>> {
        let kind = media_kind.map(|k| k.as_str());
        let rows = sqlx::query_as::<_, StatusRow>(&format!(
            "{SELECT_COLUMNS} WHERE category = ? AND (? IS NULL OR media_kind = ?) \
             ORDER BY recorded_at DESC, id DESC"
        ))
        .bind(category.as_str())
        .bind(kind)
        .bind(kind)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list statuses"))?;

        Self::convert(rows)
    }

    #[instrument(skip(self))]
    async fn list_older_than(&self, category: Category, cutoff: i64) -> Result<Vec<StatusRecord>> {
        let rows = sqlx::query_as::<_, StatusRow>(&format!(
            "{SELECT_COLUMNS} WHERE category = ? AND recorded_at < ? ORDER BY recorded_at ASC"
        ))
        .bind(category.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list expired statuses"))?;

        Self::convert(rows)
    }

    async fn delete(&self, record: &StatusRecord) -> Result<bool> {
        self.delete_by_id(record.id).await
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: StatusId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM statuses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete status"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_older_than(&self, category: Category, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM statuses WHERE category = ? AND recorded_at < ?")
            .bind(category.as_str())
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete expired statuses"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn count_by_category(&self, category: Category) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM statuses WHERE category = ?")
            .bind(category.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count statuses"))?;

        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn remove_duplicate_rows(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM statuses
            WHERE id NOT IN (
                SELECT MIN(id) FROM statuses GROUP BY filename, category
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to remove duplicate statuses"))?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, "Removed duplicate status rows");
        }
        Ok(removed)
    }
}
