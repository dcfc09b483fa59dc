//! Domain models for the local status store
//!
//! Rows in `statuses` map to [`StatusRecord`]; rows in `download_markers` map
//! to [`DownloadMarker`]. Category-specific behavior is looked up through
//! [`Category::policy`] rather than matched on at each call site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::LibraryError;

pub use bridge_traits::media::MediaKind;

const MILLIS_PER_DAY: i64 = 86_400_000;

// =============================================================================
// ID Types
// =============================================================================

/// Store-assigned identifier of a status row
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct StatusId(pub i64);

impl StatusId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Category
// =============================================================================

/// Where a status record comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Currently visible in the source directory; never persisted
    Live,
    /// Local expiring copy
    Cached,
    /// Permanent copy the user promoted
    Saved,
}

/// Behavior attached to a [`Category`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPolicy {
    /// Stored as a row in `statuses`
    pub persisted: bool,
    /// Subject to the retention window
    pub expires: bool,
    /// Deleting the record also removes its download marker
    pub clears_download_marker: bool,
    /// Files live in gallery-visible storage and changes are announced
    pub gallery_visible: bool,
}

const LIVE_POLICY: CategoryPolicy = CategoryPolicy {
    persisted: false,
    expires: false,
    clears_download_marker: false,
    gallery_visible: false,
};

const CACHED_POLICY: CategoryPolicy = CategoryPolicy {
    persisted: true,
    expires: true,
    clears_download_marker: false,
    gallery_visible: false,
};

const SAVED_POLICY: CategoryPolicy = CategoryPolicy {
    persisted: true,
    expires: false,
    clears_download_marker: true,
    gallery_visible: true,
};

impl Category {
    pub const ALL: [Category; 3] = [Category::Live, Category::Cached, Category::Saved];

    pub fn policy(self) -> &'static CategoryPolicy {
        match self {
            Category::Live => &LIVE_POLICY,
            Category::Cached => &CACHED_POLICY,
            Category::Saved => &SAVED_POLICY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Live => "live",
            Category::Cached => "cached",
            Category::Saved => "saved",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Category::Live),
            "cached" => Ok(Category::Cached),
            "saved" => Ok(Category::Saved),
            other => Err(LibraryError::InvalidData(format!(
                "unknown category: {other}"
            ))),
        }
    }
}

// =============================================================================
// Status Records
// =============================================================================

/// One piece of media known to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: StatusId,
    pub filename: String,
    /// Where the bytes were copied from; informational only
    pub origin_locator: String,
    /// The store's own copy
    pub local_path: String,
    pub media_kind: MediaKind,
    pub category: Category,
    /// Source last-modified time (epoch ms)
    pub discovered_at: i64,
    /// When the row was written (epoch ms); retention and sort key
    pub recorded_at: i64,
    pub size_bytes: i64,
}

impl StatusRecord {
    /// When a CACHED record falls out of a `retention_days` window.
    ///
    /// `None` for categories that never expire.
    pub fn expires_at(&self, retention_days: i64) -> Option<i64> {
        self.category
            .policy()
            .expires
            .then(|| self.recorded_at.saturating_add(retention_days * MILLIS_PER_DAY))
    }

    /// `recorded_at` as a UTC timestamp, for display.
    pub fn recorded_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.recorded_at)
    }
}

/// A status record that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusRecord {
    pub filename: String,
    pub origin_locator: String,
    pub local_path: String,
    pub media_kind: MediaKind,
    pub category: Category,
    pub discovered_at: i64,
    pub recorded_at: i64,
    pub size_bytes: i64,
}

impl NewStatusRecord {
    /// Validate before insert
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.trim().is_empty() {
            return Err("Filename cannot be empty".to_string());
        }

        if self.local_path.is_empty() {
            return Err("Local path cannot be empty".to_string());
        }

        if self.size_bytes < 0 {
            return Err("Size cannot be negative".to_string());
        }

        Ok(())
    }

    pub(crate) fn into_record(self, id: StatusId) -> StatusRecord {
        StatusRecord {
            id,
            filename: self.filename,
            origin_locator: self.origin_locator,
            local_path: self.local_path,
            media_kind: self.media_kind,
            category: self.category,
            discovered_at: self.discovered_at,
            recorded_at: self.recorded_at,
            size_bytes: self.size_bytes,
        }
    }
}

/// Raw `statuses` row
#[derive(Debug, FromRow)]
pub(crate) struct StatusRow {
    pub id: i64,
    pub filename: String,
    pub origin_locator: String,
    pub local_path: String,
    pub media_kind: String,
    pub category: String,
    pub discovered_at: i64,
    pub recorded_at: i64,
    pub size_bytes: i64,
}

impl TryFrom<StatusRow> for StatusRecord {
    type Error = LibraryError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        let media_kind = row
            .media_kind
            .parse::<MediaKind>()
            .map_err(|e| LibraryError::InvalidData(e.to_string()))?;

        Ok(StatusRecord {
            id: StatusId(row.id),
            filename: row.filename,
            origin_locator: row.origin_locator,
            local_path: row.local_path,
            media_kind,
            category: row.category.parse()?,
            discovered_at: row.discovered_at,
            recorded_at: row.recorded_at,
            size_bytes: row.size_bytes,
        })
    }
}

// =============================================================================
// Download Markers
// =============================================================================

/// "The user has a permanent copy of this filename"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DownloadMarker {
    pub filename: String,
    pub origin_locator: String,
    pub saved_locator: String,
    pub marked_at: i64,
}

impl DownloadMarker {
    pub fn new(
        filename: impl Into<String>,
        origin_locator: impl Into<String>,
        saved_locator: impl Into<String>,
        marked_at: i64,
    ) -> Self {
        Self {
            filename: filename.into(),
            origin_locator: origin_locator.into(),
            saved_locator: saved_locator.into(),
            marked_at,
        }
    }
}
