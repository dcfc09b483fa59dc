//! Source Directory Abstraction
//!
//! The status source is a directory owned by another application. Access to it
//! is granted by the user and can be revoked at any time, so every operation
//! here is expected to degrade to "nothing available" rather than fail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::MediaKind;

/// A media file currently present in the source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Display name, unique within the source directory
    pub filename: String,
    /// Opaque, host-specific handle used to read the bytes
    pub locator: String,
    pub media_kind: MediaKind,
    pub size_bytes: u64,
    /// Last modification time (epoch milliseconds)
    pub last_modified: i64,
}

/// Read-only view over the external status directory
///
/// Implementations:
/// - Desktop: a plain directory on disk
/// - Android: a tree URI granted through the storage access framework
///
/// # Contract
///
/// - `list_files` computes a fresh listing on every call and never errors:
///   a missing, revoked or unreadable directory yields an empty list.
/// - Only non-hidden files with a recognized media extension are listed.
/// - `open_read` may fail for an individual file; callers treat that as a
///   per-file failure.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::SourceDirectory;
///
/// async fn count_videos(source: &dyn SourceDirectory) -> usize {
///     source
///         .list_files()
///         .await
///         .iter()
///         .filter(|f| f.media_kind == MediaKind::Video)
///         .count()
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// Whether a usable access grant currently exists.
    ///
    /// Lets callers tell "permission revoked" apart from "folder is empty".
    async fn is_accessible(&self) -> bool;

    /// List the media files currently in the directory.
    async fn list_files(&self) -> Vec<SourceFile>;

    /// Open a file for streaming reads by its locator.
    async fn open_read(
        &self,
        locator: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}
