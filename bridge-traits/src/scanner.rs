//! Content Change Notification
//!
//! After the core writes or removes a user-visible file it tells the host so
//! the platform gallery index can pick up the change.

use async_trait::async_trait;
use std::path::Path;

/// Outbound "content changed at path" hint
///
/// Fire-and-forget: implementations log their own failures and never return
/// them, because a stale gallery index must not undo a completed save or
/// delete.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaScanner: Send + Sync {
    /// Announce that the file at `path` was created, replaced or removed.
    ///
    /// `mime_type` is a hint for hosts that need it (absent for removals).
    async fn scan(&self, path: &Path, mime_type: Option<&'static str>);
}
