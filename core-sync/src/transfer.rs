//! Verified byte copy
//!
//! Copies a stream through [`FileSystemAccess`] into a hidden staging file
//! next to the destination, checks that it is non-empty, then renames it into
//! place. The destination therefore only ever holds complete copies, even
//! when two writers target it at once, and a failed copy leaves nothing.
//!
//! A copy cut short by process teardown can still leave a staging file
//! behind; [`sweep_staging`] removes those, skipping any copy still running
//! in this process.

use bridge_traits::error::BridgeError;
use bridge_traits::storage::FileSystemAccess;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Source unreadable: {0}")]
    Source(#[source] BridgeError),

    #[error("Destination unwritable: {0}")]
    Destination(#[source] BridgeError),

    #[error("I/O error during copy: {0}")]
    Io(#[from] std::io::Error),

    #[error("Copied file is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Copied file missing after write: {}", .0.display())]
    Missing(PathBuf),
}

/// Stream `reader` into `destination` verbatim and verify the result.
///
/// Returns the number of bytes written.
pub async fn copy_verified(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    fs: &dyn FileSystemAccess,
    destination: &Path,
) -> Result<u64, TransferError> {
    let staging = staging_path(destination);
    let _in_flight = InFlight::register(&staging);

    let result = match write_and_verify(&mut reader, fs, &staging).await {
        Ok(bytes) => fs
            .rename(&staging, destination)
            .await
            .map(|()| bytes)
            .map_err(TransferError::Destination),
        Err(e) => Err(e),
    };

    match result {
        Ok(bytes) => {
            debug!(path = ?destination, bytes, "Copy verified");
            Ok(bytes)
        }
        Err(e) => {
            discard(fs, &staging).await;
            Err(e)
        }
    }
}

const STAGING_SUFFIX: &str = ".part";

fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(
        ".{}.{}{}",
        name,
        Uuid::new_v4().simple(),
        STAGING_SUFFIX
    ))
}

fn is_staging_name(name: &str) -> bool {
    name.len() > 1 + STAGING_SUFFIX.len()
        && name.starts_with('.')
        && name.ends_with(STAGING_SUFFIX)
}

/// Staging files of copies currently running in this process
fn in_flight() -> &'static Mutex<HashSet<PathBuf>> {
    static IN_FLIGHT: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    IN_FLIGHT.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Keeps a staging path registered until the copy ends or is dropped.
struct InFlight(PathBuf);

impl InFlight {
    fn register(path: &Path) -> Self {
        if let Ok(mut paths) = in_flight().lock() {
            paths.insert(path.to_path_buf());
        }
        Self(path.to_path_buf())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut paths) = in_flight().lock() {
            paths.remove(&self.0);
        }
    }
}

/// Delete staging files left in `dir` by interrupted copies.
///
/// Returns how many were removed. A missing directory counts as clean.
pub async fn sweep_staging(fs: &dyn FileSystemAccess, dir: &Path) -> u64 {
    let entries = match fs.list_directory(dir).await {
        Ok(entries) => entries,
        Err(e) if e.is_not_found() => return 0,
        Err(e) => {
            warn!(path = ?dir, error = %e, "Failed to list directory for staging sweep");
            return 0;
        }
    };

    let mut removed = 0u64;
    for path in entries {
        let is_orphan = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_staging_name);
        if !is_orphan {
            continue;
        }
        let running = in_flight()
            .lock()
            .map(|paths| paths.contains(&path))
            .unwrap_or(true);
        if running {
            continue;
        }
        match fs.delete_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(path = ?path, error = %e, "Failed to remove staging file"),
        }
    }

    if removed > 0 {
        debug!(path = ?dir, removed, "Removed interrupted copies");
    }
    removed
}

async fn write_and_verify(
    reader: &mut Box<dyn AsyncRead + Send + Unpin>,
    fs: &dyn FileSystemAccess,
    destination: &Path,
) -> Result<u64, TransferError> {
    if let Some(parent) = destination.parent() {
        fs.create_dir_all(parent)
            .await
            .map_err(TransferError::Destination)?;
    }

    let mut writer = fs
        .open_write_stream(destination)
        .await
        .map_err(TransferError::Destination)?;
    let copied = tokio::io::copy(reader, &mut writer).await?;
    writer.flush().await?;
    writer.shutdown().await?;
    drop(writer);

    let metadata = match fs.metadata(destination).await {
        Ok(metadata) => metadata,
        Err(e) if e.is_not_found() => {
            return Err(TransferError::Missing(destination.to_path_buf()))
        }
        Err(e) => return Err(TransferError::Destination(e)),
    };

    if copied == 0 || metadata.size == 0 {
        return Err(TransferError::Empty(destination.to_path_buf()));
    }

    Ok(metadata.size)
}

/// Best-effort removal of a copy that will not be recorded.
pub async fn discard(fs: &dyn FileSystemAccess, path: &Path) {
    match fs.delete_file(path).await {
        Ok(()) => debug!(path = ?path, "Discarded local copy"),
        Err(e) if e.is_not_found() => {}
        Err(e) => warn!(path = ?path, error = %e, "Failed to discard local copy"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Yields some bytes, then fails.
    struct BrokenReader {
        sent: bool,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "device lost")));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_copy_creates_parent_and_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let destination = dir.path().join("Images").join("a.jpg");

        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(&b"jpeg-bytes"[..]);
        let size = copy_verified(reader, &fs, &destination).await.unwrap();

        assert_eq!(size, 10);
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"jpeg-bytes");
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_empty_source_fails_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let destination = dir.path().join("empty.jpg");

        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(&b""[..]);
        let err = copy_verified(reader, &fs, &destination).await.unwrap_err();

        assert!(matches!(err, TransferError::Empty(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_read_error_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let destination = dir.path().join("broken.mp4");

        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(BrokenReader { sent: false });
        let err = copy_verified(reader, &fs, &destination).await.unwrap_err();

        assert!(matches!(err, TransferError::Io(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_copy_keeps_previous_destination() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let destination = dir.path().join("a.mp4");
        tokio::fs::write(&destination, b"complete").await.unwrap();

        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(BrokenReader { sent: false });
        assert!(copy_verified(reader, &fs, &destination).await.is_err());

        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"complete");
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_concurrent_copies_to_one_destination() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let destination = dir.path().join("same.jpg");

        let first: Box<dyn AsyncRead + Send + Unpin> = Box::new(&b"same bytes"[..]);
        let second: Box<dyn AsyncRead + Send + Unpin> = Box::new(&b"same bytes"[..]);
        let (a, b) = tokio::join!(
            copy_verified(first, &fs, &destination),
            copy_verified(second, &fs, &destination)
        );

        assert_eq!(a.unwrap(), 10);
        assert_eq!(b.unwrap(), 10);
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"same bytes");
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_orphaned_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        tokio::fs::write(dir.path().join(".a.jpg.deadbeef.part"), b"par")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("a.jpg"), b"kept").await.unwrap();
        tokio::fs::write(dir.path().join(".nomedia"), b"").await.unwrap();
        tokio::fs::write(dir.path().join("clip.part"), b"kept").await.unwrap();

        let running = dir.path().join(".b.jpg.cafe.part");
        tokio::fs::write(&running, b"in progress").await.unwrap();
        let guard = InFlight::register(&running);

        assert_eq!(sweep_staging(&fs, dir.path()).await, 1);
        assert!(!dir.path().join(".a.jpg.deadbeef.part").exists());
        assert!(running.exists());
        assert_eq!(entries(dir.path()), 4);

        drop(guard);
        assert_eq!(sweep_staging(&fs, dir.path()).await, 1);
        assert!(!running.exists());
    }

    #[tokio::test]
    async fn test_sweep_of_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        assert_eq!(sweep_staging(&fs, &dir.path().join("absent")).await, 0);
    }

    #[tokio::test]
    async fn test_overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let destination = dir.path().join("a.jpg");
        tokio::fs::write(&destination, b"stale content that is longer")
            .await
            .unwrap();

        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(&b"fresh"[..]);
        assert_eq!(copy_verified(reader, &fs, &destination).await.unwrap(), 5);
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"fresh");
    }
}
