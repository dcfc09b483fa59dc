//! Source Directory backed by a local folder

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::MediaKind,
    source::{SourceDirectory, SourceFile},
    storage::SettingsStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::{debug, warn};

enum Location {
    Fixed(PathBuf),
    /// Path persisted by the host; re-read on every call so clearing the
    /// setting behaves like a revoked grant.
    Setting {
        store: Arc<dyn SettingsStore>,
        key: String,
    },
}

/// Read-only view of a status folder on the local disk
///
/// Locators are absolute paths. Only files directly inside the folder are
/// listed; subdirectories, hidden entries and unrecognized extensions are
/// skipped.
pub struct LocalSourceDirectory {
    location: Location,
}

impl LocalSourceDirectory {
    /// Watch a fixed directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Fixed(root.into()),
        }
    }

    /// Watch whatever directory is currently stored under `key`
    pub fn from_settings(store: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            location: Location::Setting {
                store,
                key: key.into(),
            },
        }
    }

    async fn root(&self) -> Option<PathBuf> {
        match &self.location {
            Location::Fixed(path) => Some(path.clone()),
            Location::Setting { store, key } => match store.get_string(key).await {
                Ok(value) => value.filter(|v| !v.is_empty()).map(PathBuf::from),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read source location");
                    None
                }
            },
        }
    }

    async fn accessible_root(&self) -> Option<PathBuf> {
        let root = self.root().await?;
        match fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => Some(root),
            Ok(_) => {
                debug!(path = ?root, "Source location is not a directory");
                None
            }
            Err(e) => {
                debug!(path = ?root, error = %e, "Source location not accessible");
                None
            }
        }
    }

    async fn describe(path: &Path) -> Option<SourceFile> {
        let filename = path.file_name()?.to_str()?.to_string();
        let media_kind = MediaKind::from_filename(&filename)?;
        let meta = fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let last_modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        Some(SourceFile {
            filename,
            locator: path.to_string_lossy().into_owned(),
            media_kind,
            size_bytes: meta.len(),
            last_modified,
        })
    }
}

#[async_trait]
impl SourceDirectory for LocalSourceDirectory {
    async fn is_accessible(&self) -> bool {
        let Some(root) = self.accessible_root().await else {
            return false;
        };
        fs::read_dir(&root).await.is_ok()
    }

    async fn list_files(&self) -> Vec<SourceFile> {
        let Some(root) = self.accessible_root().await else {
            return Vec::new();
        };

        let mut read_dir = match fs::read_dir(&root).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(path = ?root, error = %e, "Failed to list source directory");
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => {
                    if let Some(file) = Self::describe(&entry.path()).await {
                        files.push(file);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(path = ?root, error = %e, "Source listing interrupted");
                    break;
                }
            }
        }

        debug!(path = ?root, count = files.len(), "Listed source directory");
        files
    }

    async fn open_read(
        &self,
        locator: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let root = self
            .accessible_root()
            .await
            .ok_or_else(|| BridgeError::NotAvailable("source directory".to_string()))?;

        let path = PathBuf::from(locator);
        if path.parent() != Some(root.as_path()) {
            return Err(BridgeError::OperationFailed(format!(
                "locator outside source directory: {}",
                locator
            )));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::NotFound(locator.to_string())
            } else {
                BridgeError::Io(e)
            }
        })?;
        Ok(Box::new(file))
    }
}
