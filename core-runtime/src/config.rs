//! # Core Configuration Module
//!
//! Provides configuration management for the status core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every path, cadence and bridge the core needs. It
//! enforces fail-fast validation so a misconfigured host learns about it
//! before the first synchronization pass.
//!
//! ## Required Settings
//!
//! - `database_path` - SQLite file holding status records and download markers
//! - `cache_dir` - App-private directory for CACHED copies
//! - `saved_dir` - User-visible root for SAVED media (`Images/`, `Videos/`)
//!
//! ## Bridges
//!
//! - `SourceDirectory` - The external status folder (desktop default: folder
//!   path read from the settings store)
//! - `SettingsStore` - Runtime preferences (desktop default: table inside the
//!   status database)
//! - `FileSystemAccess` - Local file I/O (desktop default: tokio fs)
//! - `MediaScanner` - Gallery change hints (desktop default: log only)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, the desktop implementations
//! are injected automatically for any bridge that was not provided. The
//! source directory and settings store need the opened database, so their
//! defaults are resolved when the core is opened rather than here.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/statuses.db")
//!     .cache_dir("/data/cache/statuses")
//!     .saved_dir("/home/me/Pictures/SA Status Saver")
//!     .poll_interval(Duration::from_secs(30))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    Clock, FileSystemAccess, MediaScanner, SettingsStore, SourceDirectory, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Interactive cadence: how often the monitor re-scans while the host is active.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Scheduled cadence for hosts that run passes from a platform job scheduler.
pub const DEFAULT_PERIODIC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Core configuration for the status core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory for CACHED copies (app-private)
    pub cache_dir: PathBuf,

    /// Root directory for SAVED media (user-visible)
    pub saved_dir: PathBuf,

    /// Interval between monitor passes
    pub poll_interval: Duration,

    /// Interval for platform-scheduled passes
    pub periodic_interval: Duration,

    /// External status folder (resolved at open time when `None`)
    pub source_directory: Option<Arc<dyn SourceDirectory>>,

    /// Preferences storage (resolved at open time when `None`)
    pub settings_store: Option<Arc<dyn SettingsStore>>,

    /// File system access abstraction
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Gallery change notifications
    pub media_scanner: Arc<dyn MediaScanner>,

    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("cache_dir", &self.cache_dir)
            .field("saved_dir", &self.saved_dir)
            .field("poll_interval", &self.poll_interval)
            .field("periodic_interval", &self.periodic_interval)
            .field(
                "source_directory",
                &self
                    .source_directory
                    .as_ref()
                    .map(|_| "SourceDirectory { ... }"),
            )
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .field("file_system", &"FileSystemAccess { ... }")
            .field("media_scanner", &"MediaScanner { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Paths are not empty
    /// - Cache and saved roots are different directories
    /// - Intervals are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.saved_dir.as_os_str().is_empty() {
            return Err(Error::Config("Saved directory cannot be empty".to_string()));
        }

        if self.cache_dir == self.saved_dir {
            return Err(Error::Config(
                "Cache and saved directories must differ: retention deletes \
                 everything it expires from the cache directory."
                    .to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than zero".to_string(),
            ));
        }

        if self.periodic_interval.is_zero() {
            return Err(Error::Config(
                "Periodic interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: ensure the 'desktop-shims' feature is enabled to use the default. \
             Mobile: inject the platform-native adapter.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing("FileSystemAccess", "cache and saved media I/O"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_scanner() -> Result<Arc<dyn MediaScanner>> {
    Ok(Arc::new(bridge_desktop::TracingMediaScanner::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_scanner() -> Result<Arc<dyn MediaScanner>> {
    Err(capability_missing("MediaScanner", "gallery change notifications"))
}

#[cfg(feature = "desktop-shims")]
fn check_deferred_bridges(
    _source: &Option<Arc<dyn SourceDirectory>>,
    _settings: &Option<Arc<dyn SettingsStore>>,
) -> Result<()> {
    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn check_deferred_bridges(
    source: &Option<Arc<dyn SourceDirectory>>,
    settings: &Option<Arc<dyn SettingsStore>>,
) -> Result<()> {
    if source.is_none() {
        return Err(capability_missing("SourceDirectory", "status discovery"));
    }
    if settings.is_none() {
        return Err(capability_missing("SettingsStore", "user preferences"));
    }
    Ok(())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    saved_dir: Option<PathBuf>,
    poll_interval: Option<Duration>,
    periodic_interval: Option<Duration>,
    source_directory: Option<Arc<dyn SourceDirectory>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    media_scanner: Option<Arc<dyn MediaScanner>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/statuses.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the directory that holds CACHED copies.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the user-visible root for SAVED media.
    pub fn saved_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.saved_dir = Some(path.into());
        self
    }

    /// Fills every unset path from the platform's default directories.
    #[cfg(feature = "desktop-shims")]
    pub fn desktop_directories(mut self) -> Self {
        let dirs = bridge_desktop::DesktopDirectories::resolve();
        self.database_path.get_or_insert(dirs.database_path);
        self.cache_dir.get_or_insert(dirs.cache_dir);
        self.saved_dir.get_or_insert(dirs.saved_dir);
        self
    }

    /// Sets the monitor cadence.
    ///
    /// Default: 30 seconds
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the cadence for platform-scheduled passes.
    ///
    /// Default: 15 minutes
    pub fn periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = Some(interval);
        self
    }

    /// Sets the source directory implementation.
    pub fn source_directory(mut self, source: Arc<dyn SourceDirectory>) -> Self {
        self.source_directory = Some(source);
        self
    }

    /// Sets the settings store implementation.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the file system access implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the media scanner implementation.
    pub fn media_scanner(mut self, scanner: Arc<dyn MediaScanner>) -> Self {
        self.media_scanner = Some(scanner);
        self
    }

    /// Sets the time source. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - A required path is missing
    /// - A required bridge is missing and has no platform default
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let saved_dir = self.saved_dir.ok_or_else(|| {
            Error::Config("Saved directory is required. Use .saved_dir() to set it.".to_string())
        })?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let media_scanner = match self.media_scanner {
            Some(scanner) => scanner,
            None => provide_default_media_scanner()?,
        };

        check_deferred_bridges(&self.source_directory, &self.settings_store)?;

        let config = CoreConfig {
            database_path,
            cache_dir,
            saved_dir,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            periodic_interval: self.periodic_interval.unwrap_or(DEFAULT_PERIODIC_INTERVAL),
            source_directory: self.source_directory,
            settings_store: self.settings_store,
            file_system,
            media_scanner,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{FileMetadata, SourceFile};
    use bytes::Bytes;
    use std::path::Path;

    struct EmptySource;

    #[async_trait]
    impl SourceDirectory for EmptySource {
        async fn is_accessible(&self) -> bool {
            false
        }

        async fn list_files(&self) -> Vec<SourceFile> {
            Vec::new()
        }

        async fn open_read(
            &self,
            locator: &str,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Err(bridge_traits::BridgeError::NotFound(locator.to_string()))
        }
    }

    struct NullSettings;

    #[async_trait]
    impl SettingsStore for NullSettings {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }
        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }
        async fn set_i64(&self, _key: &str, _value: i64) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_i64(&self, _key: &str) -> BridgeResult<Option<i64>> {
            Ok(None)
        }
        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn has_key(&self, _key: &str) -> BridgeResult<bool> {
            Ok(false)
        }
        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct NullFileSystem;

    #[async_trait]
    impl FileSystemAccess for NullFileSystem {
        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }
        async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
            Err(bridge_traits::BridgeError::NotFound(path.display().to_string()))
        }
        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }
        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }
        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn rename(&self, _from: &Path, _to: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn list_directory(&self, _path: &Path) -> BridgeResult<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        async fn open_read_stream(
            &self,
            path: &Path,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Err(bridge_traits::BridgeError::NotFound(path.display().to_string()))
        }
        async fn open_write_stream(
            &self,
            _path: &Path,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncWrite + Send + Unpin>> {
            Ok(Box::new(tokio::io::sink()))
        }
    }

    struct NullScanner;

    #[async_trait]
    impl MediaScanner for NullScanner {
        async fn scan(&self, _path: &Path, _mime_type: Option<&'static str>) {}
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .database_path("/data/statuses.db")
            .cache_dir("/data/cache")
            .saved_dir("/pictures/saved")
            .source_directory(Arc::new(EmptySource))
            .settings_store(Arc::new(NullSettings))
            .file_system(Arc::new(NullFileSystem))
            .media_scanner(Arc::new(NullScanner))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/statuses.db"));
        assert_eq!(config.cache_dir, PathBuf::from("/data/cache"));
        assert_eq!(config.saved_dir, PathBuf::from("/pictures/saved"));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.periodic_interval, Duration::from_secs(900));
        assert!(config.source_directory.is_some());
    }

    #[test]
    fn test_builder_requires_database_path() {
        let result = CoreConfig::builder()
            .cache_dir("/data/cache")
            .saved_dir("/pictures/saved")
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Database path is required"));
    }

    #[test]
    fn test_builder_requires_saved_dir() {
        let result = CoreConfig::builder()
            .database_path("/data/statuses.db")
            .cache_dir("/data/cache")
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Saved directory is required"));
    }

    #[test]
    fn test_validate_rejects_shared_cache_and_saved_dir() {
        let result = complete_builder().saved_dir("/data/cache").build();

        assert!(result.unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let result = complete_builder().poll_interval(Duration::ZERO).build();
        assert!(result.unwrap_err().to_string().contains("Poll interval"));

        let result = complete_builder()
            .periodic_interval(Duration::ZERO)
            .build();
        assert!(result.unwrap_err().to_string().contains("Periodic interval"));
    }

    #[test]
    fn test_builder_with_custom_intervals() {
        let config = complete_builder()
            .poll_interval(Duration::from_secs(5))
            .periodic_interval(Duration::from_secs(3600))
            .build()
            .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.periodic_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = complete_builder().build().unwrap();
        let cloned = config.clone();
        assert_eq!(config.database_path, cloned.database_path);
        assert!(format!("{:?}", cloned).contains("SourceDirectory { ... }"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_source_directory() {
        let result = CoreConfig::builder()
            .database_path("/data/statuses.db")
            .cache_dir("/data/cache")
            .saved_dir("/pictures/saved")
            .settings_store(Arc::new(NullSettings))
            .file_system(Arc::new(NullFileSystem))
            .media_scanner(Arc::new(NullScanner))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "SourceDirectory"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder()
            .database_path("/data/statuses.db")
            .cache_dir("/data/cache")
            .saved_dir("/pictures/saved")
            .build()
            .unwrap();

        assert!(config.source_directory.is_none());
        assert!(config.settings_store.is_none());
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_directories_fill_missing_paths() {
        let config = CoreConfig::builder()
            .cache_dir("/custom/cache")
            .desktop_directories()
            .build()
            .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/custom/cache"));
        assert!(config.database_path.ends_with("statuses.db"));
    }
}
