//! Core service façade and bootstrap helpers.
//!
//! [`StatusCore`] opens the status database, wires the host-provided bridges
//! (source directory, file system, settings, media scanner, clock) into the
//! sync engine and promotion service, and owns their lifecycle. Desktop hosts
//! enable the `desktop-shims` feature (which depends on `bridge-desktop`) to
//! get default bridges; mobile hosts inject their own through
//! [`CoreConfig`](core_runtime::config::CoreConfig).
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::StatusCore;
//!
//! let config = CoreConfig::builder().desktop_directories().build()?;
//! let core = StatusCore::open(config).await?;
//! core.start_monitoring().await?;
//!
//! let live = core.catalog().live(None).await?;
//! core.close().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::{Category, MediaKind, StatusId, StatusRecord};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventBus};
pub use core_runtime::settings::{RetentionDays, StatusSettings};
pub use core_sync::{CategoryCounts, LiveStatus, PromotionOutcome, StatusCatalog, SyncReport};

use bridge_traits::{SettingsStore, SourceDirectory};
use core_library::{
    close_pool, create_pool, DatabaseConfig, SqliteDownloadMarkerRepository,
    SqliteStatusRepository,
};
use core_sync::{
    sweep_staging, PromotionService, RecordRemover, StorageLayout, SyncCoordinator, SyncMonitor,
};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Primary façade exposed to host applications.
///
/// Every component shares one connection pool. [`StatusCore::close`] stops the
/// monitor and closes the pool; the core cannot be reopened afterwards.
pub struct StatusCore {
    config: CoreConfig,
    pool: SqlitePool,
    events: EventBus,
    settings: StatusSettings,
    coordinator: Arc<SyncCoordinator>,
    promotion: Arc<PromotionService>,
    catalog: Arc<StatusCatalog>,
    monitor: Arc<SyncMonitor>,
    closed: AtomicBool,
}

impl StatusCore {
    /// Open the store and build every component.
    ///
    /// Duplicate rows left by older versions are collapsed before the core is
    /// handed out.
    pub async fn open(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        info!(database = ?config.database_path, "Opening status core");

        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                config.file_system.create_dir_all(parent).await?;
            }
        }

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        match Self::assemble(config, pool.clone()).await {
            Ok(core) => Ok(core),
            Err(e) => {
                close_pool(&pool).await;
                Err(e)
            }
        }
    }

    async fn assemble(config: CoreConfig, pool: SqlitePool) -> Result<Self> {
        let settings_store = match config.settings_store.clone() {
            Some(store) => store,
            None => default_settings_store(&pool).await?,
        };
        let source = match config.source_directory.clone() {
            Some(source) => source,
            None => default_source_directory(Arc::clone(&settings_store))?,
        };
        let settings = StatusSettings::new(settings_store);

        let statuses = Arc::new(SqliteStatusRepository::new(pool.clone()));
        let downloads = Arc::new(SqliteDownloadMarkerRepository::new(pool.clone()));
        let events = EventBus::default();
        let layout = StorageLayout::new(config.cache_dir.clone(), config.saved_dir.clone());
        let staging_dirs: Vec<PathBuf> = [MediaKind::Image, MediaKind::Video]
            .into_iter()
            .filter_map(|kind| layout.directory_for(Category::Saved, kind))
            .chain([layout.cache_dir().to_path_buf()])
            .collect();

        let remover = Arc::new(RecordRemover::new(
            config.file_system.clone(),
            statuses.clone(),
            downloads.clone(),
            config.media_scanner.clone(),
            events.clone(),
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            source.clone(),
            config.file_system.clone(),
            statuses.clone(),
            remover.clone(),
            settings.clone(),
            layout.clone(),
            config.clock.clone(),
            events.clone(),
        ));
        let promotion = Arc::new(PromotionService::new(
            source.clone(),
            config.file_system.clone(),
            statuses.clone(),
            downloads.clone(),
            remover,
            config.media_scanner.clone(),
            layout,
            config.clock.clone(),
            events.clone(),
        ));
        let catalog = Arc::new(StatusCatalog::new(source, statuses, downloads));
        let monitor = Arc::new(SyncMonitor::new(
            coordinator.clone(),
            promotion.clone(),
            settings.clone(),
            config.poll_interval,
        ));

        coordinator.remove_duplicates().await?;
        let mut swept = 0;
        for dir in &staging_dirs {
            swept += sweep_staging(config.file_system.as_ref(), dir).await;
        }
        if swept > 0 {
            info!(swept, "Removed interrupted copies");
        }

        info!("Status core ready");
        Ok(Self {
            config,
            pool,
            events,
            settings,
            coordinator,
            promotion,
            catalog,
            monitor,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn promotion(&self) -> &Arc<PromotionService> {
        &self.promotion
    }

    pub fn catalog(&self) -> &Arc<StatusCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &StatusSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn monitor(&self) -> &Arc<SyncMonitor> {
        &self.monitor
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(CoreError::Closed);
        }
        Ok(())
    }

    /// Start the background monitor. `false` if it was already running.
    pub async fn start_monitoring(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.monitor.start().await)
    }

    /// Run a pass now, including auto-save.
    ///
    /// `Ok(None)` when a pass was already in progress.
    pub async fn refresh(&self) -> Result<Option<SyncReport>> {
        self.ensure_open()?;
        Ok(self.monitor.run_now().await?)
    }

    /// Persist a newly granted source folder and ask the monitor to scan it.
    pub async fn grant_source(&self, location: &str) -> Result<()> {
        self.ensure_open()?;
        self.settings.set_source_location(location).await?;
        self.monitor.trigger();
        Ok(())
    }

    /// Forget the source folder; later passes see it as unavailable.
    pub async fn revoke_source(&self) -> Result<()> {
        self.ensure_open()?;
        self.settings.clear_source_location().await?;
        Ok(())
    }

    /// Stop the monitor and close the store. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.monitor.stop().await;
        close_pool(&self.pool).await;
        info!("Status core closed");
    }
}

impl Drop for StatusCore {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!("Status core dropped without close()");
        }
    }
}

#[cfg(feature = "desktop-shims")]
async fn default_settings_store(pool: &SqlitePool) -> Result<Arc<dyn SettingsStore>> {
    let store = bridge_desktop::SqliteSettingsStore::from_pool(pool.clone()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn default_settings_store(_pool: &SqlitePool) -> Result<Arc<dyn SettingsStore>> {
    Err(CoreError::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "inject a settings store or enable the 'desktop-shims' feature".to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn default_source_directory(store: Arc<dyn SettingsStore>) -> Result<Arc<dyn SourceDirectory>> {
    Ok(Arc::new(bridge_desktop::LocalSourceDirectory::from_settings(
        store,
        core_runtime::settings::SOURCE_LOCATION_KEY,
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_source_directory(_store: Arc<dyn SettingsStore>) -> Result<Arc<dyn SourceDirectory>> {
    Err(CoreError::CapabilityMissing {
        capability: "SourceDirectory".to_string(),
        message: "inject a source directory or enable the 'desktop-shims' feature".to_string(),
    })
}
