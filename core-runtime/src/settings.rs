//! # Status Settings
//!
//! Typed access to the preferences the core reads at runtime. Values live in
//! the host's [`SettingsStore`]; nothing is cached here, so a change made by
//! the host is picked up by the next synchronization pass.

use crate::error::Result;
use bridge_traits::SettingsStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const RETENTION_DAYS_KEY: &str = "retention_days";
pub const AUTO_SAVE_KEY: &str = "auto_save";
pub const SOURCE_LOCATION_KEY: &str = "source_location";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// How long CACHED records are kept, in whole days
///
/// Always within `[MIN, MAX]`; out-of-range input is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RetentionDays(i64);

impl RetentionDays {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 60;
    pub const DEFAULT: RetentionDays = RetentionDays(7);

    pub fn clamped(days: i64) -> Self {
        Self(days.clamp(Self::MIN, Self::MAX))
    }

    pub fn days(self) -> i64 {
        self.0
    }

    pub fn as_millis(self) -> i64 {
        self.0 * MILLIS_PER_DAY
    }

    /// Records with `recorded_at` strictly before the cutoff are expired.
    pub fn cutoff(self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.as_millis())
    }
}

impl Default for RetentionDays {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RetentionDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Typed view over the settings store
#[derive(Clone)]
pub struct StatusSettings {
    store: Arc<dyn SettingsStore>,
}

impl StatusSettings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn SettingsStore> {
        Arc::clone(&self.store)
    }

    /// Current retention window; the default when unset.
    pub async fn retention_days(&self) -> Result<RetentionDays> {
        let stored = self.store.get_i64(RETENTION_DAYS_KEY).await?;
        Ok(stored.map(RetentionDays::clamped).unwrap_or_default())
    }

    /// Persist a new retention window, clamped to the allowed range.
    pub async fn set_retention_days(&self, days: i64) -> Result<RetentionDays> {
        let retention = RetentionDays::clamped(days);
        self.store
            .set_i64(RETENTION_DAYS_KEY, retention.days())
            .await?;
        debug!(requested = days, stored = retention.days(), "Updated retention window");
        Ok(retention)
    }

    /// Whether newly cached statuses are promoted automatically.
    pub async fn auto_save_enabled(&self) -> Result<bool> {
        Ok(self.store.get_bool(AUTO_SAVE_KEY).await?.unwrap_or(false))
    }

    pub async fn set_auto_save(&self, enabled: bool) -> Result<()> {
        self.store.set_bool(AUTO_SAVE_KEY, enabled).await?;
        Ok(())
    }

    /// The persisted source directory grant, if any.
    pub async fn source_location(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get_string(SOURCE_LOCATION_KEY)
            .await?
            .filter(|s| !s.is_empty()))
    }

    pub async fn set_source_location(&self, location: &str) -> Result<()> {
        self.store.set_string(SOURCE_LOCATION_KEY, location).await?;
        debug!("Stored source location");
        Ok(())
    }

    /// Forget the source directory grant.
    pub async fn clear_source_location(&self) -> Result<()> {
        self.store.delete(SOURCE_LOCATION_KEY).await?;
        debug!("Cleared source location");
        Ok(())
    }

    pub async fn has_source_location(&self) -> Result<bool> {
        Ok(self.source_location().await?.is_some())
    }
}

impl fmt::Debug for StatusSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSettings").finish_non_exhaustive()
    }
}
