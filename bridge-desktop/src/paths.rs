//! Default directory layout on desktop platforms

use std::path::PathBuf;

const APP_DIR: &str = "status-keeper";

/// Folder name under the user's pictures directory for saved statuses.
pub const SAVED_FOLDER_NAME: &str = "SA Status Saver";

/// Platform directories used when the host does not supply its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopDirectories {
    pub database_path: PathBuf,
    pub cache_dir: PathBuf,
    pub saved_dir: PathBuf,
}

impl DesktopDirectories {
    /// Resolve the defaults through the `dirs` crate
    ///
    /// - database: `<data dir>/status-keeper/statuses.db`
    /// - cache: `<cache dir>/status-keeper/statuses`
    /// - saved: `<pictures dir>/SA Status Saver`
    pub fn resolve() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| home.join(".local").join("share"))
            .join(APP_DIR);
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
            .join("statuses");
        let saved_dir = dirs::picture_dir()
            .unwrap_or_else(|| home.join("Pictures"))
            .join(SAVED_FOLDER_NAME);

        Self {
            database_path: data_dir.join("statuses.db"),
            cache_dir,
            saved_dir,
        }
    }
}

impl Default for DesktopDirectories {
    fn default() -> Self {
        Self::resolve()
    }
}
