//! Media scanner for desktop hosts
//!
//! Desktop file managers watch the filesystem themselves, so the hint is only
//! recorded in the log.

use async_trait::async_trait;
use bridge_traits::scanner::MediaScanner;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct TracingMediaScanner;

impl TracingMediaScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaScanner for TracingMediaScanner {
    async fn scan(&self, path: &Path, mime_type: Option<&'static str>) {
        debug!(path = ?path, mime_type = ?mime_type, "Media content changed");
    }
}
