//! Storage layout for local copies
//!
//! CACHED copies sit flat in the private cache directory. SAVED copies are
//! split by media kind under the gallery-visible saved directory. LIVE files
//! are never copied.

use core_library::{Category, MediaKind};
use std::path::{Path, PathBuf};

pub const SAVED_IMAGES_DIR: &str = "Images";
pub const SAVED_VIDEOS_DIR: &str = "Videos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    cache_dir: PathBuf,
    saved_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(cache_dir: impl Into<PathBuf>, saved_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            saved_dir: saved_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn saved_dir(&self) -> &Path {
        &self.saved_dir
    }

    /// Directory holding copies of `category` / `kind`, if the category is stored.
    pub fn directory_for(&self, category: Category, kind: MediaKind) -> Option<PathBuf> {
        match category {
            Category::Live => None,
            Category::Cached => Some(self.cache_dir.clone()),
            Category::Saved => Some(self.saved_dir.join(match kind {
                MediaKind::Image => SAVED_IMAGES_DIR,
                MediaKind::Video => SAVED_VIDEOS_DIR,
            })),
        }
    }

    /// Destination path for `filename`.
    ///
    /// `None` for LIVE and for names that are not a single path component.
    pub fn destination(
        &self,
        category: Category,
        kind: MediaKind,
        filename: &str,
    ) -> Option<PathBuf> {
        if !is_plain_filename(filename) {
            return None;
        }
        self.directory_for(category, kind).map(|dir| dir.join(filename))
    }
}

fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\', '\0'])
}
