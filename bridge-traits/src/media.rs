//! Media Classification
//!
//! Maps filenames to the two media kinds the core understands and to the MIME
//! types hosts need when announcing new content to a gallery index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// Recognized image extensions, lowercase, with the leading dot.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Recognized video extensions, lowercase, with the leading dot.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".3gp", ".mkv", ".avi", ".webm"];

/// Kind of media a status file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a filename by its extension (case-insensitive).
    ///
    /// Returns `None` for hidden files and unrecognized extensions.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if is_hidden(filename) {
            return None;
        }
        let ext = extension_of(filename)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// MIME type used when the extension is not in the lookup table.
    pub fn fallback_mime_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(BridgeError::OperationFailed(format!(
                "unknown media kind: {other}"
            ))),
        }
    }
}

/// Hidden entries (".nomedia" and friends) are never status media.
pub fn is_hidden(filename: &str) -> bool {
    filename.starts_with('.')
}

/// MIME type for a status file, falling back on its media kind.
pub fn mime_type(filename: &str, kind: MediaKind) -> &'static str {
    match extension_of(filename).as_deref() {
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        Some(".png") => "image/png",
        Some(".gif") => "image/gif",
        Some(".webp") => "image/webp",
        Some(".mp4") => "video/mp4",
        Some(".3gp") => "video/3gpp",
        Some(".mkv") => "video/x-matroska",
        Some(".avi") => "video/x-msvideo",
        Some(".webm") => "video/webm",
        _ => kind.fallback_mime_type(),
    }
}

fn extension_of(filename: &str) -> Option<String> {
    let idx = filename.rfind('.')?;
    if idx == 0 {
        return None;
    }
    Some(filename[idx..].to_ascii_lowercase())
}
