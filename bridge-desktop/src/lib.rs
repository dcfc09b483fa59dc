//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`
//! - `SourceDirectory` over a local folder (fixed, or read from settings)
//! - `SettingsStore` using SQLite-backed key-value store
//! - `MediaScanner` that logs the change hint
//! - `DesktopDirectories` resolving default paths with `dirs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{LocalSourceDirectory, TokioFileSystem};
//! use bridge_traits::SourceDirectory;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = LocalSourceDirectory::new("/home/me/statuses");
//!     let fs = TokioFileSystem::new();
//!     println!("{} files", source.list_files().await.len());
//! }
//! ```

mod filesystem;
mod paths;
mod scanner;
mod settings;
mod source;

pub use filesystem::TokioFileSystem;
pub use paths::{DesktopDirectories, SAVED_FOLDER_NAME};
pub use scanner::TracingMediaScanner;
pub use settings::SqliteSettingsStore;
pub use source::LocalSourceDirectory;
