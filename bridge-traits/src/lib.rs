//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the status core and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, Android).
//!
//! ## Traits
//!
//! ### Status Source
//! - [`SourceDirectory`](source::SourceDirectory) - Revocable, read-only view of the external status folder
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Cache and saved-media file I/O
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Platform Integration
//! - [`MediaScanner`](scanner::MediaScanner) - "Content changed at path" hint for the gallery index
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic retention tests
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//! - [`MediaKind`](media::MediaKind) - Extension based image/video classification
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! include the affected path in the message. The source directory is the
//! exception: losing access to it is an expected state, so its listing
//! degrades to an empty list instead of an error.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.
//!
//! ## Examples
//!
//! ### Implementing MediaScanner
//!
//! ```ignore
//! use bridge_traits::scanner::MediaScanner;
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! pub struct LoggingScanner;
//!
//! #[async_trait]
//! impl MediaScanner for LoggingScanner {
//!     async fn scan(&self, path: &Path, mime_type: Option<&'static str>) {
//!         println!("changed: {} ({:?})", path.display(), mime_type);
//!     }
//! }
//! ```

pub mod error;
pub mod media;
pub mod scanner;
pub mod source;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use media::{mime_type, MediaKind};
pub use scanner::MediaScanner;
pub use source::{SourceDirectory, SourceFile};
pub use storage::{FileMetadata, FileSystemAccess, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
