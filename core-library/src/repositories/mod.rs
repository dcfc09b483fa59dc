//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `StatusRepository` - Cached and saved status records
//! - `DownloadMarkerRepository` - Filenames the user holds a permanent copy of

pub mod download;
pub mod status;

pub use download::{DownloadMarkerRepository, SqliteDownloadMarkerRepository};
pub use status::{SqliteStatusRepository, StatusRepository};
