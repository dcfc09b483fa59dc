//! # Local Status Store
//!
//! Owns the status database and provides repository patterns for data access.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite connection pooling, schema and migrations
//! - Status records for the CACHED and SAVED categories
//! - Download markers, a fast "already saved" lookup keyed by filename
//!
//! LIVE records are a view over the source directory and are never stored.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{close_pool, create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    Category, CategoryPolicy, DownloadMarker, MediaKind, NewStatusRecord, StatusId, StatusRecord,
};
pub use repositories::{
    DownloadMarkerRepository, SqliteDownloadMarkerRepository, SqliteStatusRepository,
    StatusRepository,
};
