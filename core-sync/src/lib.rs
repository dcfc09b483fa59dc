//! # Status Synchronization Module
//!
//! Reconciles the source directory with the local status store.
//!
//! ## Overview
//!
//! This module manages:
//! - Copying new source files into the private cache and recording them
//! - Expiring CACHED records outside the retention window
//! - Promoting LIVE or CACHED statuses to permanent SAVED storage
//! - Running passes in the background on an interval or on demand
//!
//! ## Components
//!
//! - **Storage Layout** (`layout`): Where each category's copies live
//! - **Verified Copy** (`transfer`): Stream copy that never leaves a partial file
//! - **Record Removal** (`removal`): Row-authoritative delete of a record and its file
//! - **Sync Coordinator** (`coordinator`): One synchronization pass plus retention
//! - **Promotion Service** (`promotion`): At-most-once save per filename
//! - **Catalog** (`catalog`): Read views over LIVE, CACHED and SAVED
//! - **Sync Monitor** (`monitor`): Background scheduling and auto-save

pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod layout;
pub mod monitor;
pub mod promotion;
pub mod removal;
pub mod transfer;

pub use catalog::{CategoryCounts, LiveStatus, StatusCatalog};
pub use coordinator::{SyncCoordinator, SyncReport};
pub use error::{Result, SyncError};
pub use layout::StorageLayout;
pub use monitor::SyncMonitor;
pub use promotion::{PromotionOutcome, PromotionService};
pub use removal::RecordRemover;
pub use transfer::{copy_verified, sweep_staging, TransferError};
