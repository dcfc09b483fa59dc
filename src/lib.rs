//! Workspace placeholder crate.
//!
//! This crate exposes the workspace feature flags that map to the individual
//! crates (currently only `core-service`). Host applications can depend on
//! `status-keeper-workspace` and enable `desktop-shims` without wiring each
//! crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
