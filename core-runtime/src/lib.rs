//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the status core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Runtime-changeable settings (retention window, auto-save, source location)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the store, the sync engine
//! and the service façade depend on. It establishes the logging conventions
//! and the event broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod settings;

pub use error::{Error, Result};
