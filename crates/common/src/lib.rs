//! ScriptReel Common Utilities
//!
//! Shared infrastructure for all ScriptReel crates:
//! - Error types and result aliases
//! - Run configuration (timeline, subtitles, backend chain, export settings)
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
