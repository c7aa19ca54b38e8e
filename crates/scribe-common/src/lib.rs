//! Shared plumbing for scribe crates: configuration, errors, telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

pub use crate::config::{EditorConfig, FileStore, Loader, Saver};
pub use crate::error::{Result, ScribeError};
