//! scribe-editor-core: Pure Rust editor logic without framework dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait for text storage abstraction
//! - `EditorRope` - ropey-backed local editing buffer
//! - `TextDelta` - prefix/suffix-trimmed edit between two snapshots
//! - `HistoryStack` - bounded, debounced snapshot history with redo
//! - `PendingTimer` - cancellable deadline used by the timer-driven state

pub mod delta;
pub mod history;
pub mod text;
pub mod timer;

pub use delta::TextDelta;
pub use history::{HISTORY_DEBOUNCE, HistoryEntry, HistoryStack, MAX_HISTORY};
pub use smol_str::SmolStr;
pub use text::{EditorRope, TextBuffer};
pub use timer::PendingTimer;
