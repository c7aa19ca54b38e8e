//! Loro-backed sync engine for a single shared text document.
//!
//! This crate provides:
//! - `LoroTextBuffer`: Loro-backed text buffer implementing `TextBuffer`
//! - `apply_delta`: whole-buffer changes committed as minimal tagged edits
//! - `UndoRedoController`: snapshot undo/redo with a settle guard
//! - `ConnectionStatusMonitor`: OS reachability + transport status folding
//! - `EditingSession`: the facade tying local buffer, history and shared text together
//! - `SessionDriver`: tokio event loop around a session (native only)

mod buffer;
mod connection;
mod error;
mod origin;
mod patcher;
mod session;
mod undo;

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub mod driver;

pub use buffer::{CONTENT_CONTAINER, LoroTextBuffer};
pub use connection::{
    ConnectionStatus, ConnectionStatusMonitor, Reachability, Transport, TransportStatus,
};
pub use error::CrdtError;
pub use origin::{Origin, SharedTextUpdate};
pub use patcher::apply_delta;
pub use session::{EditingSession, SessionSnapshot};
pub use undo::{SETTLE_DELAY, UndoContext, UndoOutcome, UndoRedoController, UndoRedoPhase};

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub use driver::{EditorState, SessionCommand, SessionDriver, SessionInputs};

// Re-export Loro types that consumers need
pub use loro::{ExportMode, LoroDoc, LoroText, VersionVector};
