//! Error types for CRDT operations.

use thiserror::Error;

/// Errors that can occur during CRDT operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CrdtError {
    /// Failed to import CRDT data.
    #[error("failed to import CRDT data: {0}")]
    Import(String),

    /// Failed to export CRDT data.
    #[error("failed to export CRDT data: {0}")]
    Export(String),

    /// The shared text has not been attached to the session yet.
    #[error("shared text not initialized")]
    Uninitialized,

    /// The editing session was already closed.
    #[error("editing session closed")]
    SessionClosed,
}

impl From<CrdtError> for scribe_common::ScribeError {
    fn from(e: CrdtError) -> Self {
        scribe_common::ScribeError::Crdt(e.to_string())
    }
}
