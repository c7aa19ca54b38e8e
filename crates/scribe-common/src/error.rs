//! Error types shared across scribe crates.

use miette::Diagnostic;

/// Main error type for scribe operations outside the sync engine itself.
///
/// The engine's edit paths are total and never surface errors; this type
/// covers configuration, file IO and the outer tooling.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ScribeError {
    /// IO error
    #[error(transparent)]
    #[diagnostic(code(scribe::io))]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error(transparent)]
    #[diagnostic(code(scribe::serde::json))]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error(transparent)]
    #[diagnostic(code(scribe::serde::toml))]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    #[diagnostic(code(scribe::serde::toml))]
    TomlSer(#[from] toml::ser::Error),

    /// Config file extension we don't know how to read.
    #[error("unsupported config format: {0}")]
    #[diagnostic(
        code(scribe::config::format),
        help("use a `.json` or `.toml` file")
    )]
    UnsupportedFormat(String),

    /// Config values that parsed but make no sense.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(scribe::config::invalid))]
    InvalidConfig(String),

    /// Error bubbled up from the CRDT layer.
    #[error("crdt error: {0}")]
    #[diagnostic(code(scribe::crdt))]
    Crdt(String),
}

pub type Result<T, E = ScribeError> = std::result::Result<T, E>;
