//! Core error type.
//!
//! Sub-crates define their own error enums (`NetworkError`, `DetourError`,
//! `OutputError`) and wrap `CoreError` where configuration problems surface.

use thiserror::Error;

/// Errors raised by `bd-core`: configuration validation and parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `bd-core`.
pub type CoreResult<T> = Result<T, CoreError>;
