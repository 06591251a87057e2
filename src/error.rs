//! Centralized error types for eml2html.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the eml2html library.
///
/// Most parsing problems never reach this type: broken headers and content
/// types are repaired in place. What remains are I/O failures and parts
/// whose content cannot be read at all.
#[derive(Error, Debug)]
pub enum RenderError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("Email file not found: {0}")]
    FileNotFound(PathBuf),

    /// A header value could not be decoded (unknown charset, invalid encoded-word payload).
    #[error("Unreadable header: {0}")]
    UnreadableHeader(String),

    /// The content of a MIME part could not be transfer-decoded.
    #[error("Unreadable part ({content_type}): {reason}")]
    UnreadablePart {
        content_type: String,
        reason: String,
    },

    /// A visitor failed while walking the MIME tree; the walk was aborted.
    #[error("MIME tree walk aborted at depth {depth}: {source}")]
    TreeWalkAborted {
        depth: usize,
        #[source]
        source: Box<RenderError>,
    },
}

/// Convenience alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;

impl RenderError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `RenderError::io`).
impl From<std::io::Error> for RenderError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
