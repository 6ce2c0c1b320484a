//! Error types for the ovfkit core library.

use std::path::PathBuf;

/// The main error type for ovfkit operations.
///
/// Every variant is fatal to the call that produced it. Recoverable per-record
/// problems are logged through `tracing` instead and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Malformed XML document.
    #[error("XML parse error: {message}")]
    Xml { message: String },

    /// OVF content violates an invariant required to produce a trustworthy result.
    #[error("OVF error: {message}")]
    Ovf { message: String },
}

/// A specialized Result type for ovfkit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create an XML parse error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }

    /// Create an OVF validation error.
    pub fn ovf(message: impl Into<String>) -> Self {
        Self::Ovf {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::xml(err.to_string())
    }
}
