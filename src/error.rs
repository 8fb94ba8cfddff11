//! Error types and handling infrastructure for ledseq.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! the library's error type. The binary layers `anyhow` on top for argument handling.
//!
//! ## Error classes
//!
//! - **Configuration**: unknown animation type, duplicate registration, bad option.
//!   Fatal at sequence build time.
//! - **Source acquisition**: a text source failed to refresh. Recovered locally by
//!   the source, which keeps its last good value.
//! - **Teardown timeout**: a background task ignored its stop signal. Recovered by
//!   aborting the task.
//! - **Display sink**: a frame could not be written. The tick is skipped; repeated
//!   failures become fatal.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ledseq operations.
#[derive(Error, Debug)]
pub enum LedseqError {
    /// No constructor is registered under this animation type name
    #[error("Unknown animation type: {name}")]
    UnknownAnimationType { name: String },

    /// A constructor was registered twice under the same name
    #[error("Animation type already registered: {name}")]
    DuplicateType { name: String },

    /// An animation option is missing, malformed or out of range
    #[error("Invalid configuration for option '{option}': {message}")]
    InvalidConfiguration { option: String, message: String },

    /// Run-file or sequence level configuration problems
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// A text source failed to acquire fresh content
    #[error("{source_kind} source failed: {message}")]
    SourceAcquisition {
        source_kind: &'static str,
        message: String,
    },

    /// A background task did not stop within its grace period
    #[error("Background task for '{name}' did not stop within its grace period")]
    TeardownTimeout { name: String },

    /// The display sink rejected a pixel write or flush
    #[error("Display sink failed: {message}")]
    DisplaySink { message: String },

    /// File system related errors
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },
}

/// Standard Result type for ledseq operations.
pub type Result<T> = std::result::Result<T, LedseqError>;

impl LedseqError {
    /// Create an InvalidConfiguration error naming the offending option
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a SourceAcquisition error for the given source kind
    pub fn acquisition(source_kind: &'static str, message: impl Into<String>) -> Self {
        Self::SourceAcquisition {
            source_kind,
            message: message.into(),
        }
    }

    /// Create a TeardownTimeout error for the named owner
    pub fn teardown_timeout(name: impl Into<String>) -> Self {
        Self::TeardownTimeout { name: name.into() }
    }

    /// Create a DisplaySink error with a descriptive message
    pub fn display_sink(message: impl Into<String>) -> Self {
        Self::DisplaySink {
            message: message.into(),
        }
    }

    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// True for errors that must abort sequence construction
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownAnimationType { .. }
                | Self::DuplicateType { .. }
                | Self::InvalidConfiguration { .. }
                | Self::ConfigError { .. }
        )
    }
}

impl From<std::io::Error> for LedseqError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
