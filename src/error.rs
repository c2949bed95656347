//! Error types for source enumeration and field extraction.
//!
//! Every failure in this crate is per-locator or per-field: nothing here is
//! fatal to a run. The pipeline catches these errors at stage boundaries,
//! reports them to the error sink, and keeps going.

use std::io;
use thiserror::Error;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while opening sources or reading fields.
#[derive(Error, Debug)]
pub enum ScanError {
    /// I/O error occurred while opening a locator's backing file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Locator resolves to no existing machine, directory, or file.
    #[error("'{0}' not found")]
    LocatorNotFound(String),

    /// Installation media does not contain the expected deployment image.
    #[error("cannot find {path} in image")]
    MissingImageFile {
        /// In-image path that was searched for.
        path: String,
    },

    /// Registry hive was opened but the expected branch is missing.
    #[error("registry branch '{0}' not found")]
    BranchNotFound(String),

    /// A media collaborator failed while opening or detecting a format.
    #[error("{0}")]
    SourceOpen(String),

    /// Operation requires native registry access the platform lacks.
    #[error("{operation} is only supported on Windows")]
    PlatformUnsupported {
        /// What was attempted, e.g. "querying the current machine".
        operation: String,
    },

    /// A value reader failed for one field; surfaced as an absent value.
    #[error("field '{name}' unreadable: {message}")]
    FieldRead {
        /// Field name that was requested.
        name: String,
        /// Collaborator-reported cause.
        message: String,
    },
}

impl ScanError {
    /// Creates a collaborator open/detect failure with context.
    ///
    /// # Arguments
    ///
    /// * `message` - Description of what the collaborator rejected
    pub fn source_open(message: impl Into<String>) -> Self {
        Self::SourceOpen(message.into())
    }

    /// Creates an unsupported-platform error.
    ///
    /// # Arguments
    ///
    /// * `operation` - The operation that is unavailable, in gerund form
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prodkey::error::ScanError;
    /// let err = ScanError::platform_unsupported("querying the current machine");
    /// assert_eq!(
    ///     err.to_string(),
    ///     "querying the current machine is only supported on Windows"
    /// );
    /// ```
    pub fn platform_unsupported(operation: impl Into<String>) -> Self {
        Self::PlatformUnsupported {
            operation: operation.into(),
        }
    }

    /// Creates a per-field read failure.
    ///
    /// # Arguments
    ///
    /// * `name` - Field name that was requested
    /// * `message` - Why the read failed
    pub fn field_read(name: &str, message: impl Into<String>) -> Self {
        Self::FieldRead {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
