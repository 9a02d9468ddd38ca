//! Error types for herodex-catalog operations.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog and list operations.
///
/// `Clone` so that a single failed catalog load can be handed to every caller
/// that awaited it.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// One or more request parameters were malformed, out of range or unrecognised.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resource already exists.
    #[error("{entity} already exists: {name}")]
    AlreadyExists {
        /// Kind of resource.
        entity: &'static str,
        /// Resource name.
        name: String,
    },

    /// Resource not found.
    #[error("{entity} not found: {name}")]
    NotFound {
        /// Kind of resource.
        entity: &'static str,
        /// Resource name.
        name: String,
    },

    /// A membership change would violate the duplicate-free or present-before-remove rule.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// The catalog datasets could not be read or joined.
    #[error("catalog data unavailable: {message}")]
    DataUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The list backing store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },
}

impl CatalogError {
    pub(crate) fn list_not_found(name: &str) -> Self {
        Self::NotFound {
            entity: "list",
            name: name.to_string(),
        }
    }

    pub(crate) fn data_unavailable(message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            message: message.into(),
        }
    }
}

impl From<herodex_core::Error> for CatalogError {
    fn from(value: herodex_core::Error) -> Self {
        Self::Storage {
            message: value.to_string(),
        }
    }
}

/// A single offending request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Parameter or body field name as the caller sent it.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Aggregated validation failure listing every offending parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Creates an empty error to accumulate issues into.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error with a single issue.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.push(field, message);
        error
    }

    /// Records an issue.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Moves the issues of `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        self.issues.extend(other.issues);
    }

    /// Returns the recorded issues in the order they were found.
    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Returns `true` when no issue was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `Ok(value)` if no issue was recorded, else `Err(self)`.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid request")?;
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
