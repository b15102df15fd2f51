//! Error types for curve and patch operations.

use thiserror::Error;

/// Errors that can occur when evaluating or configuring geometry.
///
/// Both kinds are permanent: retrying the same call on the same object
/// produces the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeomError {
    /// The operation is out of scope for this curve or patch variant.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A structural precondition is violated (mismatched counts, missing
    /// profile, non-orthonormal frame, inverted bounds, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl GeomError {
    /// Create a not-implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    /// Create an invalid-configuration error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Whether this is a [`GeomError::NotImplemented`].
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

/// Result alias used throughout the geometry crates.
pub type GeomResult<T> = Result<T, GeomError>;
