//! Error types.

use thiserror::Error;

/// Annotation lifecycle errors.
///
/// Most misuse is tolerated silently; these are only returned by the strict
/// entry points that ask for them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("No enclosing annotation group")]
    MissingGroup,
    #[error("Annotation is not attached to an element")]
    NotAttached,
}

/// Result type for annotation operations.
pub type AnnotationResult<T> = Result<T, AnnotationError>;
