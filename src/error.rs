//! Error types for idlink.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific failure conditions and lets the boundary decide
//! retry policy: the engine itself never retries.

use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors raised before the engine performs any storage work.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Neither email nor phone number was supplied (or both were blank).
    #[error("observation must include at least one of email or phoneNumber")]
    EmptyObservation,

    /// A supplied field exceeds the accepted length bound.
    #[error("field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        /// The offending field name.
        field: &'static str,
        /// The enforced bound.
        max_length: usize,
    },
}

/// Top-level error type for idlink.
#[derive(Debug, Error)]
pub enum IdlinkError {
    /// The observation was rejected before reconciliation started.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The contact store could not complete a read or write.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A cluster invariant no longer holds. This is a programming error:
    /// the open transaction is aborted and the failure surfaces loudly
    /// rather than returning an inconsistent view.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },
}

impl IdlinkError {
    /// Creates an invariant-violation error.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns true if the caller may safely retry the whole call.
    ///
    /// Retrying a fully-committed reconcile is a no-op by the redundancy
    /// rule, so transient store failures are the only retriable class.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Storage(StorageError::Unavailable(_) | StorageError::TransactionConflict(_))
        )
    }
}

/// Convenience result alias for fallible idlink operations.
pub type IdlinkResult<T> = Result<T, IdlinkError>;
