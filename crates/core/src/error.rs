//! Error types for the vector store layer
//!
//! One error enum covers every adapter. Configuration and connectivity
//! failures propagate to the caller unmodified. Malformed or empty search
//! responses are not errors: adapters absorb them into empty results.

use std::io;
use thiserror::Error;

/// Errors produced by vector store operations
#[derive(Debug, Error)]
pub enum VdbError {
    /// Backend connection settings are missing or invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// The provisioning lock could not be acquired in time
    #[error("Timed out after {waited_ms}ms acquiring lock '{lock}'")]
    ProvisioningTimeout {
        /// Lock name
        lock: String,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Network or connection failure talking to the engine
    #[error("Backend '{backend}' unavailable: {message}")]
    BackendUnavailable {
        /// Backend identifier
        backend: String,
        /// Transport error message
        message: String,
    },

    /// The engine answered with a non-success status
    #[error("Backend '{backend}' rejected request ({status}): {message}")]
    BackendRejected {
        /// Backend identifier
        backend: String,
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Documents and embeddings are not positionally aligned
    #[error("Length mismatch: {documents} documents, {embeddings} embeddings")]
    LengthMismatch {
        /// Number of documents
        documents: usize,
        /// Number of embeddings
        embeddings: usize,
    },

    /// Embedding dimension doesn't match the collection
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Collection dimension
        expected: usize,
        /// Provided dimension
        got: usize,
    },

    /// Persisted index structure could not be read
    #[error("Invalid index structure: {0}")]
    InvalidIndexStruct(String),

    /// A metadata filter cannot be expressed on this backend
    #[error("Unsupported filter for '{backend}': {reason}")]
    UnsupportedFilter {
        /// Backend identifier
        backend: String,
        /// Why the filter was rejected
        reason: String,
    },

    /// Existence cache failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Lock provider failure (other than timeout)
    #[error("Lock error: {0}")]
    Lock(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error (file-backed cache and locks)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VdbError {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        VdbError::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a connectivity failure
    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        VdbError::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry the whole operation
    ///
    /// This layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            VdbError::ProvisioningTimeout { .. } | VdbError::BackendUnavailable { .. } => true,
            VdbError::BackendRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if this error indicates bad configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, VdbError::Configuration { .. })
    }

    /// Check if this error is a validation error on caller input
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            VdbError::LengthMismatch { .. }
                | VdbError::DimensionMismatch { .. }
                | VdbError::UnsupportedFilter { .. }
        )
    }
}

impl From<serde_json::Error> for VdbError {
    fn from(e: serde_json::Error) -> Self {
        VdbError::Serialization(e.to_string())
    }
}

/// Result type alias for vector store operations
pub type VdbResult<T> = Result<T, VdbError>;
