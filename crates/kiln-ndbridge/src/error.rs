//! Error Types for the ndarray Bridge
//!
//! Conversions either fully succeed or fail synchronously; the first error
//! aborts the whole conversion and any partially built destination is
//! dropped before it ever reaches the caller.
//!
//! ## Error Categories
//!
//! - `InvalidArgument`: malformed input at the boundary (corrupt string
//!   tensor, non-scalar resource tensor, size mismatches in declared data)
//! - `Internal`: unexpected failure inside the bridge's own logic
//! - `UnsupportedDtype`: dtype lookup failures, surfaced verbatim from the
//!   descriptor registry

use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Malformed input to the conversion boundary
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the malformed input
        message: String,
    },

    /// Unexpected failure inside the bridge itself
    #[error("internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },

    /// Dtype has no registered descriptor mapping
    #[error("unsupported dtype: {dtype}")]
    UnsupportedDtype {
        /// The unsupported dtype name
        dtype: String,
    },
}

impl BridgeError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BridgeError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        BridgeError::Internal {
            message: message.into(),
        }
    }

    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: impl Into<String>) -> Self {
        BridgeError::UnsupportedDtype {
            dtype: dtype.into(),
        }
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, BridgeError::InvalidArgument { .. })
    }

    /// Check if this is an internal error
    pub fn is_internal(&self) -> bool {
        matches!(self, BridgeError::Internal { .. })
    }

    /// Check if this is a dtype lookup error
    pub fn is_unsupported_dtype(&self) -> bool {
        matches!(self, BridgeError::UnsupportedDtype { .. })
    }
}
