//! Error handling for the router.
//!
//! Every public navigation method returns [`NavigationResult`]. The error side
//! is one of three failure kinds:
//!
//! - [`NavigationError::InvalidArgument`]: the call itself was malformed and
//!   is rejected before anything else happens.
//! - [`NavigationError::NavigationBlocked`]: the before-guard resolved
//!   `false`.
//! - [`NavigationError::HostNavigationFailed`]: the host primitive reported
//!   failure; wraps the host's raw [`HostError`].
//!
//! Blocked and failed navigations are reported to the error callback first and
//! then returned to the caller. Nothing is retried.
//!
//! # Examples
//!
//! ```
//! use miniapp_navigator::{NavigationError, Operation};
//!
//! let err = NavigationError::blocked(Operation::NavigateTo);
//! assert!(err.is_blocked());
//! assert_eq!(err.to_string(), "navigation blocked by before-guard: navigateTo");
//! ```

use crate::host::Operation;
use thiserror::Error;

/// Result alias used by every navigation entry point.
pub type NavigationResult<T> = Result<T, NavigationError>;

/// Raw failure reported by the host navigation primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    /// Host-provided message (`errMsg` on most hosts).
    pub message: String,
}

impl HostError {
    /// Create a host error from its raw message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Detailed error variants that can occur during navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// A navigation target was neither a path nor a well-formed request.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The before-guard resolved `false`.
    #[error("navigation blocked by before-guard: {operation}")]
    NavigationBlocked { operation: Operation },

    /// The host primitive reported failure.
    #[error("{operation} failed: {source}")]
    HostNavigationFailed {
        operation: Operation,
        #[source]
        source: HostError,
    },
}

impl NavigationError {
    /// Shorthand for [`NavigationError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`NavigationError::NavigationBlocked`].
    pub fn blocked(operation: Operation) -> Self {
        Self::NavigationBlocked { operation }
    }

    /// Shorthand for [`NavigationError::HostNavigationFailed`].
    pub fn host_failed(operation: Operation, source: HostError) -> Self {
        Self::HostNavigationFailed { operation, source }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::NavigationBlocked { .. })
    }

    pub fn is_host_failure(&self) -> bool {
        matches!(self, Self::HostNavigationFailed { .. })
    }

    /// The operation this error belongs to, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::InvalidArgument { .. } => None,
            Self::NavigationBlocked { operation } | Self::HostNavigationFailed { operation, .. } => {
                Some(*operation)
            }
        }
    }
}
