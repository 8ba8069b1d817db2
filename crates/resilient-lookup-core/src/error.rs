//! Failure taxonomy for remote lookups.
//!
//! Every stage of a lookup reports failures as a [`LookupError`]. The variant
//! decides what happens next:
//!
//! | Variant | Trips the breaker | Absorbed into fallback |
//! |---------|-------------------|------------------------|
//! | [`DirectoryUnavailable`](LookupError::DirectoryUnavailable) | no | depends on the directory policy |
//! | [`NoEndpointAvailable`](LookupError::NoEndpointAvailable) | no | yes |
//! | [`Timeout`](LookupError::Timeout) | yes | yes |
//! | [`Unreachable`](LookupError::Unreachable) | yes | yes |
//! | [`Remote`](LookupError::Remote) | no | no, always reaches the caller |
//! | [`ShortCircuited`](LookupError::ShortCircuited) | n/a | yes |
//! | [`UnknownService`](LookupError::UnknownService) | no | no |
//! | [`InvalidServiceName`](LookupError::InvalidServiceName) | no | no |
//!
//! # Example
//!
//! ```
//! use resilient_lookup_core::{LookupError, RemoteError};
//! use std::time::Duration;
//!
//! let slow = LookupError::Timeout {
//!     endpoint: "http://10.0.0.7:8080".to_string(),
//!     timeout: Duration::from_millis(250),
//! };
//! assert!(slow.is_breaker_failure());
//! assert!(slow.is_absorbable());
//!
//! let taken: LookupError = RemoteError::Conflict { name: "Jarek".into() }.into();
//! assert!(!taken.is_breaker_failure());
//! assert!(taken.is_business());
//! ```

use std::time::Duration;
use thiserror::Error;

/// An application-level rejection returned by the remote store.
///
/// These reflect valid business-rule outcomes, not infrastructure trouble.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// A reservation with this name already exists.
    #[error("reservation '{name}' already exists")]
    Conflict {
        /// The duplicated name.
        name: String,
    },

    /// No reservation with this name exists.
    #[error("reservation '{name}' not found")]
    NotFound {
        /// The requested name.
        name: String,
    },

    /// No reservation carries this store-assigned id.
    #[error("reservation #{id} not found")]
    UnknownId {
        /// The requested id.
        id: u64,
    },

    /// Any other rejection of a well-formed request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. } | RemoteError::UnknownId { .. })
    }
}

/// Errors produced while resolving, selecting, invoking or short-circuiting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The directory could not be reached. Distinct from "no instances".
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Resolution succeeded but produced no candidates.
    #[error("no endpoint available for service '{service}'")]
    NoEndpointAvailable {
        /// The logical service that had no instances.
        service: String,
    },

    /// The invocation exceeded its deadline.
    #[error("call to {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// URI of the endpoint that was too slow.
        endpoint: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The endpoint could not be reached at the transport level.
    #[error("endpoint {endpoint} unreachable: {reason}")]
    Unreachable {
        /// URI of the endpoint.
        endpoint: String,
        /// Transport-level description.
        reason: String,
    },

    /// The remote store answered with a business-rule rejection.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The breaker guarding this call is open.
    #[error("circuit '{breaker}' is open; call short-circuited")]
    ShortCircuited {
        /// Name of the breaker that rejected the call.
        breaker: String,
    },

    /// The service was not registered when the client was built.
    #[error("service '{0}' is not registered with this client")]
    UnknownService(String),

    /// A service name was empty.
    #[error("service name must not be empty")]
    InvalidServiceName,
}

impl LookupError {
    /// Returns `true` for infrastructure failures that count toward a breaker.
    ///
    /// `Timeout` and `Unreachable` are counted alike; callers that need to
    /// tell slow backends from dead ones can still match on the variant.
    pub fn is_breaker_failure(&self) -> bool {
        matches!(
            self,
            LookupError::Timeout { .. } | LookupError::Unreachable { .. }
        )
    }

    /// Returns `true` for business-rule rejections from the remote store.
    pub fn is_business(&self) -> bool {
        matches!(self, LookupError::Remote(_))
    }

    /// Returns `true` if a facade may replace this error with a fallback.
    ///
    /// `DirectoryUnavailable` is reported as absorbable here; whether it is
    /// actually absorbed is the facade's directory policy.
    pub fn is_absorbable(&self) -> bool {
        matches!(
            self,
            LookupError::DirectoryUnavailable(_)
                | LookupError::NoEndpointAvailable { .. }
                | LookupError::Timeout { .. }
                | LookupError::Unreachable { .. }
                | LookupError::ShortCircuited { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LookupError::Timeout { .. })
    }

    pub fn is_short_circuited(&self) -> bool {
        matches!(self, LookupError::ShortCircuited { .. })
    }

    /// Borrows the business error, if this is one.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            LookupError::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Short, stable label used in events and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::DirectoryUnavailable(_) => "directory_unavailable",
            LookupError::NoEndpointAvailable { .. } => "no_endpoint",
            LookupError::Timeout { .. } => "timeout",
            LookupError::Unreachable { .. } => "unreachable",
            LookupError::Remote(_) => "remote",
            LookupError::ShortCircuited { .. } => "short_circuited",
            LookupError::UnknownService(_) => "unknown_service",
            LookupError::InvalidServiceName => "invalid_service_name",
        }
    }
}
