//! Events emitted by the fallback provider.

use resilient_lookup_remote::Operation;
use resilient_lookup_core::ClientEvent;
use std::time::Instant;

/// Events emitted by the fallback provider.
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    /// A fallback reply replaced a failed call.
    Applied {
        /// Name of the fallback provider.
        pattern_name: String,
        timestamp: Instant,
        /// Logical service of the failed call.
        service: String,
        operation: Operation,
        /// [`LookupError::kind`](resilient_lookup_core::LookupError::kind) of the absorbed error.
        cause: &'static str,
        /// The strategy that produced the reply.
        strategy: &'static str,
    },

    /// The error did not match the handle predicate and was left to propagate.
    Skipped {
        pattern_name: String,
        timestamp: Instant,
        service: String,
        operation: Operation,
        cause: &'static str,
    },
}

impl ClientEvent for FallbackEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Skipped { .. } => "skipped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Applied { timestamp, .. } | Self::Skipped { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::Applied { pattern_name, .. } | Self::Skipped { pattern_name, .. } => {
                pattern_name
            }
        }
    }
}
