use crate::model::Operation;
use resilient_lookup_core::ClientEvent;
use std::time::{Duration, Instant};

/// Events emitted by the [`RemoteInvoker`](crate::RemoteInvoker).
#[derive(Debug, Clone)]
pub enum InvokerEvent {
    /// The remote call completed in time and succeeded.
    Success {
        pattern_name: String,
        timestamp: Instant,
        operation: Operation,
        duration: Duration,
    },
    /// The remote call completed in time with an error.
    Error {
        pattern_name: String,
        timestamp: Instant,
        operation: Operation,
        duration: Duration,
        /// [`LookupError::kind`](resilient_lookup_core::LookupError::kind) of the failure.
        kind: &'static str,
    },
    /// The remote call did not complete before its deadline.
    Timeout {
        pattern_name: String,
        timestamp: Instant,
        operation: Operation,
        timeout: Duration,
    },
}

impl ClientEvent for InvokerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvokerEvent::Success { .. } => "success",
            InvokerEvent::Error { .. } => "error",
            InvokerEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            InvokerEvent::Success { timestamp, .. }
            | InvokerEvent::Error { timestamp, .. }
            | InvokerEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            InvokerEvent::Success { pattern_name, .. }
            | InvokerEvent::Error { pattern_name, .. }
            | InvokerEvent::Timeout { pattern_name, .. } => pattern_name,
        }
    }
}
