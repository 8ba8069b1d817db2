//! Configuration for the remote invoker.

use crate::events::InvokerEvent;
use crate::model::Operation;
use resilient_lookup_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration shared by every call made through one invoker.
///
/// The deadline itself travels with each [`Invocation`](crate::Invocation).
pub struct InvokerConfig {
    pub(crate) event_listeners: EventListeners<InvokerEvent>,
    pub(crate) name: String,
}

impl InvokerConfig {
    pub fn builder() -> InvokerConfigBuilder {
        InvokerConfigBuilder::new()
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`InvokerConfig`].
pub struct InvokerConfigBuilder {
    event_listeners: EventListeners<InvokerEvent>,
    name: String,
}

impl InvokerConfigBuilder {
    pub fn new() -> Self {
        Self {
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the name reported in events, logs and metrics.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for calls that succeed within their deadline.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Operation, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InvokerEvent::Success {
                operation,
                duration,
                ..
            } = event
            {
                f(*operation, *duration);
            }
        }));
        self
    }

    /// Registers a callback for calls that fail within their deadline.
    ///
    /// The second argument is the error kind, e.g. `"remote"` or `"unreachable"`.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Operation, &'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InvokerEvent::Error {
                operation, kind, ..
            } = event
            {
                f(*operation, *kind);
            }
        }));
        self
    }

    /// Registers a callback for calls that exceed their deadline.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Operation, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InvokerEvent::Timeout {
                operation, timeout, ..
            } = event
            {
                f(*operation, *timeout);
            }
        }));
        self
    }

    pub fn build(self) -> InvokerConfig {
        InvokerConfig {
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for InvokerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
