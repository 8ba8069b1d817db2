//! Configuration for the fallback provider.

use crate::{FallbackContext, FallbackEvent, FallbackProvider, FallbackStrategy, HandlePredicate};
use resilient_lookup_core::{EventListeners, FnListener, LookupError};
use resilient_lookup_remote::{Operation, Reply};
use std::sync::Arc;

/// Configuration for the fallback provider.
pub struct FallbackConfig {
    pub(crate) name: String,
    pub(crate) strategy: FallbackStrategy,
    pub(crate) handle_predicate: Option<HandlePredicate>,
    pub(crate) event_listeners: EventListeners<FallbackEvent>,
}

/// Builder for constructing a [`FallbackProvider`].
///
/// Without a strategy the provider serves the built-in placeholders.
pub struct FallbackConfigBuilder {
    name: String,
    strategy: FallbackStrategy,
    handle_predicate: Option<HandlePredicate>,
    event_listeners: EventListeners<FallbackEvent>,
}

impl Default for FallbackConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: "fallback".to_string(),
            strategy: FallbackStrategy::Placeholder,
            handle_predicate: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name for this provider (used in metrics and events).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Serves the same reply for every failed call.
    pub fn value(mut self, value: Reply) -> Self {
        self.strategy = FallbackStrategy::Value(value);
        self
    }

    /// Computes the reply from the failed call's context.
    pub fn from_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&FallbackContext<'_>) -> Reply + Send + Sync + 'static,
    {
        self.strategy = FallbackStrategy::FromContext(Arc::new(f));
        self
    }

    /// Computes the reply from the operation alone.
    pub fn per_operation<F>(self, f: F) -> Self
    where
        F: Fn(Operation) -> Reply + Send + Sync + 'static,
    {
        self.from_context(move |ctx| f(ctx.operation))
    }

    pub fn strategy(mut self, strategy: FallbackStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Only serve a fallback for errors matching this predicate.
    ///
    /// Errors that don't match are left for the caller to propagate.
    pub fn handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&LookupError) -> bool + Send + Sync + 'static,
    {
        self.handle_predicate = Some(Arc::new(predicate));
        self
    }

    /// Adds an event listener.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&FallbackEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(listener));
        self
    }

    /// Registers a callback for every applied fallback, called with the
    /// operation and the absorbed error's kind.
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn(Operation, &'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FallbackEvent::Applied {
                operation, cause, ..
            } = event
            {
                f(*operation, *cause);
            }
        }));
        self
    }

    pub fn build_config(self) -> FallbackConfig {
        FallbackConfig {
            name: self.name,
            strategy: self.strategy,
            handle_predicate: self.handle_predicate,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the fallback provider.
    pub fn build(self) -> FallbackProvider {
        FallbackProvider::new(self.build_config())
    }
}
