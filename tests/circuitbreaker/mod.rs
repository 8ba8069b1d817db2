//! Tests for the consecutive-failure circuit breaker.
//!
//! Test organization:
//! - integration.rs: thresholds, classification, listeners
//! - half_open.rs: trial outcomes, abandoned trials
//! - concurrency.rs: racing callers at the open/half-open boundary

mod concurrency;
mod half_open;
mod integration;

use resilient_lookup_circuitbreaker::{CircuitBreaker, CircuitBreakerLayer, DefaultClassifier};
use resilient_lookup_discovery::Endpoint;
use resilient_lookup_remote::{InMemoryStore, Invocation, InvokerConfig, RemoteInvoker, Request};
use std::sync::Arc;
use std::time::Duration;

pub type Guarded = CircuitBreaker<RemoteInvoker<InMemoryStore>, DefaultClassifier>;

/// A breaker over an invoker over `store`.
pub fn guarded(store: Arc<InMemoryStore>, layer: CircuitBreakerLayer) -> Guarded {
    layer.layer_fn(RemoteInvoker::from_shared(store, InvokerConfig::default()))
}

pub fn list(timeout: Duration) -> Invocation {
    Invocation {
        endpoint: Endpoint::http("10.0.0.7", 8000),
        request: Request::List,
        timeout,
    }
}
