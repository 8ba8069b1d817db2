//! Consecutive-failure circuit breaker for Tower services.
//!
//! The breaker counts consecutive countable failures of the wrapped service
//! and stops calling it once a threshold is reached.
//!
//! ## States
//! - **Closed**: calls pass through; a countable failure increments the
//!   streak, anything else resets it.
//! - **Open**: calls are short-circuited with
//!   [`CircuitBreakerError::ShortCircuited`] until the reset timeout elapses.
//! - **Half-Open**: exactly one trial call is admitted. Its success closes the
//!   circuit, its failure re-opens it and restarts the timer. Concurrent
//!   callers are short-circuited while the trial is in flight.
//!
//! Which outcomes count is decided by a [`FailureClassifier`]. The default
//! counts only errors that implement [`CountableError`] and report `true`,
//! so for [`LookupError`](resilient_lookup_core::LookupError) timeouts and
//! unreachable endpoints trip the breaker while business rejections do not.
//!
//! ## Usage
//!
//! ```rust
//! use resilient_lookup_circuitbreaker::{CircuitBreakerLayer, CircuitState};
//! use resilient_lookup_core::LookupError;
//! use std::time::Duration;
//! use tower::{service_fn, Service, ServiceExt};
//!
//! # async fn example() {
//! let layer = CircuitBreakerLayer::builder()
//!     .failure_threshold(1)
//!     .reset_timeout(Duration::from_secs(5))
//!     .name("reservationservice/list")
//!     .build();
//!
//! let mut breaker = layer.layer_fn(service_fn(|_: ()| async {
//!     Err::<(), _>(LookupError::Unreachable {
//!         endpoint: "http://10.0.0.7:8000".into(),
//!         reason: "connection refused".into(),
//!     })
//! }));
//!
//! let _ = breaker.ready().await.unwrap().call(()).await;
//! assert_eq!(breaker.state_sync(), CircuitState::Open);
//!
//! let rejected = breaker.ready().await.unwrap().call(()).await;
//! assert!(rejected.unwrap_err().is_short_circuited());
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Dropping the future of a half-open trial returns its permit: the circuit
//! stays half-open and the next call becomes the trial.
//!
//! ## Locking
//!
//! Circuit state sits behind a `std::sync::Mutex` that is never held across
//! an `.await`. Event listeners run while the lock is held, so they must not
//! call back into methods that take it ([`CircuitBreaker::state`],
//! [`CircuitBreaker::metrics`], the overrides). [`CircuitBreaker::state_sync`]
//! is lock-free and safe to call from anywhere.

use crate::circuit::{Admission, Circuit};
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use tower::Service;
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

pub use circuit::{CircuitMetrics, CircuitState};
pub use classifier::{AllErrors, CountableError, DefaultClassifier, FailureClassifier, FnClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

mod circuit;
pub mod classifier;
mod config;
mod error;
mod events;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

fn describe_metrics() {
    #[cfg(feature = "metrics")]
    {
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "circuitbreaker_calls_total",
                "Total number of calls through the circuit breaker by outcome"
            );
            describe_counter!(
                "circuitbreaker_transitions_total",
                "Total number of circuit breaker state transitions"
            );
            describe_gauge!(
                "circuitbreaker_state",
                "Current state of the circuit breaker (0=closed, 1=open, 2=half-open)"
            );
        });
    }
}

/// Returns a new builder for a `CircuitBreakerLayer`.
pub fn circuit_breaker_builder() -> CircuitBreakerConfigBuilder<DefaultClassifier> {
    describe_metrics();
    CircuitBreakerConfigBuilder::default()
}

fn lock(circuit: &Mutex<Circuit>) -> MutexGuard<'_, Circuit> {
    circuit.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A Tower Service that applies circuit breaker logic to an inner service.
///
/// Clones share the same circuit.
pub struct CircuitBreaker<S, C> {
    inner: S,
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig<C>>,
}

impl<S, C> CircuitBreaker<S, C> {
    pub(crate) fn new(inner: S, config: Arc<CircuitBreakerConfig<C>>) -> Self {
        describe_metrics();
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            inner,
            circuit: Arc::new(Mutex::new(Circuit::new_with_atomic(Arc::clone(
                &state_atomic,
            )))),
            state_atomic,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Returns the current state, taking the circuit lock.
    pub fn state(&self) -> CircuitState {
        lock(&self.circuit).state()
    }

    /// Returns the current state without locking.
    ///
    /// The value may trail an in-progress transition by a moment.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state_sync() == CircuitState::Open
    }

    pub fn metrics(&self) -> CircuitMetrics {
        lock(&self.circuit).metrics(&self.config)
    }

    /// Returns "healthy" when closed, "degraded" when half-open and
    /// "unhealthy" when open.
    pub fn health_status(&self) -> &'static str {
        match self.state_sync() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    pub fn force_open(&self) {
        lock(&self.circuit).force_open(&self.config);
    }

    pub fn force_closed(&self) {
        lock(&self.circuit).force_closed(&self.config);
    }

    pub fn reset(&self) {
        lock(&self.circuit).reset(&self.config);
    }
}

impl<S, C> Clone for CircuitBreaker<S, C>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

/// An admitted call that has not reported its outcome yet.
///
/// Dropping an unsettled trial permit returns it to the circuit.
struct Permit<C> {
    circuit: Arc<Mutex<Circuit>>,
    config: Arc<CircuitBreakerConfig<C>>,
    trial: Option<u64>,
    settled: bool,
}

impl<C> Permit<C> {
    fn settle(mut self, failed: bool) {
        self.settled = true;
        let mut circuit = lock(&self.circuit);
        if failed {
            circuit.record_failure(&self.config, self.trial);
        } else {
            circuit.record_success(&self.config, self.trial);
        }
    }
}

impl<C> Drop for Permit<C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(trial) = self.trial {
            lock(&self.circuit).release_trial(&self.config, trial);
        }
    }
}

impl<S, C, Req> Service<Req> for CircuitBreaker<S, C>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    C: FailureClassifier<S::Response, S::Error> + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let admission = lock(&self.circuit).try_acquire(&config);

        let trial = match admission {
            Admission::Rejected => {
                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

                #[cfg(feature = "tracing")]
                trace!(breaker = %config.name, "circuit breaker rejected call");

                return Box::pin(async { Err(CircuitBreakerError::ShortCircuited) });
            }
            Admission::Permitted => None,
            Admission::Trial(token) => {
                #[cfg(feature = "tracing")]
                debug!(breaker = %config.name, "circuit breaker admitted half-open trial");
                Some(token)
            }
        };

        let permit = Permit {
            circuit: Arc::clone(&self.circuit),
            config: Arc::clone(&config),
            trial,
            settled: false,
        };

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let future = inner.call(req);

        Box::pin(async move {
            let result = future.await;
            permit.settle(config.failure_classifier.classify(&result));
            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
