use crate::classifier::DefaultClassifier;
use crate::config::CircuitBreakerConfig;
use crate::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower Layer that applies circuit breaker behavior to an inner service.
///
/// Every service produced by [`Layer::layer`] gets its own circuit; the
/// configuration is shared.
///
/// ```rust
/// use tower::{ServiceBuilder, service_fn};
/// use resilient_lookup_circuitbreaker::CircuitBreakerLayer;
/// use resilient_lookup_core::LookupError;
/// use std::time::Duration;
///
/// let layer = CircuitBreakerLayer::builder()
///     .failure_threshold(3)
///     .reset_timeout(Duration::from_secs(10))
///     .name("reservationservice/list")
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|req: String| async move { Ok::<_, LookupError>(req) }));
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer<C = DefaultClassifier> {
    config: Arc<CircuitBreakerConfig<C>>,
}

impl<C> CircuitBreakerLayer<C> {
    pub(crate) fn new(config: impl Into<Arc<CircuitBreakerConfig<C>>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Wraps `service`, returning the concrete [`CircuitBreaker`] so callers
    /// keep access to its inspection and override methods.
    pub fn layer_fn<S>(&self, service: S) -> CircuitBreaker<S, C> {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }

    pub fn config(&self) -> &CircuitBreakerConfig<C> {
        &self.config
    }
}

impl CircuitBreakerLayer<DefaultClassifier> {
    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> crate::CircuitBreakerConfigBuilder<DefaultClassifier> {
        crate::circuit_breaker_builder()
    }
}

impl<S, C> Layer<S> for CircuitBreakerLayer<C> {
    type Service = CircuitBreaker<S, C>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
