use crate::circuit::CircuitState;
use crate::classifier::{DefaultClassifier, FnClassifier};
use crate::events::CircuitBreakerEvent;
use crate::layer::CircuitBreakerLayer;
use resilient_lookup_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for one circuit breaker.
///
/// The type parameter `C` is the failure classifier.
pub struct CircuitBreakerConfig<C = DefaultClassifier> {
    pub(crate) failure_threshold: usize,
    pub(crate) reset_timeout: Duration,
    pub(crate) failure_classifier: C,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig<DefaultClassifier> {
    pub fn builder() -> CircuitBreakerConfigBuilder<DefaultClassifier> {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C> CircuitBreakerConfig<C> {
    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a circuit breaker.
///
/// The builder is `Clone` (when the classifier is), so one template can stamp
/// out several independently named breakers.
#[derive(Clone)]
pub struct CircuitBreakerConfigBuilder<C = DefaultClassifier> {
    failure_threshold: usize,
    reset_timeout: Duration,
    failure_classifier: C,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder<DefaultClassifier> {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 1,
            reset_timeout: Duration::from_secs(5),
            failure_classifier: DefaultClassifier,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }
}

impl Default for CircuitBreakerConfigBuilder<DefaultClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CircuitBreakerConfigBuilder<C> {
    /// Number of consecutive countable failures that opens the circuit.
    ///
    /// Values below 1 are treated as 1.
    ///
    /// Default: 1
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.failure_threshold = n.max(1);
        self
    }

    /// How long the circuit stays open before admitting a trial call.
    ///
    /// Default: 5 seconds
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Replaces the failure classifier with a closure.
    ///
    /// Default: [`DefaultClassifier`], which counts only errors that report
    /// themselves as infrastructure failures.
    pub fn failure_classifier<F, Res, Err>(self, f: F) -> CircuitBreakerConfigBuilder<FnClassifier<F>>
    where
        F: Fn(&Result<Res, Err>) -> bool + Send + Sync + 'static,
    {
        self.classifier(FnClassifier::new(f))
    }

    /// Replaces the failure classifier.
    pub fn classifier<C2>(self, classifier: C2) -> CircuitBreakerConfigBuilder<C2> {
        CircuitBreakerConfigBuilder {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            failure_classifier: classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Registers a callback for every state transition, called with
    /// `(from, to)`.
    ///
    /// ```rust
    /// use resilient_lookup_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let layer = CircuitBreakerConfig::builder()
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("breaker opened (was {:?}); serving fallback", from);
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        }));
        self
    }

    /// Registers a callback for admitted calls, with the admitting state.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Registers a callback for short-circuited calls.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback for recorded successes.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Registers a callback for recorded failures, with the consecutive
    /// failure count after the failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::FailureRecorded {
                state,
                consecutive_failures,
                ..
            } = event
            {
                f(*state, *consecutive_failures);
            }
        }));
        self
    }

    /// Builds the configuration without wrapping it in a layer.
    pub fn build_config(self) -> CircuitBreakerConfig<C> {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            failure_classifier: self.failure_classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds a layer that stamps out breakers with this configuration.
    pub fn build(self) -> CircuitBreakerLayer<C> {
        CircuitBreakerLayer::new(self.build_config())
    }
}
