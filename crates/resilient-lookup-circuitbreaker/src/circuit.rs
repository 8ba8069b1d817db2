use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow to the backend.
    Closed = 0,
    /// Calls are short-circuited until the reset timeout elapses.
    Open = 1,
    /// Exactly one trial call is allowed through.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of circuit breaker counters for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    /// Countable failures since the last success or transition.
    pub consecutive_failures: usize,
    pub failure_threshold: usize,
    pub total_successes: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
    /// Whether a half-open trial call currently holds the permit.
    pub trial_in_flight: bool,
    pub time_since_state_change: Duration,
}

/// Outcome of asking the circuit for permission to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Rejected,
    Permitted,
    /// The half-open trial; the token identifies it when it settles.
    Trial(u64),
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    consecutive_failures: usize,
    trial_in_flight: bool,
    trial_epoch: u64,
    total_successes: u64,
    total_failures: u64,
    rejected_calls: u64,
}

impl Circuit {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::new_with_atomic(Arc::new(AtomicU8::new(CircuitState::Closed as u8)))
    }

    pub(crate) fn new_with_atomic(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            consecutive_failures: 0,
            trial_in_flight: false,
            trial_epoch: 0,
            total_successes: 0,
            total_failures: 0,
            rejected_calls: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn metrics<C>(&self, config: &CircuitBreakerConfig<C>) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            failure_threshold: config.failure_threshold,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            rejected_calls: self.rejected_calls,
            trial_in_flight: self.trial_in_flight,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Decides whether a call may proceed.
    ///
    /// An open circuit whose reset timeout has elapsed moves to half-open and
    /// hands the caller the single trial permit. While that permit is held,
    /// every other caller is rejected.
    pub fn try_acquire<C>(&mut self, config: &CircuitBreakerConfig<C>) -> Admission {
        let admission = match self.state {
            CircuitState::Closed => Admission::Permitted,
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.reset_timeout {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.grant_trial()
                } else {
                    Admission::Rejected
                }
            }
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    Admission::Rejected
                } else {
                    self.grant_trial()
                }
            }
        };

        match admission {
            Admission::Rejected => {
                self.rejected_calls += 1;
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallRejected {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                    });
            }
            Admission::Permitted | Admission::Trial(_) => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        pattern_name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        state: self.state,
                    });
            }
        }

        admission
    }

    fn grant_trial(&mut self) -> Admission {
        self.trial_in_flight = true;
        self.trial_epoch += 1;
        Admission::Trial(self.trial_epoch)
    }

    fn owns_trial(&self, trial: Option<u64>) -> bool {
        self.state == CircuitState::HalfOpen
            && self.trial_in_flight
            && trial == Some(self.trial_epoch)
    }

    /// Records an outcome the classifier did not count as a failure.
    ///
    /// Only the current trial may close a half-open circuit. Late results from
    /// calls admitted before the circuit opened are tallied and otherwise
    /// ignored.
    pub fn record_success<C>(&mut self, config: &CircuitBreakerConfig<C>, trial: Option<u64>) {
        self.total_successes += 1;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        if self.owns_trial(trial) {
            self.transition_to(CircuitState::Closed, config);
        } else if self.state == CircuitState::Closed {
            self.consecutive_failures = 0;
        }
    }

    /// Records a countable failure.
    pub fn record_failure<C>(&mut self, config: &CircuitBreakerConfig<C>, trial: Option<u64>) {
        self.total_failures += 1;

        let reopen = self.owns_trial(trial);
        if !reopen && self.state == CircuitState::Closed {
            self.consecutive_failures += 1;
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
                consecutive_failures: self.consecutive_failures,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        if reopen
            || (self.state == CircuitState::Closed
                && self.consecutive_failures >= config.failure_threshold)
        {
            self.transition_to(CircuitState::Open, config);
        }
    }

    /// Returns the trial permit of a call that was dropped before it settled.
    ///
    /// The circuit stays half-open and the next caller becomes the trial.
    pub fn release_trial<C>(&mut self, config: &CircuitBreakerConfig<C>, trial: u64) {
        if !self.owns_trial(Some(trial)) {
            return;
        }
        self.trial_in_flight = false;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::TrialAbandoned {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
            });

        #[cfg(feature = "tracing")]
        tracing::debug!(breaker = %config.name, "half-open trial abandoned; permit released");
    }

    pub fn force_open<C>(&mut self, config: &CircuitBreakerConfig<C>) {
        self.transition_to(CircuitState::Open, config);
    }

    pub fn force_closed<C>(&mut self, config: &CircuitBreakerConfig<C>) {
        self.transition_to(CircuitState::Closed, config);
    }

    /// Closes the circuit and clears every counter.
    pub fn reset<C>(&mut self, config: &CircuitBreakerConfig<C>) {
        self.transition_to(CircuitState::Closed, config);
        self.consecutive_failures = 0;
        self.total_successes = 0;
        self.total_failures = 0;
        self.rejected_calls = 0;
    }

    fn transition_to<C>(&mut self, state: CircuitState, config: &CircuitBreakerConfig<C>) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = %from_state, to = %state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.consecutive_failures = 0;
        self.trial_in_flight = false;
    }
}
