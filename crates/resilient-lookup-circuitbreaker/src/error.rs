use thiserror::Error;

/// Errors returned by the `CircuitBreaker` service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker is open, or a half-open trial is already in flight.
    /// The inner service was not called.
    #[error("circuit is open; call short-circuited")]
    ShortCircuited,

    /// An error returned by the inner service.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_short_circuited(&self) -> bool {
        matches!(self, CircuitBreakerError::ShortCircuited)
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::ShortCircuited => None,
        }
    }
}

impl<E> From<E> for CircuitBreakerError<E> {
    fn from(err: E) -> Self {
        CircuitBreakerError::Inner(err)
    }
}
