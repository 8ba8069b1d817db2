//! Failure classification for circuit breaker decisions.
//!
//! A classifier decides whether the outcome of a permitted call counts as a
//! failure. Outcomes that do not count are recorded as successes: the backend
//! answered, even if the answer was a rejection.

use resilient_lookup_core::LookupError;
use std::sync::Arc;

/// Decides whether a call result counts toward opening the breaker.
pub trait FailureClassifier<Res, Err>: Send + Sync {
    /// Returns `true` if `result` is a breaker-countable failure.
    fn classify(&self, result: &Result<Res, Err>) -> bool;
}

/// Errors that know whether they reflect infrastructure trouble.
pub trait CountableError {
    fn counts_as_failure(&self) -> bool;
}

impl CountableError for LookupError {
    fn counts_as_failure(&self) -> bool {
        self.is_breaker_failure()
    }
}

/// Counts only errors that report themselves as infrastructure failures.
///
/// For [`LookupError`] that means `Timeout` and `Unreachable`; a duplicate
/// name or a missing record leaves the breaker alone.
///
/// ```rust
/// use resilient_lookup_circuitbreaker::classifier::{DefaultClassifier, FailureClassifier};
/// use resilient_lookup_core::{LookupError, RemoteError};
/// use std::time::Duration;
///
/// let slow: Result<(), LookupError> = Err(LookupError::Timeout {
///     endpoint: "http://10.0.0.1:8000".into(),
///     timeout: Duration::from_millis(200),
/// });
/// let taken: Result<(), LookupError> =
///     Err(RemoteError::Conflict { name: "Jarek".into() }.into());
///
/// assert!(DefaultClassifier.classify(&slow));
/// assert!(!DefaultClassifier.classify(&taken));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<Res, Err> FailureClassifier<Res, Err> for DefaultClassifier
where
    Err: CountableError,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        matches!(result, Err(e) if e.counts_as_failure())
    }
}

/// Counts every `Err` as a failure, whatever its type.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllErrors;

impl<Res, Err> FailureClassifier<Res, Err> for AllErrors {
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        result.is_err()
    }
}

/// A classifier backed by a closure.
///
/// ```rust
/// use resilient_lookup_circuitbreaker::classifier::{FailureClassifier, FnClassifier};
/// use resilient_lookup_core::LookupError;
///
/// // Only count timeouts; a refused connection fails fast on its own.
/// let classifier = FnClassifier::new(|result: &Result<(), LookupError>| {
///     matches!(result, Err(e) if e.is_timeout())
/// });
///
/// assert!(!classifier.classify(&Ok(())));
/// ```
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> Clone for FnClassifier<F> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<F, Res, Err> FailureClassifier<Res, Err> for FnClassifier<F>
where
    F: Fn(&Result<Res, Err>) -> bool + Send + Sync,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        (self.f)(result)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
