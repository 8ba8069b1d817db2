//! Endpoint selection policies.

use crate::endpoint::{Endpoint, ServiceName};
use resilient_lookup_core::LookupError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Picks one endpoint out of a resolved candidate list.
///
/// Implementations must be deterministic for a given input and internal
/// state; ties are broken by input order.
pub trait Selector: Send + Sync {
    /// Returns the chosen candidate, or
    /// [`LookupError::NoEndpointAvailable`] when `candidates` is empty.
    fn pick<'a>(
        &self,
        service: &ServiceName,
        candidates: &'a [Endpoint],
    ) -> Result<&'a Endpoint, LookupError>;
}

impl<S> Selector for Arc<S>
where
    S: Selector + ?Sized,
{
    fn pick<'a>(
        &self,
        service: &ServiceName,
        candidates: &'a [Endpoint],
    ) -> Result<&'a Endpoint, LookupError> {
        (**self).pick(service, candidates)
    }
}

fn no_endpoint(service: &ServiceName) -> LookupError {
    LookupError::NoEndpointAvailable {
        service: service.to_string(),
    }
}

/// Always the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl Selector for FirstAvailable {
    fn pick<'a>(
        &self,
        service: &ServiceName,
        candidates: &'a [Endpoint],
    ) -> Result<&'a Endpoint, LookupError> {
        candidates.first().ok_or_else(|| no_endpoint(service))
    }
}

/// Cycles through candidates with a shared cursor.
///
/// The cursor is taken modulo the current candidate count, so instances
/// joining or leaving just shift the rotation.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn pick<'a>(
        &self,
        service: &ServiceName,
        candidates: &'a [Endpoint],
    ) -> Result<&'a Endpoint, LookupError> {
        if candidates.is_empty() {
            return Err(no_endpoint(service));
        }
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(&candidates[n % candidates.len()])
    }
}
