//! Deterministic fallback replies for failed lookups.
//!
//! When a lookup fails for an infrastructure reason (timeout, unreachable
//! endpoint, open breaker, nothing registered) the facade asks a
//! [`FallbackProvider`] for a local reply instead of surfacing the error.
//! Providers are total: every operation gets a reply, and the same inputs
//! always produce the same reply.
//!
//! # Strategies
//!
//! ## Placeholders (default)
//!
//! ```rust
//! use resilient_lookup_core::LookupError;
//! use resilient_lookup_discovery::ServiceName;
//! use resilient_lookup_fallback::FallbackProvider;
//! use resilient_lookup_remote::{Operation, Reply};
//!
//! let provider = FallbackProvider::default();
//! let service = ServiceName::new("reservationservice").unwrap();
//! let cause = LookupError::NoEndpointAvailable { service: service.to_string() };
//!
//! let names: Vec<_> = provider
//!     .provide(&service, Operation::List, &cause)
//!     .into_reservations()
//!     .into_iter()
//!     .map(|r| r.name)
//!     .collect();
//! assert_eq!(names, ["This", "is", "fallback"]);
//!
//! assert_eq!(provider.provide(&service, Operation::Create, &cause), Reply::Unavailable);
//! ```
//!
//! Writes are answered with [`Reply::Unavailable`] so callers can tell a
//! degraded acknowledgement from a real one.
//!
//! ## Static Value
//!
//! ```rust
//! use resilient_lookup_fallback::FallbackProvider;
//! use resilient_lookup_remote::Reply;
//!
//! let provider = FallbackProvider::builder()
//!     .value(Reply::Reservations(Vec::new()))
//!     .build();
//! ```
//!
//! ## From Context
//!
//! ```rust
//! use resilient_lookup_fallback::FallbackProvider;
//! use resilient_lookup_remote::{Operation, Reply, Reservation};
//!
//! let provider = FallbackProvider::builder()
//!     .from_context(|ctx| match ctx.operation {
//!         Operation::List => Reply::Reservations(vec![Reservation::new(format!("{} is down", ctx.service))]),
//!         _ => Reply::Unavailable,
//!     })
//!     .build();
//! ```
//!
//! # Events
//!
//! - `Applied`: a fallback reply replaced a failed call
//! - `Skipped`: the error did not match the handle predicate

mod config;
mod events;

pub use config::{FallbackConfig, FallbackConfigBuilder};
pub use events::FallbackEvent;

use resilient_lookup_core::LookupError;
use resilient_lookup_discovery::ServiceName;
use resilient_lookup_remote::{Operation, Reply, Reservation};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Names served for a failed `List`.
pub const PLACEHOLDER_NAMES: [&str; 3] = ["This", "is", "fallback"];

/// Name of the record served for a failed `GetByName` or `GetById`.
pub const PLACEHOLDER_RESERVATION: &str = "fallback";

/// The built-in placeholder reply for `operation`.
pub fn placeholder(operation: Operation) -> Reply {
    match operation {
        Operation::List => Reply::Reservations(
            PLACEHOLDER_NAMES
                .iter()
                .map(|name| Reservation::new(*name))
                .collect(),
        ),
        Operation::GetByName | Operation::GetById => {
            Reply::Reservation(Reservation::new(PLACEHOLDER_RESERVATION))
        }
        Operation::Create | Operation::DeleteByName => Reply::Unavailable,
    }
}

/// What the provider knows about the failed call.
#[derive(Debug, Clone, Copy)]
pub struct FallbackContext<'a> {
    pub service: &'a ServiceName,
    pub operation: Operation,
    pub error: &'a LookupError,
}

/// Function that computes a fallback reply from the failed call's context.
pub type FromContextFn = Arc<dyn Fn(&FallbackContext<'_>) -> Reply + Send + Sync>;

/// Predicate to determine if an error should be answered with a fallback.
pub type HandlePredicate = Arc<dyn Fn(&LookupError) -> bool + Send + Sync>;

/// The strategy used to produce a fallback reply.
#[derive(Clone)]
pub enum FallbackStrategy {
    /// The built-in [`placeholder`] for each operation.
    Placeholder,

    /// Return a fixed reply (cloned for each fallback).
    Value(Reply),

    /// Compute a reply from the context.
    FromContext(FromContextFn),
}

impl FallbackStrategy {
    fn label(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::Value(_) => "value",
            Self::FromContext(_) => "from_context",
        }
    }

    fn apply(&self, ctx: &FallbackContext<'_>) -> Reply {
        match self {
            Self::Placeholder => placeholder(ctx.operation),
            Self::Value(reply) => reply.clone(),
            Self::FromContext(f) => f(ctx),
        }
    }
}

impl fmt::Debug for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(reply) => f.debug_tuple("Value").field(reply).finish(),
            other => f.write_str(other.label()),
        }
    }
}

/// Produces local replies for calls that could not be served remotely.
///
/// Cheap to clone; clones share configuration and listeners.
#[derive(Clone)]
pub struct FallbackProvider {
    config: Arc<FallbackConfig>,
}

impl FallbackProvider {
    pub fn new(config: FallbackConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "fallback_calls_total",
                "Total number of failed lookups answered (or skipped) by the fallback provider"
            );
        });

        Self {
            config: Arc::new(config),
        }
    }

    pub fn builder() -> FallbackConfigBuilder {
        FallbackConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Whether this provider wants to answer `error`.
    pub fn handles(&self, error: &LookupError) -> bool {
        self.config
            .handle_predicate
            .as_ref()
            .map(|p| p(error))
            .unwrap_or(true)
    }

    /// Produces the fallback reply for a failed call.
    ///
    /// Ignores the handle predicate; see [`try_provide`](Self::try_provide).
    pub fn provide(
        &self,
        service: &ServiceName,
        operation: Operation,
        error: &LookupError,
    ) -> Reply {
        let ctx = FallbackContext {
            service,
            operation,
            error,
        };
        let reply = self.config.strategy.apply(&ctx);
        let strategy = self.config.strategy.label();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            fallback = %self.config.name,
            service = %service,
            operation = %operation,
            cause = error.kind(),
            strategy,
            "serving fallback reply"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "fallback_calls_total",
            "fallback" => self.config.name.clone(),
            "operation" => operation.as_str(),
            "cause" => error.kind(),
            "result" => "applied"
        )
        .increment(1);

        self.config.event_listeners.emit(&FallbackEvent::Applied {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            service: service.to_string(),
            operation,
            cause: error.kind(),
            strategy,
        });

        reply
    }

    /// Produces a fallback reply if the handle predicate accepts `error`.
    pub fn try_provide(
        &self,
        service: &ServiceName,
        operation: Operation,
        error: &LookupError,
    ) -> Option<Reply> {
        if self.handles(error) {
            return Some(self.provide(service, operation, error));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            fallback = %self.config.name,
            cause = error.kind(),
            "error does not match predicate, skipping fallback"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "fallback_calls_total",
            "fallback" => self.config.name.clone(),
            "operation" => operation.as_str(),
            "cause" => error.kind(),
            "result" => "skipped"
        )
        .increment(1);

        self.config.event_listeners.emit(&FallbackEvent::Skipped {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            service: service.to_string(),
            operation,
            cause: error.kind(),
        });

        None
    }
}

impl Default for FallbackProvider {
    fn default() -> Self {
        FallbackConfigBuilder::new().build()
    }
}

impl fmt::Debug for FallbackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackProvider")
            .field("name", &self.config.name)
            .field("strategy", &self.config.strategy)
            .field("listeners", &self.config.event_listeners.len())
            .finish()
    }
}
