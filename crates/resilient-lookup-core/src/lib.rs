//! Core infrastructure for resilient-lookup.
//!
//! This crate holds what every stage of a lookup (resolve, select, invoke,
//! short-circuit, fall back) shares:
//! - [`LookupError`], the failure taxonomy that decides whether an outcome
//!   trips a breaker, is absorbed into a fallback, or reaches the caller
//! - The event system used by the breaker, invoker and fallback for
//!   observability

pub mod error;
pub mod events;

pub use error::{LookupError, RemoteError};
pub use events::{ClientEvent, EventListener, EventListeners, FnListener};
