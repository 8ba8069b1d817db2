//! Resilient remote-lookup client.
//!
//! `resilient-lookup` turns a logical service name into a remote call that
//! degrades gracefully:
//!
//! 1. **Resolve** the name to live endpoints through a [`Directory`].
//! 2. **Select** one endpoint with a [`Selector`] (first available by default).
//! 3. **Invoke** the operation under a deadline, gated by a per
//!    (service, operation) circuit breaker.
//! 4. **Fall back** to a deterministic local reply when the call fails for an
//!    infrastructure reason or the breaker is open.
//!
//! Business rejections such as a duplicate name always reach the caller and
//! never trip a breaker.
//!
//! # Example
//!
//! ```rust
//! use resilient_lookup::{ResilientClient, Reservation};
//! use resilient_lookup::discovery::{Endpoint, ServiceName, StaticDirectory};
//! use resilient_lookup::remote::InMemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reservations = ServiceName::new("reservationservice")?;
//! let directory = Arc::new(StaticDirectory::new());
//! directory.register(&reservations, Endpoint::http("10.0.0.7", 8000));
//!
//! let store = Arc::new(InMemoryStore::with_names(["Jarek", "Piotr", "Marek"]));
//! let client = ResilientClient::builder()
//!     .directory(Arc::clone(&directory))
//!     .store(Arc::clone(&store))
//!     .service("reservationservice")
//!     .default_timeout(Duration::from_millis(500))
//!     .build()?;
//!
//! assert_eq!(client.names(&reservations).await?, ["Jarek", "Piotr", "Marek"]);
//!
//! // The backend goes away: the first failure opens the breaker and every
//! // read is answered with placeholders until it recovers.
//! store.set_reachable(false);
//! assert_eq!(client.names(&reservations).await?, ["This", "is", "fallback"]);
//!
//! // A duplicate name is a real answer, not an outage.
//! store.set_reachable(true);
//! let taken = client.create(&reservations, Reservation::new("Jarek")).await;
//! assert!(taken.unwrap_err().is_business());
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! Each stage lives in its own crate and is re-exported here:
//!
//! - [`core`]: error taxonomy and event listeners
//! - [`discovery`]: directory, resolver, selectors
//! - [`remote`]: remote store contract and the deadline-enforcing invoker
//! - [`circuitbreaker`]: the consecutive-failure breaker
//! - [`fallback`]: fallback strategies and the provider

pub use resilient_lookup_circuitbreaker as circuitbreaker;
pub use resilient_lookup_core as core;
pub use resilient_lookup_discovery as discovery;
pub use resilient_lookup_fallback as fallback;
pub use resilient_lookup_remote as remote;

pub use builder::ClientBuilder;
pub use client::ResilientClient;
pub use error::ClientBuildError;
pub use settings::{ClientSettings, DirectoryPolicy, SelectorPolicy};

pub use resilient_lookup_circuitbreaker::CircuitState;
pub use resilient_lookup_core::{LookupError, RemoteError};
pub use resilient_lookup_discovery::{Directory, Endpoint, Selector, ServiceName};
pub use resilient_lookup_fallback::{FallbackProvider, FallbackStrategy};
pub use resilient_lookup_remote::{Operation, RemoteStore, Reply, Request, Reservation};

mod builder;
mod client;
mod error;
mod settings;
