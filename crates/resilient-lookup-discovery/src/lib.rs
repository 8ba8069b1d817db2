//! Endpoint resolution and selection.
//!
//! A lookup starts by turning a logical [`ServiceName`] into concrete
//! [`Endpoint`]s through a [`Directory`], then choosing one of them with a
//! [`Selector`].
//!
//! ```
//! use resilient_lookup_discovery::{
//!     Endpoint, FirstAvailable, Resolver, Selector, ServiceName, StaticDirectory,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), resilient_lookup_core::LookupError> {
//! let service = ServiceName::new("reservationservice")?;
//! let directory = Arc::new(StaticDirectory::new());
//! directory.register(&service, Endpoint::http("10.0.0.7", 8000));
//!
//! let resolver = Resolver::new(directory);
//! let candidates = resolver.resolve(&service).await?;
//! let chosen = FirstAvailable.pick(&service, &candidates)?;
//! assert_eq!(chosen.uri(), "http://10.0.0.7:8000");
//! # Ok(())
//! # }
//! ```

mod directory;
mod endpoint;
mod resolver;
pub mod selector;

pub use directory::{Directory, DirectoryError, StaticDirectory};
pub use endpoint::{Endpoint, Scheme, ServiceName};
pub use resolver::Resolver;
pub use selector::{FirstAvailable, RoundRobin, Selector};
