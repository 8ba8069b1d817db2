//! Remote store contract and a deadline-enforcing invoker.
//!
//! [`RemoteInvoker`] performs exactly one operation against one resolved
//! endpoint. It is a Tower [`Service`] over [`Invocation`]s, so it can be
//! wrapped by a circuit breaker like any other service.
//!
//! A call that outlives its deadline fails with
//! [`LookupError::Timeout`]; transport failures become
//! [`LookupError::Unreachable`] and business rejections become
//! [`LookupError::Remote`]. The three stay distinct so breaker policy can
//! tell them apart.
//!
//! ## Example
//!
//! ```rust
//! use resilient_lookup_discovery::Endpoint;
//! use resilient_lookup_remote::{InMemoryStore, Invocation, InvokerConfig, RemoteInvoker, Reply, Request};
//! use std::time::Duration;
//! use tower::{Service, ServiceExt};
//!
//! # async fn example() -> Result<(), resilient_lookup_core::LookupError> {
//! let store = InMemoryStore::with_names(["Jarek", "Piotr"]);
//! let mut invoker = RemoteInvoker::new(store, InvokerConfig::builder().name("reservations").build());
//!
//! let reply = invoker
//!     .ready()
//!     .await?
//!     .call(Invocation {
//!         endpoint: Endpoint::http("localhost", 8000),
//!         request: Request::List,
//!         timeout: Duration::from_secs(1),
//!     })
//!     .await?;
//! assert!(matches!(reply, Reply::Reservations(ref all) if all.len() == 2));
//! # Ok(())
//! # }
//! ```
//!
//! Dropping the returned future cancels the in-flight store call: nothing is
//! left running in the background.

use futures::future::BoxFuture;
use resilient_lookup_core::{LookupError, RemoteError};
use resilient_lookup_discovery::Endpoint;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{InvokerConfig, InvokerConfigBuilder};
pub use events::InvokerEvent;
pub use model::{Operation, Reply, Request, Reservation};
pub use store::{dispatch, InMemoryStore, RemoteStore, StoreError};

mod config;
mod events;
mod model;
mod store;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// One remote call: where, what, and how long it may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub endpoint: Endpoint,
    pub request: Request,
    pub timeout: Duration,
}

/// Converts a store failure into the lookup taxonomy.
pub fn into_lookup_error(err: StoreError, endpoint: &Endpoint) -> LookupError {
    match err {
        StoreError::Conflict { name } => RemoteError::Conflict { name }.into(),
        StoreError::NotFound { name } => RemoteError::NotFound { name }.into(),
        StoreError::UnknownId { id } => RemoteError::UnknownId { id }.into(),
        StoreError::Unreachable(reason) => LookupError::Unreachable {
            endpoint: endpoint.uri(),
            reason,
        },
    }
}

/// A Tower service that performs remote store operations under a deadline.
pub struct RemoteInvoker<St: ?Sized> {
    store: Arc<St>,
    config: Arc<InvokerConfig>,
}

impl<St: ?Sized> Clone for RemoteInvoker<St> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<St> RemoteInvoker<St> {
    pub fn new(store: St, config: InvokerConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }
}

impl<St: ?Sized> RemoteInvoker<St> {
    /// Creates an invoker over a store that is also held elsewhere.
    pub fn from_shared(store: Arc<St>, config: InvokerConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "invoker_calls_total",
                    "Total number of remote invocations by outcome (success, error, timeout)"
                );
                describe_histogram!(
                    "invoker_call_duration_seconds",
                    "Duration of remote invocations that completed before their deadline"
                );
            });
        }

        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl<St> RemoteInvoker<St>
where
    St: RemoteStore + ?Sized + 'static,
{
    /// Performs `request` against `endpoint`, failing with
    /// [`LookupError::Timeout`] once `deadline` has elapsed.
    pub async fn invoke(
        &self,
        endpoint: Endpoint,
        request: Request,
        deadline: Duration,
    ) -> Result<Reply, LookupError> {
        run(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            Invocation {
                endpoint,
                request,
                timeout: deadline,
            },
        )
        .await
    }
}

impl<St> Service<Invocation> for RemoteInvoker<St>
where
    St: RemoteStore + ?Sized + 'static,
{
    type Response = Reply;
    type Error = LookupError;
    type Future = BoxFuture<'static, Result<Reply, LookupError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        Box::pin(run(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            invocation,
        ))
    }
}

async fn run<St>(
    store: Arc<St>,
    config: Arc<InvokerConfig>,
    invocation: Invocation,
) -> Result<Reply, LookupError>
where
    St: RemoteStore + ?Sized,
{
    let Invocation {
        endpoint,
        request,
        timeout: deadline,
    } = invocation;
    let operation = request.operation();
    let start = Instant::now();

    match timeout(deadline, dispatch(&*store, &endpoint, request)).await {
        Ok(Ok(reply)) => {
            let duration = start.elapsed();
            config.event_listeners.emit(&InvokerEvent::Success {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                operation,
                duration,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("invoker_calls_total", "invoker" => config.name.clone(), "operation" => operation.as_str(), "result" => "success").increment(1);
                histogram!("invoker_call_duration_seconds", "invoker" => config.name.clone())
                    .record(duration.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                invoker = %config.name,
                endpoint = %endpoint,
                operation = %operation,
                duration_ms = duration.as_millis(),
                "remote call succeeded"
            );

            Ok(reply)
        }
        Ok(Err(err)) => {
            let duration = start.elapsed();
            let err = into_lookup_error(err, &endpoint);
            config.event_listeners.emit(&InvokerEvent::Error {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                operation,
                duration,
                kind: err.kind(),
            });

            #[cfg(feature = "metrics")]
            {
                counter!("invoker_calls_total", "invoker" => config.name.clone(), "operation" => operation.as_str(), "result" => "error").increment(1);
                histogram!("invoker_call_duration_seconds", "invoker" => config.name.clone())
                    .record(duration.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                invoker = %config.name,
                endpoint = %endpoint,
                operation = %operation,
                error = %err,
                "remote call failed"
            );

            Err(err)
        }
        Err(_elapsed) => {
            config.event_listeners.emit(&InvokerEvent::Timeout {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                operation,
                timeout: deadline,
            });

            #[cfg(feature = "metrics")]
            counter!("invoker_calls_total", "invoker" => config.name.clone(), "operation" => operation.as_str(), "result" => "timeout").increment(1);

            #[cfg(feature = "tracing")]
            warn!(
                invoker = %config.name,
                endpoint = %endpoint,
                operation = %operation,
                timeout_ms = deadline.as_millis(),
                "remote call timed out"
            );

            Err(LookupError::Timeout {
                endpoint: endpoint.uri(),
                timeout: deadline,
            })
        }
    }
}
