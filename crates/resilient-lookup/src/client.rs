use crate::builder::ClientBuilder;
use crate::settings::DirectoryPolicy;
use futures::future::BoxFuture;
use resilient_lookup_circuitbreaker::{
    CircuitBreaker, CircuitBreakerError, CircuitMetrics, CircuitState, DefaultClassifier,
};
use resilient_lookup_core::LookupError;
use resilient_lookup_discovery::{Directory, Resolver, Selector, ServiceName};
use resilient_lookup_fallback::FallbackProvider;
use resilient_lookup_remote::{
    Invocation, Operation, RemoteInvoker, RemoteStore, Reply, Request, Reservation,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

pub(crate) type Breaker = CircuitBreaker<RemoteInvoker<dyn RemoteStore>, DefaultClassifier>;
pub(crate) type ServiceBreakers = HashMap<Operation, Breaker>;

/// Resolves, selects, invokes under a breaker and falls back, in that order.
///
/// Every call makes at most one network attempt. Infrastructure failures
/// (no endpoint, timeout, unreachable endpoint, open breaker, and a
/// directory outage under [`DirectoryPolicy::Tolerate`]) are answered by the
/// fallback provider; business rejections and configuration errors reach the
/// caller.
///
/// The client is `Send + Sync`; share it behind an `Arc`. Dropping a call's
/// future cancels the remote invocation and its deadline.
pub struct ResilientClient {
    resolver: Resolver<Arc<dyn Directory>>,
    selector: Arc<dyn Selector>,
    breakers: HashMap<ServiceName, ServiceBreakers>,
    fallback: FallbackProvider,
    default_timeout: Duration,
    directory_policy: DirectoryPolicy,
}

impl ResilientClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        resolver: Resolver<Arc<dyn Directory>>,
        selector: Arc<dyn Selector>,
        breakers: HashMap<ServiceName, ServiceBreakers>,
        fallback: FallbackProvider,
        default_timeout: Duration,
        directory_policy: DirectoryPolicy,
    ) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "client_calls_total",
                "Total number of client calls by how they were answered (remote, fallback, error)"
            );
        });

        Self {
            resolver,
            selector,
            breakers,
            fallback,
            default_timeout,
            directory_policy,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn directory_policy(&self) -> DirectoryPolicy {
        self.directory_policy
    }

    /// Registered services, in no particular order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceName> {
        self.breakers.keys()
    }

    /// Performs `request` against `service` with the given deadline.
    ///
    /// ```rust
    /// use resilient_lookup::{ResilientClient, Request};
    /// use resilient_lookup_discovery::{Endpoint, ServiceName, StaticDirectory};
    /// use resilient_lookup_remote::InMemoryStore;
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let service = ServiceName::new("reservationservice")?;
    /// let directory = Arc::new(StaticDirectory::new());
    /// directory.register(&service, Endpoint::http("10.0.0.7", 8000));
    ///
    /// let client = ResilientClient::builder()
    ///     .directory(Arc::clone(&directory))
    ///     .store(InMemoryStore::with_names(["Jarek", "Piotr"]))
    ///     .service("reservationservice")
    ///     .build()?;
    ///
    /// let reply = client
    ///     .call(&service, Request::List, Duration::from_millis(500))
    ///     .await?;
    /// assert_eq!(reply.into_reservations().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call(
        &self,
        service: &ServiceName,
        request: Request,
        timeout: Duration,
    ) -> Result<Reply, LookupError> {
        let operation = request.operation();

        let candidates = match self.resolver.resolve(service).await {
            Ok(candidates) => candidates,
            Err(err) => return self.absorb(service, operation, err),
        };

        let endpoint = match self.selector.pick(service, &candidates) {
            Ok(endpoint) => endpoint.clone(),
            Err(err) => return self.absorb(service, operation, err),
        };

        let breaker = match self.breaker(service, operation) {
            Ok(breaker) => breaker,
            Err(err) => return self.absorb(service, operation, err),
        };

        #[cfg(feature = "tracing")]
        debug!(
            service = %service,
            operation = %operation,
            instance_id = endpoint.instance_id(),
            uri = %endpoint.uri(),
            metadata = ?endpoint.metadata(),
            "selected endpoint"
        );

        // Erased so the `call` future is `Send`.
        let invocation: BoxFuture<'static, _> = Box::pin(breaker.clone().oneshot(Invocation {
            endpoint,
            request,
            timeout,
        }));
        let outcome = invocation.await;

        match outcome {
            Ok(reply) => {
                #[cfg(feature = "metrics")]
                counter!("client_calls_total", "service" => service.to_string(), "operation" => operation.as_str(), "outcome" => "remote").increment(1);

                Ok(reply)
            }
            Err(CircuitBreakerError::ShortCircuited) => {
                let err = LookupError::ShortCircuited {
                    breaker: breaker.name().to_string(),
                };
                self.absorb(service, operation, err)
            }
            Err(CircuitBreakerError::Inner(err)) => self.absorb(service, operation, err),
        }
    }

    /// Answers a failed call with a fallback reply, or hands the error back.
    fn absorb(
        &self,
        service: &ServiceName,
        operation: Operation,
        err: LookupError,
    ) -> Result<Reply, LookupError> {
        let absorbable = match err {
            LookupError::DirectoryUnavailable(_) => {
                self.directory_policy == DirectoryPolicy::Tolerate
            }
            ref other => other.is_absorbable(),
        };

        let reply = if absorbable {
            self.fallback.try_provide(service, operation, &err)
        } else {
            None
        };

        match reply {
            Some(reply) => {
                #[cfg(feature = "tracing")]
                warn!(service = %service, operation = %operation, error = %err, "serving fallback");

                #[cfg(feature = "metrics")]
                counter!("client_calls_total", "service" => service.to_string(), "operation" => operation.as_str(), "outcome" => "fallback").increment(1);

                Ok(reply)
            }
            None => {
                #[cfg(feature = "tracing")]
                debug!(service = %service, operation = %operation, error = %err, "propagating error");

                #[cfg(feature = "metrics")]
                counter!("client_calls_total", "service" => service.to_string(), "operation" => operation.as_str(), "outcome" => "error").increment(1);

                Err(err)
            }
        }
    }

    fn breaker(&self, service: &ServiceName, operation: Operation) -> Result<&Breaker, LookupError> {
        self.breakers
            .get(service)
            .and_then(|ops| ops.get(&operation))
            .ok_or_else(|| LookupError::UnknownService(service.to_string()))
    }

    /// All reservations, or the placeholder list while the backend is down.
    pub async fn list(&self, service: &ServiceName) -> Result<Vec<Reservation>, LookupError> {
        self.call(service, Request::List, self.default_timeout)
            .await
            .map(Reply::into_reservations)
    }

    /// Just the reservation names.
    pub async fn names(&self, service: &ServiceName) -> Result<Vec<String>, LookupError> {
        Ok(self
            .list(service)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect())
    }

    /// One reservation by name. `None` if the fallback served no record.
    pub async fn get_by_name(
        &self,
        service: &ServiceName,
        name: impl Into<String>,
    ) -> Result<Option<Reservation>, LookupError> {
        self.call(service, Request::GetByName(name.into()), self.default_timeout)
            .await
            .map(Reply::into_reservation)
    }

    /// One reservation by its store-assigned id. `None` if the fallback
    /// served no record.
    pub async fn get_by_id(
        &self,
        service: &ServiceName,
        id: u64,
    ) -> Result<Option<Reservation>, LookupError> {
        self.call(service, Request::GetById(id), self.default_timeout)
            .await
            .map(Reply::into_reservation)
    }

    /// Creates a reservation. A degraded answer is [`Reply::Unavailable`].
    pub async fn create(
        &self,
        service: &ServiceName,
        reservation: Reservation,
    ) -> Result<Reply, LookupError> {
        self.call(service, Request::Create(reservation), self.default_timeout)
            .await
    }

    /// Deletes a reservation by name. Deleting a missing name succeeds.
    pub async fn delete_by_name(
        &self,
        service: &ServiceName,
        name: impl Into<String>,
    ) -> Result<Reply, LookupError> {
        self.call(service, Request::DeleteByName(name.into()), self.default_timeout)
            .await
    }

    /// State of one breaker, if the service is registered.
    pub fn breaker_state(&self, service: &ServiceName, operation: Operation) -> Option<CircuitState> {
        self.breaker(service, operation).ok().map(Breaker::state_sync)
    }

    pub fn breaker_metrics(
        &self,
        service: &ServiceName,
        operation: Operation,
    ) -> Option<CircuitMetrics> {
        self.breaker(service, operation).ok().map(Breaker::metrics)
    }

    /// "healthy" when every breaker is closed, "unhealthy" when any is open,
    /// "degraded" otherwise.
    pub fn health_status(&self) -> &'static str {
        let states = self
            .breakers
            .values()
            .flat_map(|ops| ops.values())
            .map(Breaker::state_sync);

        let mut degraded = false;
        for state in states {
            match state {
                CircuitState::Open => return "unhealthy",
                CircuitState::HalfOpen => degraded = true,
                CircuitState::Closed => {}
            }
        }

        if degraded {
            "degraded"
        } else {
            "healthy"
        }
    }
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("services", &self.breakers.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback)
            .field("default_timeout", &self.default_timeout)
            .field("directory_policy", &self.directory_policy)
            .finish()
    }
}
