use crate::client::{Breaker, ResilientClient, ServiceBreakers};
use crate::error::ClientBuildError;
use crate::settings::{ClientSettings, DirectoryPolicy, SelectorPolicy};
use resilient_lookup_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use resilient_lookup_discovery::{
    Directory, FirstAvailable, Resolver, RoundRobin, Selector, ServiceName,
};
use resilient_lookup_fallback::{FallbackProvider, FallbackStrategy};
use resilient_lookup_remote::{InvokerConfig, InvokerConfigBuilder, Operation, RemoteInvoker, RemoteStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Builder for [`ResilientClient`].
///
/// The directory and the store are required; everything else has a default.
pub struct ClientBuilder {
    directory: Option<Arc<dyn Directory>>,
    store: Option<Arc<dyn RemoteStore>>,
    selector: Arc<dyn Selector>,
    services: Vec<String>,
    default_timeout: Duration,
    directory_policy: DirectoryPolicy,
    breaker: CircuitBreakerConfigBuilder,
    invoker: InvokerConfigBuilder,
    fallback: Option<FallbackProvider>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            directory: None,
            store: None,
            selector: Arc::new(FirstAvailable),
            services: Vec::new(),
            default_timeout: Duration::from_secs(1),
            directory_policy: DirectoryPolicy::Tolerate,
            breaker: CircuitBreakerConfig::builder(),
            invoker: InvokerConfig::builder().name("remote-invoker"),
            fallback: None,
        }
    }

    /// Where service names are resolved.
    pub fn directory<D>(mut self, directory: D) -> Self
    where
        D: Directory + 'static,
    {
        self.directory = Some(Arc::new(directory));
        self
    }

    /// The backend that remote operations are sent to.
    pub fn store<St>(mut self, store: St) -> Self
    where
        St: RemoteStore + 'static,
    {
        self.store = Some(Arc::new(store));
        self
    }

    /// Endpoint selection policy.
    ///
    /// Default: [`FirstAvailable`]
    pub fn selector<S>(mut self, selector: S) -> Self
    where
        S: Selector + 'static,
    {
        self.selector = Arc::new(selector);
        self
    }

    /// Registers a service. One breaker per operation is created for it.
    ///
    /// Calls for services that were never registered fail with
    /// [`LookupError::UnknownService`](crate::LookupError::UnknownService).
    pub fn service(mut self, name: impl Into<String>) -> Self {
        self.services.push(name.into());
        self
    }

    /// Deadline used by the convenience operations.
    ///
    /// Default: 1 second
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Default: [`DirectoryPolicy::Tolerate`]
    pub fn directory_policy(mut self, policy: DirectoryPolicy) -> Self {
        self.directory_policy = policy;
        self
    }

    /// Shorthand for the breaker template's failure threshold.
    ///
    /// Default: 1
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.breaker = self.breaker.failure_threshold(n);
        self
    }

    /// Shorthand for the breaker template's reset timeout.
    ///
    /// Default: 5 seconds
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.breaker = self.breaker.reset_timeout(timeout);
        self
    }

    /// Adjusts the template every breaker is built from.
    ///
    /// Each breaker is named `"{service}/{operation}"`; a name set here is
    /// overwritten. Listeners registered here are shared by all breakers.
    ///
    /// ```rust
    /// use resilient_lookup::ClientBuilder;
    /// use std::time::Duration;
    ///
    /// let builder = ClientBuilder::new().breaker(|b| {
    ///     b.failure_threshold(3)
    ///         .reset_timeout(Duration::from_secs(30))
    ///         .on_state_transition(|from, to| eprintln!("breaker {from} -> {to}"))
    /// });
    /// ```
    pub fn breaker<F>(mut self, f: F) -> Self
    where
        F: FnOnce(CircuitBreakerConfigBuilder) -> CircuitBreakerConfigBuilder,
    {
        self.breaker = f(self.breaker);
        self
    }

    /// Adjusts the remote invoker's configuration (name, listeners).
    pub fn invoker<F>(mut self, f: F) -> Self
    where
        F: FnOnce(InvokerConfigBuilder) -> InvokerConfigBuilder,
    {
        self.invoker = f(self.invoker);
        self
    }

    /// Replaces the fallback provider.
    ///
    /// Default: [`FallbackProvider::default`], serving the built-in placeholders.
    pub fn fallback(mut self, provider: FallbackProvider) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Replaces the fallback provider with one using `strategy`.
    pub fn fallback_strategy(mut self, strategy: FallbackStrategy) -> Self {
        self.fallback = Some(FallbackProvider::builder().strategy(strategy).build());
        self
    }

    /// Applies plain settings on top of the current configuration.
    ///
    /// Services listed in the settings are added to any registered already.
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.breaker = self
            .breaker
            .failure_threshold(settings.failure_threshold)
            .reset_timeout(settings.reset_timeout());
        self.default_timeout = settings.default_timeout();
        self.directory_policy = settings.directory_policy;
        self.selector = match settings.selector {
            SelectorPolicy::FirstAvailable => Arc::new(FirstAvailable),
            SelectorPolicy::RoundRobin => Arc::new(RoundRobin::new()),
        };
        self.services.extend(settings.services);
        self
    }

    /// Assembles the client, creating every breaker up front.
    pub fn build(self) -> Result<ResilientClient, ClientBuildError> {
        let directory = self.directory.ok_or(ClientBuildError::MissingDirectory)?;
        let store = self.store.ok_or(ClientBuildError::MissingStore)?;
        let invoker: RemoteInvoker<dyn RemoteStore> =
            RemoteInvoker::from_shared(store, self.invoker.build());

        let mut breakers: HashMap<ServiceName, ServiceBreakers> = HashMap::new();
        for raw in self.services {
            let service = ServiceName::new(raw.as_str())
                .map_err(|_| ClientBuildError::InvalidServiceName(raw.clone()))?;
            if breakers.contains_key(&service) {
                continue;
            }

            let per_operation: ServiceBreakers = Operation::ALL
                .iter()
                .map(|operation| {
                    let layer = self
                        .breaker
                        .clone()
                        .name(format!("{}/{}", service, operation))
                        .build();
                    let breaker: Breaker = layer.layer_fn(invoker.clone());
                    (*operation, breaker)
                })
                .collect();

            #[cfg(feature = "tracing")]
            debug!(service = %service, breakers = per_operation.len(), "registered service");

            breakers.insert(service, per_operation);
        }

        Ok(ResilientClient::new(
            Resolver::new(directory),
            self.selector,
            breakers,
            self.fallback.unwrap_or_default(),
            self.default_timeout,
            self.directory_policy,
        ))
    }
}
