use crate::directory::Directory;
use crate::endpoint::{Endpoint, ServiceName};
use resilient_lookup_core::LookupError;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Turns a service name into candidate endpoints by querying a [`Directory`].
///
/// The resolver holds no state of its own: every call goes to the directory
/// and nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Resolver<D> {
    directory: D,
}

impl<D> Resolver<D>
where
    D: Directory,
{
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Lists the live instances of `service`.
    ///
    /// No registered instances is `Ok(vec![])`. A directory that cannot be
    /// reached is [`LookupError::DirectoryUnavailable`].
    pub async fn resolve(&self, service: &ServiceName) -> Result<Vec<Endpoint>, LookupError> {
        let endpoints = self
            .directory
            .list_instances(service)
            .await
            .map_err(|e| {
                #[cfg(feature = "tracing")]
                warn!(service = %service, error = %e, "directory unavailable");
                LookupError::DirectoryUnavailable(e.reason().to_string())
            })?;

        #[cfg(feature = "tracing")]
        {
            debug!(service = %service, count = endpoints.len(), "resolved endpoints");
            for endpoint in &endpoints {
                debug!(
                    service = %service,
                    id = endpoint.instance_id(),
                    uri = %endpoint,
                    meta = ?endpoint.metadata(),
                    "candidate endpoint"
                );
            }
        }

        Ok(endpoints)
    }
}
