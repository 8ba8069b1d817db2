//! The service directory collaborator.

use crate::endpoint::{Endpoint, ServiceName};
use futures::future::{self, BoxFuture};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Failure to reach the directory itself.
///
/// An empty instance list is not an error; this is reserved for the
/// directory being down or unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("directory unavailable: {reason}")]
pub struct DirectoryError {
    reason: String,
}

impl DirectoryError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Maps a logical service name to its currently registered instances.
///
/// Implementations must answer promptly and must report an unreachable
/// directory as `Err`, never as an empty list. The order of the returned
/// endpoints must be stable for an unchanged registry.
pub trait Directory: Send + Sync {
    fn list_instances(
        &self,
        service: &ServiceName,
    ) -> BoxFuture<'_, Result<Vec<Endpoint>, DirectoryError>>;
}

impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    fn list_instances(
        &self,
        service: &ServiceName,
    ) -> BoxFuture<'_, Result<Vec<Endpoint>, DirectoryError>> {
        (**self).list_instances(service)
    }
}

/// An in-process directory with explicit registration.
///
/// Instances are returned in registration order. The availability switch
/// simulates a directory outage.
#[derive(Debug)]
pub struct StaticDirectory {
    instances: RwLock<HashMap<ServiceName, Vec<Endpoint>>>,
    available: AtomicBool,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `endpoint` under `service`, replacing any instance with
    /// the same instance id.
    pub fn register(&self, service: &ServiceName, endpoint: Endpoint) {
        let mut instances = self
            .instances
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let list = instances.entry(service.clone()).or_default();
        match list
            .iter_mut()
            .find(|e| e.instance_id() == endpoint.instance_id())
        {
            Some(existing) => *existing = endpoint,
            None => list.push(endpoint),
        }
    }

    /// Removes the instance with `instance_id`. Returns whether one was removed.
    pub fn deregister(&self, service: &ServiceName, instance_id: &str) -> bool {
        let mut instances = self
            .instances
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(list) = instances.get_mut(service) else {
            return false;
        };
        let before = list.len();
        list.retain(|e| e.instance_id() != instance_id);
        before != list.len()
    }

    /// Toggles whether the directory answers at all.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn snapshot(&self, service: &ServiceName) -> Result<Vec<Endpoint>, DirectoryError> {
        if !self.is_available() {
            return Err(DirectoryError::unavailable("static directory switched off"));
        }
        let instances = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(instances.get(service).cloned().unwrap_or_default())
    }
}

impl Directory for StaticDirectory {
    fn list_instances(
        &self,
        service: &ServiceName,
    ) -> BoxFuture<'_, Result<Vec<Endpoint>, DirectoryError>> {
        Box::pin(future::ready(self.snapshot(service)))
    }
}
