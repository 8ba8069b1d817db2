//! The remote store collaborator.

use crate::model::{Reply, Request, Reservation};
use futures::future::BoxFuture;
use resilient_lookup_discovery::Endpoint;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Failures reported by a [`RemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// `create` with a name that is already taken.
    #[error("reservation '{name}' already exists")]
    Conflict { name: String },

    /// `get_by_name` with a name that does not exist.
    #[error("reservation '{name}' not found")]
    NotFound { name: String },

    /// `get_by_id` with an id the store never assigned, or whose record is gone.
    #[error("reservation #{id} not found")]
    UnknownId { id: u64 },

    /// The endpoint could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),
}

/// CRUD access to reservations, addressed to one resolved endpoint.
///
/// Wire encoding is the implementation's business.
pub trait RemoteStore: Send + Sync {
    /// All reservations in store order.
    fn list<'a>(
        &'a self,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<Vec<Reservation>, StoreError>>;

    /// One reservation, or [`StoreError::NotFound`].
    fn get_by_name<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>>;

    /// One reservation by its store-assigned id, or [`StoreError::UnknownId`].
    ///
    /// The provided implementation scans [`list`](RemoteStore::list); stores
    /// with an index on ids should override it.
    fn get_by_id<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        id: u64,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        Box::pin(async move {
            self.list(endpoint)
                .await?
                .into_iter()
                .find(|r| r.id == Some(id))
                .ok_or(StoreError::UnknownId { id })
        })
    }

    /// Stores a new reservation and returns it with its id, or
    /// [`StoreError::Conflict`] when the name is taken.
    fn create<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        reservation: Reservation,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>>;

    /// Removes the reservation if present. Removing a missing name succeeds.
    fn delete_by_name<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        name: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

impl<S> RemoteStore for Arc<S>
where
    S: RemoteStore + ?Sized,
{
    fn list<'a>(
        &'a self,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<Vec<Reservation>, StoreError>> {
        (**self).list(endpoint)
    }

    fn get_by_name<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        (**self).get_by_name(endpoint, name)
    }

    fn get_by_id<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        id: u64,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        (**self).get_by_id(endpoint, id)
    }

    fn create<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        reservation: Reservation,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        (**self).create(endpoint, reservation)
    }

    fn delete_by_name<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        name: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        (**self).delete_by_name(endpoint, name)
    }
}

/// Routes a [`Request`] to the matching store method.
pub async fn dispatch<S>(
    store: &S,
    endpoint: &Endpoint,
    request: Request,
) -> Result<Reply, StoreError>
where
    S: RemoteStore + ?Sized,
{
    match request {
        Request::List => store.list(endpoint).await.map(Reply::Reservations),
        Request::GetByName(name) => store
            .get_by_name(endpoint, &name)
            .await
            .map(Reply::Reservation),
        Request::GetById(id) => store.get_by_id(endpoint, id).await.map(Reply::Reservation),
        Request::Create(reservation) => store
            .create(endpoint, reservation)
            .await
            .map(Reply::Reservation),
        Request::DeleteByName(name) => {
            store.delete_by_name(endpoint, &name).await?;
            Ok(Reply::Deleted(name))
        }
    }
}

/// An in-process store with a uniqueness constraint on names.
///
/// Every endpoint reaches the same records. Latency and reachability can be
/// adjusted at runtime to simulate a slow or dead backend, and the number of
/// received calls is counted so callers can verify whether the network was
/// touched at all.
#[derive(Debug)]
pub struct InMemoryStore {
    records: Mutex<Vec<Reservation>>,
    next_id: AtomicU64,
    latency_nanos: AtomicU64,
    reachable: AtomicBool,
    calls: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            latency_nanos: AtomicU64::new(0),
            reachable: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one reservation per name.
    pub fn with_names<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let store = Self::new();
        {
            let mut records = store.lock();
            for name in names {
                let id = store.next_id.fetch_add(1, Ordering::Relaxed);
                records.push(Reservation {
                    id: Some(id),
                    name: name.into(),
                });
            }
        }
        store
    }

    /// Delays every subsequent operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.latency_nanos.store(nanos, Ordering::Release);
    }

    /// Makes every subsequent operation fail with [`StoreError::Unreachable`].
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// Number of operations that reached the store.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    /// Current names in store order.
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.name.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Reservation>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn arrive(&self, endpoint: &Endpoint, operation: &'static str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        #[cfg(feature = "metrics")]
        counter!("remote_store_operations_total", "operation" => operation).increment(1);
        #[cfg(not(feature = "metrics"))]
        let _ = operation;

        let latency = self.latency_nanos.load(Ordering::Acquire);
        if latency > 0 {
            tokio::time::sleep(Duration::from_nanos(latency)).await;
        }
        if !self.reachable.load(Ordering::Acquire) {
            return Err(StoreError::Unreachable(format!(
                "connection refused by {}",
                endpoint
            )));
        }
        Ok(())
    }
}

impl RemoteStore for InMemoryStore {
    fn list<'a>(
        &'a self,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<Vec<Reservation>, StoreError>> {
        Box::pin(async move {
            self.arrive(endpoint, "list").await?;
            Ok(self.lock().clone())
        })
    }

    fn get_by_name<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        Box::pin(async move {
            self.arrive(endpoint, "get_by_name").await?;
            self.lock()
                .iter()
                .find(|r| r.name == name)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    name: name.to_string(),
                })
        })
    }

    fn get_by_id<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        id: u64,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        Box::pin(async move {
            self.arrive(endpoint, "get_by_id").await?;
            self.lock()
                .iter()
                .find(|r| r.id == Some(id))
                .cloned()
                .ok_or(StoreError::UnknownId { id })
        })
    }

    fn create<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        reservation: Reservation,
    ) -> BoxFuture<'a, Result<Reservation, StoreError>> {
        Box::pin(async move {
            self.arrive(endpoint, "create").await?;
            let mut records = self.lock();
            if records.iter().any(|r| r.name == reservation.name) {
                return Err(StoreError::Conflict {
                    name: reservation.name,
                });
            }
            let stored = Reservation {
                id: Some(self.next_id.fetch_add(1, Ordering::Relaxed)),
                name: reservation.name,
            };
            records.push(stored.clone());
            Ok(stored)
        })
    }

    fn delete_by_name<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        name: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.arrive(endpoint, "delete_by_name").await?;
            self.lock().retain(|r| r.name != name);
            Ok(())
        })
    }
}
