//! Tests for the resilient client facade.
//!
//! Test organization:
//! - end_to_end.rs: happy path, timeouts into fallback, business errors
//! - degradation.rs: no instances, directory outages, custom fallbacks, recovery
//! - concurrency.rs: shared client, single trial, cancellation
//! - selection.rs: selector policies seen from the store

mod concurrency;
mod degradation;

use resilient_lookup::discovery::{Endpoint, ServiceName, StaticDirectory};
use resilient_lookup::remote::InMemoryStore;
use resilient_lookup::{ClientBuilder, ResilientClient};
use std::sync::Arc;

pub const SEED: [&str; 3] = ["Jarek", "Piotr", "Marek"];

pub struct Harness {
    pub service: ServiceName,
    pub directory: Arc<StaticDirectory>,
    pub store: Arc<InMemoryStore>,
    pub client: Arc<ResilientClient>,
}

/// One registered instance of `reservationservice` backed by a seeded store.
pub fn harness(configure: impl FnOnce(ClientBuilder) -> ClientBuilder) -> Harness {
    let service = ServiceName::new("reservationservice").unwrap();
    let directory = Arc::new(StaticDirectory::new());
    directory.register(
        &service,
        Endpoint::http("10.0.0.7", 8000).with_instance_id("reservationservice-1"),
    );
    let store = Arc::new(InMemoryStore::with_names(SEED));

    let builder = ResilientClient::builder()
        .directory(Arc::clone(&directory))
        .store(Arc::clone(&store))
        .service("reservationservice");
    let client = configure(builder).build().unwrap();

    Harness {
        service,
        directory,
        store,
        client: Arc::new(client),
    }
}

pub fn placeholder_names() -> Vec<String> {
    ["This", "is", "fallback"].map(String::from).to_vec()
}
