use super::{harness, placeholder_names, SEED};
use resilient_lookup::discovery::{Endpoint, ServiceName};
use resilient_lookup::fallback::{FallbackEvent, FallbackProvider};
use resilient_lookup::{
    CircuitState, DirectoryPolicy, FallbackStrategy, LookupError, Operation, Reply, Reservation,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn zero_instances_fall_back_without_touching_the_store() {
    let h = harness(|b| b);
    assert!(h.directory.deregister(&h.service, "reservationservice-1"));

    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
    assert_eq!(h.store.calls(), 0);
    assert_eq!(
        h.client.breaker_state(&h.service, Operation::List),
        Some(CircuitState::Closed),
        "an empty directory is not a backend failure"
    );
}

#[tokio::test]
async fn unregistered_service_without_instances_falls_back() {
    let h = harness(|b| b);
    let inventory = ServiceName::new("inventory").unwrap();

    assert_eq!(h.client.names(&inventory).await.unwrap(), placeholder_names());
    assert_eq!(h.store.calls(), 0);
    assert!(h.client.breaker_state(&inventory, Operation::List).is_none());
}

#[tokio::test]
async fn unregistered_service_with_instances_is_rejected() {
    let h = harness(|b| b);
    let inventory = ServiceName::new("inventory").unwrap();
    h.directory.register(&inventory, Endpoint::http("10.0.0.8", 8000));

    let err = h.client.list(&inventory).await.unwrap_err();
    assert_eq!(err, LookupError::UnknownService("inventory".into()));
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn directory_outage_is_tolerated_by_default() {
    let h = harness(|b| b);
    h.directory.set_available(false);

    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
    assert_eq!(
        h.client
            .get_by_name(&h.service, "Jarek")
            .await
            .unwrap()
            .map(|r| r.name),
        Some("fallback".to_string())
    );
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn require_policy_surfaces_directory_outage() {
    let h = harness(|b| b.directory_policy(DirectoryPolicy::Require));
    h.directory.set_available(false);

    let err = h.client.list(&h.service).await.unwrap_err();
    assert!(matches!(err, LookupError::DirectoryUnavailable(_)));

    // Other infrastructure failures are still absorbed.
    h.directory.set_available(true);
    h.store.set_reachable(false);
    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
}

#[tokio::test]
async fn writes_degrade_to_unavailable() {
    let h = harness(|b| b);
    h.store.set_reachable(false);

    let created = h
        .client
        .create(&h.service, Reservation::new("Maciek"))
        .await
        .unwrap();
    assert_eq!(created, Reply::Unavailable);

    let deleted = h.client.delete_by_name(&h.service, "Jarek").await.unwrap();
    assert_eq!(deleted, Reply::Unavailable);

    h.store.set_reachable(true);
    assert_eq!(h.store.names(), SEED);
}

#[tokio::test]
async fn custom_fallback_sees_the_cause() {
    let causes = Arc::new(Mutex::new(Vec::new()));
    let c = Arc::clone(&causes);
    let provider = FallbackProvider::builder()
        .name("reservations-fallback")
        .from_context(|ctx| {
            Reply::Reservations(vec![Reservation::new(format!(
                "{} unavailable ({})",
                ctx.service,
                ctx.error.kind()
            ))])
        })
        .on_event(move |event| {
            if let FallbackEvent::Applied { cause, .. } = event {
                c.lock().unwrap().push(*cause);
            }
        })
        .build();

    let h = harness(|b| b.fallback(provider));
    h.store.set_reachable(false);

    assert_eq!(
        h.client.names(&h.service).await.unwrap(),
        ["reservationservice unavailable (unreachable)"]
    );
    assert_eq!(
        h.client.names(&h.service).await.unwrap(),
        ["reservationservice unavailable (short_circuited)"]
    );
    assert_eq!(*causes.lock().unwrap(), vec!["unreachable", "short_circuited"]);
}

#[tokio::test]
async fn fixed_value_strategy() {
    let h = harness(|b| b.fallback_strategy(FallbackStrategy::Value(Reply::Reservations(Vec::new()))));
    h.store.set_reachable(false);

    assert!(h.client.list(&h.service).await.unwrap().is_empty());
    assert_eq!(
        h.client.create(&h.service, Reservation::new("Maciek")).await.unwrap(),
        Reply::Reservations(Vec::new())
    );
}

#[tokio::test]
async fn predicate_can_refuse_short_circuits() {
    let provider = FallbackProvider::builder()
        .handle(|e| !e.is_short_circuited())
        .build();
    let h = harness(|b| b.fallback(provider));
    h.store.set_reachable(false);

    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
    let err = h.client.list(&h.service).await.unwrap_err();
    assert_eq!(
        err,
        LookupError::ShortCircuited {
            breaker: "reservationservice/list".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn recovers_after_the_reset_timeout() {
    let h = harness(|b| b.reset_timeout(Duration::from_secs(5)));
    h.store.set_reachable(false);

    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
    assert_eq!(h.client.health_status(), "unhealthy");

    h.store.set_reachable(true);
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
    assert_eq!(h.store.calls(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.client.names(&h.service).await.unwrap(), SEED);
    assert_eq!(h.client.health_status(), "healthy");
    assert_eq!(
        h.client
            .breaker_metrics(&h.service, Operation::List)
            .unwrap()
            .consecutive_failures,
        0
    );
}
