use super::{guarded, list};
use resilient_lookup_circuitbreaker::{CircuitBreakerLayer, CircuitState};
use resilient_lookup_remote::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::advance;
use tower::{Service, ServiceExt};

fn layer() -> CircuitBreakerLayer {
    CircuitBreakerLayer::builder()
        .reset_timeout(Duration::from_secs(5))
        .name("reservationservice/list")
        .build()
}

#[tokio::test(start_paused = true)]
async fn successful_trial_closes_with_clean_count() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let breaker = guarded(Arc::clone(&store), layer());

    store.set_reachable(false);
    let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    advance(Duration::from_secs(5)).await;
    store.set_reachable(true);

    let reply = breaker
        .clone()
        .oneshot(list(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(reply.into_reservations().len(), 1);

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_trial_reopens_and_restarts_the_clock() {
    let store = Arc::new(InMemoryStore::new());
    store.set_reachable(false);
    let breaker = guarded(Arc::clone(&store), layer());

    let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;
    advance(Duration::from_secs(5)).await;

    // The trial fails.
    let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(store.calls(), 2);

    // Measured from the re-open, not from the first trip.
    advance(Duration::from_secs(3)).await;
    let err = breaker
        .clone()
        .oneshot(list(Duration::from_secs(1)))
        .await
        .unwrap_err();
    assert!(err.is_short_circuited());
    assert_eq!(store.calls(), 2);

    advance(Duration::from_secs(2)).await;
    store.set_reachable(true);
    breaker
        .clone()
        .oneshot(list(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(store.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn abandoned_trial_does_not_wedge_half_open() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let mut breaker = guarded(Arc::clone(&store), layer());

    breaker.force_open();
    advance(Duration::from_secs(5)).await;

    store.set_latency(Duration::from_secs(60));
    let trial = breaker
        .ready()
        .await
        .unwrap()
        .call(list(Duration::from_secs(120)));
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    // While the trial is held, everyone else is short-circuited.
    let err = breaker
        .clone()
        .oneshot(list(Duration::from_secs(1)))
        .await
        .unwrap_err();
    assert!(err.is_short_circuited());

    // The caller gives up on the trial.
    drop(trial);
    assert!(!breaker.metrics().trial_in_flight);

    store.set_latency(Duration::ZERO);
    breaker
        .clone()
        .oneshot(list(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn timed_out_trial_counts_as_failure() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let breaker = guarded(Arc::clone(&store), layer());

    breaker.force_open();
    advance(Duration::from_secs(5)).await;

    store.set_latency(Duration::from_secs(2));
    let err = breaker
        .clone()
        .oneshot(list(Duration::from_millis(500)))
        .await
        .unwrap_err();
    assert!(err.into_inner().is_some_and(|e| e.is_timeout()));
    assert_eq!(breaker.state(), CircuitState::Open);
}
