use super::{guarded, list};
use resilient_lookup_circuitbreaker::{CircuitBreakerError, CircuitBreakerLayer, CircuitState};
use resilient_lookup_remote::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tower::ServiceExt;

/// Exactly one of many racing callers becomes the half-open trial.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_callers_admit_a_single_trial() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let breaker = guarded(
        Arc::clone(&store),
        CircuitBreakerLayer::builder()
            .reset_timeout(Duration::from_millis(30))
            .name("concurrent-half-open")
            .build(),
    );

    breaker.force_open();
    sleep(Duration::from_millis(60)).await;

    // Keep the trial in flight while the others arrive.
    store.set_latency(Duration::from_millis(200));

    let barrier = Arc::new(tokio::sync::Barrier::new(16));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let breaker = breaker.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            breaker.oneshot(list(Duration::from_secs(5))).await
        }));
    }

    let mut admitted = 0;
    let mut short_circuited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(CircuitBreakerError::ShortCircuited) => short_circuited += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(short_circuited, 15);
    assert_eq!(store.calls(), 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Calls admitted while closed that finish after the breaker opened do not
/// close or re-open it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_results_leave_open_breaker_alone() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let breaker = guarded(
        Arc::clone(&store),
        CircuitBreakerLayer::builder()
            .reset_timeout(Duration::from_secs(60))
            .build(),
    );

    store.set_latency(Duration::from_millis(100));
    let slow = tokio::spawn(breaker.clone().oneshot(list(Duration::from_secs(5))));

    // Give the slow call time to be admitted, then trip the breaker.
    sleep(Duration::from_millis(20)).await;
    breaker.force_open();

    slow.await.unwrap().unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.metrics().total_successes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_breaker_counts_every_outcome() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let breaker = guarded(Arc::clone(&store), CircuitBreakerLayer::builder().build());

    let mut handles = Vec::new();
    for _ in 0..50 {
        let breaker = breaker.clone();
        handles.push(tokio::spawn(async move {
            breaker.oneshot(list(Duration::from_secs(1))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let metrics = breaker.metrics();
    assert_eq!(metrics.total_successes, 50);
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(store.calls(), 50);
}
