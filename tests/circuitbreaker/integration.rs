use super::{guarded, list};
use resilient_lookup_circuitbreaker::{CircuitBreakerError, CircuitBreakerLayer, CircuitState};
use resilient_lookup_core::LookupError;
use resilient_lookup_discovery::Endpoint;
use resilient_lookup_remote::{InMemoryStore, Invocation, Request, Reservation};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test(start_paused = true)]
async fn threshold_timeouts_open_and_skip_the_store() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    store.set_latency(Duration::from_secs(5));

    let breaker = guarded(
        Arc::clone(&store),
        CircuitBreakerLayer::builder()
            .failure_threshold(3)
            .reset_timeout(Duration::from_secs(30))
            .name("reservationservice/list")
            .build(),
    );

    for attempt in 1..=3 {
        let err = breaker
            .clone()
            .oneshot(list(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(
            matches!(err, CircuitBreakerError::Inner(LookupError::Timeout { .. })),
            "attempt {attempt} should time out"
        );
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(store.calls(), 3);

    let err = breaker
        .clone()
        .oneshot(list(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(err.is_short_circuited());
    assert_eq!(store.calls(), 3, "short-circuited call must not reach the store");
}

#[tokio::test]
async fn success_in_between_restarts_the_count() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek"]));
    let breaker = guarded(
        Arc::clone(&store),
        CircuitBreakerLayer::builder().failure_threshold(2).build(),
    );

    store.set_reachable(false);
    let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;
    store.set_reachable(true);
    breaker
        .clone()
        .oneshot(list(Duration::from_secs(1)))
        .await
        .unwrap();
    store.set_reachable(false);
    let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().consecutive_failures, 1);
}

#[tokio::test]
async fn conflicts_and_missing_records_never_trip() {
    let store = Arc::new(InMemoryStore::with_names(["Jarek", "Piotr"]));
    let breaker = guarded(Arc::clone(&store), CircuitBreakerLayer::builder().build());

    let endpoint = Endpoint::http("10.0.0.7", 8000);
    for request in [
        Request::Create(Reservation::new("Jarek")),
        Request::GetByName("Zenon".into()),
        Request::Create(Reservation::new("Piotr")),
    ] {
        let err = breaker
            .clone()
            .oneshot(Invocation {
                endpoint: endpoint.clone(),
                request,
                timeout: Duration::from_secs(1),
            })
            .await
            .unwrap_err();
        match err {
            CircuitBreakerError::Inner(e) => assert!(e.is_business(), "unexpected {e}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.metrics().total_failures, 0);
}

#[tokio::test]
async fn listeners_see_transitions_and_rejections() {
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let rejected = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(Mutex::new(Vec::new()));

    let t = Arc::clone(&transitions);
    let r = Arc::clone(&rejected);
    let f = Arc::clone(&failures);
    let layer = CircuitBreakerLayer::builder()
        .failure_threshold(2)
        .reset_timeout(Duration::from_secs(60))
        .on_state_transition(move |from, to| t.lock().unwrap().push((from, to)))
        .on_call_rejected(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .on_failure(move |_, streak| f.lock().unwrap().push(streak))
        .build();

    let store = Arc::new(InMemoryStore::new());
    store.set_reachable(false);
    let breaker = guarded(store, layer);

    for _ in 0..4 {
        let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;
    }

    assert_eq!(
        *transitions.lock().unwrap(),
        vec![(CircuitState::Closed, CircuitState::Open)]
    );
    assert_eq!(*failures.lock().unwrap(), vec![1, 2]);
    assert_eq!(rejected.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn custom_classifier_can_ignore_unreachable() {
    let layer = CircuitBreakerLayer::builder()
        .failure_classifier(|result: &Result<resilient_lookup_remote::Reply, LookupError>| {
            matches!(result, Err(e) if e.is_timeout())
        })
        .build();

    let store = Arc::new(InMemoryStore::new());
    store.set_reachable(false);
    let breaker = layer.layer_fn(resilient_lookup_remote::RemoteInvoker::from_shared(
        store,
        resilient_lookup_remote::InvokerConfig::default(),
    ));

    for _ in 0..3 {
        let _ = breaker.clone().oneshot(list(Duration::from_secs(1))).await;
    }
    assert_eq!(breaker.state_sync(), CircuitState::Closed);
}
