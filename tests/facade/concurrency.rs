use super::{harness, placeholder_names, SEED};
use resilient_lookup::{CircuitState, Operation};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Every convenience operation can be driven from a spawned task.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn operations_run_on_spawned_tasks() {
    let h = harness(|b| b);

    let list = {
        let (client, service) = (Arc::clone(&h.client), h.service.clone());
        tokio::spawn(async move { client.names(&service).await })
    };
    let by_id = {
        let (client, service) = (Arc::clone(&h.client), h.service.clone());
        tokio::spawn(async move { client.get_by_id(&service, 3).await })
    };
    let by_name = {
        let (client, service) = (Arc::clone(&h.client), h.service.clone());
        tokio::spawn(async move { client.get_by_name(&service, "Jarek").await })
    };

    assert_eq!(list.await.unwrap().unwrap(), SEED);
    assert_eq!(by_id.await.unwrap().unwrap().map(|r| r.name), Some("Marek".to_string()));
    assert_eq!(by_name.await.unwrap().unwrap().and_then(|r| r.id), Some(1));
}

/// After the reset timeout exactly one of many concurrent callers reaches the
/// store; everyone else is answered by the fallback.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_trial_among_concurrent_callers() {
    let h = harness(|b| b.reset_timeout(Duration::from_millis(50)));

    h.store.set_reachable(false);
    assert_eq!(h.client.names(&h.service).await.unwrap(), placeholder_names());
    assert_eq!(h.store.calls(), 1);

    sleep(Duration::from_millis(100)).await;
    h.store.set_reachable(true);
    h.store.set_latency(Duration::from_millis(200));

    let barrier = Arc::new(tokio::sync::Barrier::new(12));
    let mut handles = Vec::new();
    for _ in 0..12 {
        let client = Arc::clone(&h.client);
        let service = h.service.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            client.names(&service).await
        }));
    }

    let mut real = 0;
    let mut fallback = 0;
    for handle in handles {
        let names = handle.await.unwrap().unwrap();
        if names == SEED {
            real += 1;
        } else {
            assert_eq!(names, placeholder_names());
            fallback += 1;
        }
    }

    assert_eq!(real, 1);
    assert_eq!(fallback, 11);
    assert_eq!(h.store.calls(), 2);
    assert_eq!(
        h.client.breaker_state(&h.service, Operation::List),
        Some(CircuitState::Closed)
    );
}

/// Dropping a half-open trial's future hands the trial to the next caller.
#[tokio::test(start_paused = true)]
async fn cancelled_trial_releases_the_breaker() {
    let h = harness(|b| {
        b.reset_timeout(Duration::from_secs(5))
            .default_timeout(Duration::from_secs(30))
    });

    h.store.set_reachable(false);
    h.client.names(&h.service).await.unwrap();
    sleep(Duration::from_secs(5)).await;

    h.store.set_reachable(true);
    h.store.set_latency(Duration::from_secs(10));
    let abandoned = timeout(Duration::from_millis(100), h.client.names(&h.service)).await;
    assert!(abandoned.is_err(), "caller gave up before the store answered");
    assert_eq!(
        h.client.breaker_state(&h.service, Operation::List),
        Some(CircuitState::HalfOpen)
    );

    h.store.set_latency(Duration::ZERO);
    assert_eq!(h.client.names(&h.service).await.unwrap(), SEED);
    assert_eq!(
        h.client.breaker_state(&h.service, Operation::List),
        Some(CircuitState::Closed)
    );
}

/// Breakers are keyed by operation: an outage seen by one does not gate another.
#[tokio::test]
async fn breakers_are_independent_per_operation() {
    let h = harness(|b| b);

    h.store.set_reachable(false);
    h.client.names(&h.service).await.unwrap();
    h.store.set_reachable(true);

    assert_eq!(
        h.client.breaker_state(&h.service, Operation::List),
        Some(CircuitState::Open)
    );
    let found = h.client.get_by_name(&h.service, "Piotr").await.unwrap();
    assert_eq!(found.map(|r| r.name), Some("Piotr".to_string()));
    assert_eq!(h.client.health_status(), "unhealthy");
}
