//! Property tests for endpoint selection.
//!
//! Invariants tested:
//! - Round robin spreads picks evenly over the candidates
//! - First available ignores everything but the head of the list
//! - Every selector rejects an empty candidate list

use proptest::prelude::*;
use resilient_lookup_core::LookupError;
use resilient_lookup_discovery::{Endpoint, FirstAvailable, RoundRobin, Selector, ServiceName};
use std::collections::HashMap;

fn pool(size: usize) -> Vec<Endpoint> {
    (0..size)
        .map(|i| Endpoint::http(format!("10.0.0.{}", i + 1), 8000))
        .collect()
}

fn service() -> ServiceName {
    ServiceName::new("reservationservice").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: after n picks no candidate is chosen more than once above any other
    #[test]
    fn round_robin_is_even(size in 1usize..=8, picks in 1usize..=100) {
        let candidates = pool(size);
        let selector = RoundRobin::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for _ in 0..picks {
            let chosen = selector.pick(&service(), &candidates).unwrap();
            *seen.entry(chosen.instance_id().to_string()).or_default() += 1;
        }

        let max = seen.values().copied().max().unwrap_or(0);
        let min = if seen.len() < size { 0 } else { seen.values().copied().min().unwrap_or(0) };
        prop_assert!(max - min <= 1, "uneven spread: {:?}", seen);
    }

    /// Property: first available always returns the head
    #[test]
    fn first_available_returns_the_head(size in 1usize..=8, picks in 1usize..=20) {
        let candidates = pool(size);
        for _ in 0..picks {
            let chosen = FirstAvailable.pick(&service(), &candidates).unwrap();
            prop_assert_eq!(chosen, &candidates[0]);
        }
    }

    /// Property: blank service names are rejected, others are kept verbatim
    #[test]
    fn service_names_reject_blanks(name in "[ \t]{0,4}|[a-z][a-z0-9-]{0,20}") {
        match ServiceName::new(name.clone()) {
            Ok(service) => prop_assert_eq!(service.as_str(), name.as_str()),
            Err(err) => {
                prop_assert!(name.trim().is_empty());
                prop_assert_eq!(err, LookupError::InvalidServiceName);
            }
        }
    }
}

#[test]
fn selectors_reject_empty_candidates() {
    let empty: Vec<Endpoint> = Vec::new();
    let expected = LookupError::NoEndpointAvailable {
        service: "reservationservice".into(),
    };
    assert_eq!(FirstAvailable.pick(&service(), &empty), Err(expected.clone()));
    assert_eq!(RoundRobin::new().pick(&service(), &empty), Err(expected));
}
