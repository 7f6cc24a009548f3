//! Integration test: membership churn.
//!
//! Servers fail and are replaced; routing for keys that were not on the
//! failed server and are not claimed by the replacement must not change.

use keel_integration_tests::{balancer_with, churn_config, id, route_all};
use keel_ring::Ring;

/// Servers 1, 2, 3 on a 2048-slot ring with 100 vnodes each. Server 2 fails
/// and server 4 replaces it.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_replace_failed_server() {
    let balancer = balancer_with(&churn_config(), 3).await;

    let first = balancer.route(42u64).await.unwrap().server;
    assert!([id(1), id(2), id(3)].contains(&first));
    assert_eq!(balancer.route(42u64).await.unwrap().server, first);

    let keys = 0..20_000u64;
    let before = route_all(&balancer, keys.clone()).await;

    balancer.scale_down(1, vec![id(2)]).await.unwrap();
    balancer.scale_up(1, vec![id(4)]).await.unwrap();
    assert_eq!(balancer.members().await, vec![id(1), id(3), id(4)]);

    let after = route_all(&balancer, keys).await;

    let mut kept = 0;
    for (b, a) in before.iter().zip(&after) {
        if *b == id(2) {
            assert_ne!(*a, id(2));
        } else if a != b {
            assert_eq!(*a, id(4), "key moved from {b} to {a}, not to the new server");
        } else {
            kept += 1;
        }
    }
    assert!(kept > 0, "some keys of servers 1 and 3 must stay put");
}

/// A fresh ring built from the same membership routes identically.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_ring_state_reproducible_from_membership() {
    let a = balancer_with(&churn_config(), 5).await;
    let b = balancer_with(&churn_config(), 5).await;

    assert_eq!(
        route_all(&a, 0..5_000).await,
        route_all(&b, 0..5_000).await
    );
}

/// Affected keyspace after one join is bounded by the joiner's share.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_join_remaps_only_joiners_share() {
    let balancer = balancer_with(&churn_config(), 4).await;
    let old = balancer.ring().await;

    balancer.scale_up(1, Vec::new()).await.unwrap();
    let new = balancer.ring().await;
    let joiner = id(5);

    let moved = Ring::diff(&old, &new, 0..50_000u64);
    assert!(moved.iter().all(|m| m.to == Some(joiner)));

    let share = f64::from(new.ownership()[&joiner]) / f64::from(new.slot_count());
    let fraction = moved.len() as f64 / 50_000.0;
    assert!(
        (fraction - share).abs() < 0.05,
        "moved {fraction:.3} of keys but joiner owns {share:.3} of the ring"
    );
}

/// Repeated leave/join cycles never leak slots.
#[tokio::test]
#[ntest::timeout(30000)]
async fn test_repeated_churn_keeps_ring_consistent() {
    let config = churn_config();
    let balancer = balancer_with(&config, 3).await;

    for round in 0..10u64 {
        let victim = balancer.members().await[0];
        balancer.scale_down(1, vec![victim]).await.unwrap();
        balancer.scale_up(1, vec![id(100 + round)]).await.unwrap();

        let ring = balancer.ring().await;
        assert_eq!(ring.server_count(), 3);
        assert_eq!(
            ring.occupied_count(),
            3 * config.virtuals_per_server as usize
        );
        for server in ring.members() {
            for &slot in ring.slots_of(server).unwrap() {
                assert_eq!(ring.owner_of_slot(slot), Some(server));
            }
        }
    }
}

/// The simulator's recovery experiment agrees with the balancer.
#[test]
fn test_simulator_recovery_matches_expectation() {
    let sim = keel_sim::SimConfig {
        ring: churn_config(),
        ..keel_sim::SimConfig::default()
    };
    let report = keel_sim::failure_recovery(&sim, 3).unwrap();

    assert_eq!(report.members_after, vec![id(1), id(3), id(4)]);
    assert!(report.only_affected_keys_moved);
}
