//! Integration test: concurrent routing during scale operations.
//!
//! Lookups share the lock while scale batches are serialized; readers must
//! only ever observe complete batches and must never fail to route while at
//! least one server is present.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use keel_integration_tests::{balancer_with, churn_config, id};
use keel_ring::RingConfig;
use keel_router::RouterError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn test_routes_during_scaling_always_succeed() {
    let balancer = balancer_with(&churn_config(), 2).await;
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for r in 0..8u64 {
        let balancer = Arc::clone(&balancer);
        let done = Arc::clone(&done);
        readers.push(tokio::spawn(async move {
            let mut routed = 0u64;
            let mut key = r;
            while !done.load(Ordering::Relaxed) {
                let route = balancer.route(key).await.unwrap();
                assert!(route.slot < 2048);
                routed += 1;
                key += 8;
                tokio::task::yield_now().await;
            }
            routed
        }));
    }

    for _ in 0..50 {
        balancer.scale_up(3, Vec::new()).await.unwrap();
        balancer.scale_down(3, Vec::new()).await.unwrap();
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }
    assert_eq!(balancer.members().await, vec![id(1), id(2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn test_concurrent_scale_ups_get_distinct_ids() {
    let config = RingConfig {
        slot_count: 8192,
        virtuals_per_server: 16,
        ..RingConfig::default()
    };
    let balancer = balancer_with(&config, 0).await;

    let mut writers = Vec::new();
    for _ in 0..10 {
        let balancer = Arc::clone(&balancer);
        writers.push(tokio::spawn(async move {
            balancer.scale_up(2, Vec::new()).await.unwrap();
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let members = balancer.members().await;
    assert_eq!(members, (1..=20).map(id).collect::<Vec<_>>());
    assert_eq!(balancer.ring().await.occupied_count(), 20 * 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn test_contending_scale_downs_keep_one_server() {
    let balancer = balancer_with(&churn_config(), 4).await;

    let mut writers = Vec::new();
    for _ in 0..6 {
        let balancer = Arc::clone(&balancer);
        writers.push(tokio::spawn(
            async move { balancer.scale_down(1, Vec::new()).await },
        ));
    }

    let mut refused = 0;
    for writer in writers {
        match writer.await.unwrap() {
            Ok(_) => {}
            Err(RouterError::WouldEmpty { .. }) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(refused, 3);
    assert_eq!(balancer.members().await, vec![id(1)]);
}
