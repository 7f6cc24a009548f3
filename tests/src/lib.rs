//! Shared test harness for keel integration tests.
//!
//! Provides helpers to build balancers with a known membership and to
//! snapshot routing decisions for a batch of keys so that tests can compare
//! them before and after a membership change.

use std::sync::Arc;

use keel_ring::{HasherKind, RingConfig, ServerId};
use keel_router::Balancer;

/// Ring shape used by the churn scenarios.
pub fn churn_config() -> RingConfig {
    RingConfig {
        slot_count: 2048,
        virtuals_per_server: 100,
        hasher: HasherKind::Digest,
    }
}

/// A balancer over `config` with servers `1..=n` already joined.
pub async fn balancer_with(config: &RingConfig, n: usize) -> Arc<Balancer> {
    let balancer = Balancer::new(config).expect("valid ring config");
    if n > 0 {
        balancer
            .scale_up(n, Vec::new())
            .await
            .expect("initial servers fit");
    }
    balancer
}

/// Route every key in `keys` and return the chosen servers in order.
pub async fn route_all(balancer: &Balancer, keys: impl IntoIterator<Item = u64>) -> Vec<ServerId> {
    let mut out = Vec::new();
    for key in keys {
        let route = balancer.route(key).await.expect("ring is not empty");
        out.push(route.server);
    }
    out
}

/// Shorthand for a server id.
pub fn id(n: u64) -> ServerId {
    ServerId::new(n)
}
