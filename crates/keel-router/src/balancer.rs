//! The routing service: one ring, serialized writers, concurrent readers.

use std::collections::BTreeSet;
use std::sync::Arc;

use keel_ring::{RequestKey, Ring, RingConfig, ServerId};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::error::RouterError;

/// Membership changes broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalancerEvent {
    /// A server joined the ring.
    ServerSpawned(ServerId),
    /// A server left the ring.
    ServerRetired(ServerId),
    /// A scale request was rejected and rolled back.
    ScaleFailed {
        /// How many servers the request asked to add or remove.
        requested: usize,
        /// Why it failed.
        reason: String,
    },
}

/// Where a request was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    /// The server that should handle the request.
    pub server: ServerId,
    /// The slot the request key hashed to.
    pub slot: u32,
}

/// Routing service owning a single hash ring.
pub struct Balancer {
    /// The ring; writers hold the lock for a whole scale batch.
    ring: RwLock<Ring>,
    /// Broadcast channel for membership events.
    event_tx: broadcast::Sender<BalancerEvent>,
}

impl Balancer {
    /// Create a balancer with an empty ring built from `config`.
    pub fn new(config: &RingConfig) -> Result<Arc<Self>, RouterError> {
        Ok(Self::with_ring(Ring::from_config(config)?))
    }

    /// Create a balancer around an existing ring.
    pub fn with_ring(ring: Ring) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            ring: RwLock::new(ring),
            event_tx,
        })
    }

    /// Subscribe to membership events.
    pub fn subscribe(&self) -> broadcast::Receiver<BalancerEvent> {
        self.event_tx.subscribe()
    }

    /// Add `n` servers and return the updated member list.
    ///
    /// Ids in `requested` are used first; the rest are numbered upward from
    /// the highest id seen so far. Either every server joins or none does.
    pub async fn scale_up(
        &self,
        n: usize,
        requested: Vec<ServerId>,
    ) -> Result<Vec<ServerId>, RouterError> {
        validate_batch(n, &requested)?;

        let mut ring = self.ring.write().await;

        let mut next = ring
            .members()
            .last()
            .copied()
            .into_iter()
            .chain(requested.iter().copied())
            .max()
            .map_or(ServerId::new(1), ServerId::next);

        let mut batch = requested;
        while batch.len() < n {
            batch.push(next);
            next = next.next();
        }

        let mut added = Vec::with_capacity(n);
        for server in batch {
            if let Err(e) = ring.add_server(server) {
                for joined in &added {
                    ring.remove_server(*joined);
                }
                drop(ring);
                warn!(requested = n, error = %e, "scale up rolled back");
                let _ = self.event_tx.send(BalancerEvent::ScaleFailed {
                    requested: n,
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
            added.push(server);
        }

        let members = ring.members();
        drop(ring);

        for server in added {
            info!(%server, "spawned server");
            let _ = self.event_tx.send(BalancerEvent::ServerSpawned(server));
        }

        Ok(members)
    }

    /// Remove `n` servers and return the updated member list.
    ///
    /// Ids in `requested` go first; the rest are the highest-numbered
    /// members. At least one server always remains.
    pub async fn scale_down(
        &self,
        n: usize,
        requested: Vec<ServerId>,
    ) -> Result<Vec<ServerId>, RouterError> {
        validate_batch(n, &requested)?;

        let mut ring = self.ring.write().await;

        let members = ring.server_count();
        if n >= members {
            drop(ring);
            let err = RouterError::WouldEmpty {
                requested: n,
                members,
            };
            let _ = self.event_tx.send(BalancerEvent::ScaleFailed {
                requested: n,
                reason: err.to_string(),
            });
            return Err(err);
        }
        if let Some(missing) = requested.iter().find(|s| !ring.contains(**s)) {
            return Err(RouterError::NotMember(*missing));
        }

        let mut victims = requested;
        for server in ring.members().into_iter().rev() {
            if victims.len() == n {
                break;
            }
            if !victims.contains(&server) {
                victims.push(server);
            }
        }

        for server in &victims {
            ring.remove_server(*server);
        }

        let members = ring.members();
        drop(ring);

        for server in victims {
            info!(%server, "retired server");
            let _ = self.event_tx.send(BalancerEvent::ServerRetired(server));
        }

        Ok(members)
    }

    /// Route a request key to a server.
    pub async fn route(&self, key: impl Into<RequestKey>) -> Result<Route, RouterError> {
        let key = key.into();
        let ring = self.ring.read().await;
        let slot = ring.slot_for(&key);
        let server = ring.lookup(key).ok_or(RouterError::NoServerAvailable)?;
        debug!(%server, slot, "routed request");
        Ok(Route { server, slot })
    }

    /// Current members, ascending.
    pub async fn members(&self) -> Vec<ServerId> {
        self.ring.read().await.members()
    }

    /// Number of current members.
    pub async fn member_count(&self) -> usize {
        self.ring.read().await.server_count()
    }

    /// Point-in-time copy of the ring.
    pub async fn ring(&self) -> Ring {
        self.ring.read().await.clone()
    }
}

impl std::fmt::Debug for Balancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Balancer").finish_non_exhaustive()
    }
}

/// Reject empty batches, over-long id lists and repeated ids.
fn validate_batch(n: usize, requested: &[ServerId]) -> Result<(), RouterError> {
    if n == 0 {
        return Err(RouterError::InvalidRequest {
            message: "number of servers must be at least 1".into(),
        });
    }
    if requested.len() > n {
        return Err(RouterError::InvalidRequest {
            message: format!(
                "{} server ids given but only {n} servers requested",
                requested.len()
            ),
        });
    }
    let unique: BTreeSet<_> = requested.iter().collect();
    if unique.len() != requested.len() {
        return Err(RouterError::InvalidRequest {
            message: "server ids must be distinct".into(),
        });
    }
    Ok(())
}
