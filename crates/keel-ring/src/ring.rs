//! Consistent hashing ring implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::RingConfig;
use crate::error::RingError;
use crate::hasher::SlotHasher;
use crate::id::{RequestKey, ServerId};

/// A key whose owner differs between two ring states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    /// The key that moved.
    pub key: RequestKey,
    /// Owner in the old ring (`None` if it was empty).
    pub from: Option<ServerId>,
    /// Owner in the new ring (`None` if it is empty).
    pub to: Option<ServerId>,
}

/// Consistent hashing ring over a fixed number of slots.
///
/// `slot_to_server` and `server_slots` mirror each other exactly: a slot is
/// listed under a server iff it maps to that server. The ascending key order
/// of `slot_to_server` is the clockwise order used by [`Ring::lookup`].
#[derive(Debug, Clone)]
pub struct Ring {
    /// Occupied slot -> owning server, ascending by slot.
    slot_to_server: BTreeMap<u32, ServerId>,
    /// Server -> its virtual-node slots, in virtual-index order.
    server_slots: BTreeMap<ServerId, Vec<u32>>,
    /// Size of the hash space.
    slot_count: u32,
    /// Virtual nodes claimed per server on join.
    virtuals_per_server: u32,
    /// Slot candidate strategy.
    hasher: Arc<dyn SlotHasher>,
}

impl Ring {
    /// Create an empty ring.
    ///
    /// Both `slot_count` and `virtuals_per_server` must be non-zero.
    pub fn new(
        slot_count: u32,
        virtuals_per_server: u32,
        hasher: Arc<dyn SlotHasher>,
    ) -> Result<Self, RingError> {
        if slot_count == 0 {
            return Err(RingError::InvalidConfig(
                "slot_count must be at least 1".into(),
            ));
        }
        if virtuals_per_server == 0 {
            return Err(RingError::InvalidConfig(
                "virtuals_per_server must be at least 1".into(),
            ));
        }

        Ok(Self {
            slot_to_server: BTreeMap::new(),
            server_slots: BTreeMap::new(),
            slot_count,
            virtuals_per_server,
            hasher,
        })
    }

    /// Create an empty ring from a [`RingConfig`].
    pub fn from_config(config: &RingConfig) -> Result<Self, RingError> {
        Self::new(
            config.slot_count,
            config.virtuals_per_server,
            config.hasher.build(),
        )
    }

    /// Add a server, claiming `virtuals_per_server` free slots for it.
    ///
    /// Each virtual node starts at its hashed slot and probes forward to the
    /// next free one. If a full lap finds nothing free, every slot claimed so
    /// far in this call is released and [`RingError::RingFull`] is returned,
    /// leaving the ring exactly as it was.
    pub fn add_server(&mut self, server: ServerId) -> Result<(), RingError> {
        if self.server_slots.contains_key(&server) {
            return Err(RingError::AlreadyMember(server));
        }

        let mut claimed = Vec::with_capacity(self.virtuals_per_server as usize);

        for vnode in 0..self.virtuals_per_server {
            let candidate =
                self.hasher.hash_virtual(server, vnode, self.slot_count) % self.slot_count;

            let Some(slot) = self.probe_free(candidate) else {
                for slot in &claimed {
                    self.slot_to_server.remove(slot);
                }
                debug!(%server, placed = claimed.len(), "ring full, join rolled back");
                return Err(RingError::RingFull {
                    server,
                    placed: claimed.len() as u32,
                    slot_count: self.slot_count,
                });
            };

            self.slot_to_server.insert(slot, server);
            claimed.push(slot);
        }

        debug!(%server, vnodes = claimed.len(), "added server to ring");
        self.server_slots.insert(server, claimed);
        Ok(())
    }

    /// Remove a server and free all of its slots.
    ///
    /// Returns `false` (and does nothing) if the server is not a member.
    pub fn remove_server(&mut self, server: ServerId) -> bool {
        let Some(slots) = self.server_slots.remove(&server) else {
            return false;
        };

        for slot in &slots {
            self.slot_to_server.remove(slot);
        }

        debug!(%server, vnodes = slots.len(), "removed server from ring");
        true
    }

    /// Find the server responsible for `key`.
    ///
    /// Walks clockwise from the key's slot to the first occupied slot,
    /// wrapping around to the smallest one. Returns `None` on an empty ring.
    pub fn lookup(&self, key: impl Into<RequestKey>) -> Option<ServerId> {
        let slot = self.slot_for(&key.into());

        // BTreeMap::range gives us everything >= slot; otherwise wrap to the start.
        self.slot_to_server
            .range(slot..)
            .next()
            .or_else(|| self.slot_to_server.first_key_value())
            .map(|(_, server)| *server)
    }

    /// The slot a request key hashes to.
    pub fn slot_for(&self, key: &RequestKey) -> u32 {
        self.hasher.hash_request(key, self.slot_count) % self.slot_count
    }

    /// Compute which keys change owner between two ring states.
    pub fn diff<K>(old: &Ring, new: &Ring, keys: impl IntoIterator<Item = K>) -> Vec<Remap>
    where
        K: Into<RequestKey>,
    {
        keys.into_iter()
            .filter_map(|key| {
                let key = key.into();
                let from = old.lookup(key.clone());
                let to = new.lookup(key.clone());
                (from != to).then_some(Remap { key, from, to })
            })
            .collect()
    }

    /// Number of hash-space slots each server answers for.
    ///
    /// A virtual node owns every slot from just after its predecessor up to
    /// and including itself, so the values always sum to `slot_count` on a
    /// non-empty ring.
    pub fn ownership(&self) -> BTreeMap<ServerId, u32> {
        let mut shares = BTreeMap::new();
        let Some((&last, _)) = self.slot_to_server.last_key_value() else {
            return shares;
        };

        // The predecessor of the first slot is the last one, one lap back.
        let mut prev = i64::from(last) - i64::from(self.slot_count);
        for (&slot, &server) in &self.slot_to_server {
            let span = (i64::from(slot) - prev) as u32;
            *shares.entry(server).or_insert(0) += span;
            prev = i64::from(slot);
        }

        shares
    }

    /// Current members, ascending.
    pub fn members(&self) -> Vec<ServerId> {
        self.server_slots.keys().copied().collect()
    }

    /// Whether `server` is on the ring.
    pub fn contains(&self, server: ServerId) -> bool {
        self.server_slots.contains_key(&server)
    }

    /// The slots held by `server`, in virtual-index order.
    pub fn slots_of(&self, server: ServerId) -> Option<&[u32]> {
        self.server_slots.get(&server).map(Vec::as_slice)
    }

    /// The owner of a specific slot, if occupied.
    pub fn owner_of_slot(&self, slot: u32) -> Option<ServerId> {
        self.slot_to_server.get(&slot).copied()
    }

    /// Occupied slots in ascending order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.slot_to_server.keys().copied()
    }

    /// Number of member servers.
    pub fn server_count(&self) -> usize {
        self.server_slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.slot_to_server.len()
    }

    /// Number of unoccupied slots.
    pub fn free_slots(&self) -> u32 {
        self.slot_count - self.slot_to_server.len() as u32
    }

    /// Whether the ring has no members.
    pub fn is_empty(&self) -> bool {
        self.server_slots.is_empty()
    }

    /// Size of the hash space.
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Virtual nodes claimed per server.
    pub fn virtuals_per_server(&self) -> u32 {
        self.virtuals_per_server
    }

    /// Linear probe from `start` for an unoccupied slot; `None` after a full lap.
    fn probe_free(&self, start: u32) -> Option<u32> {
        let mut slot = start;
        loop {
            if !self.slot_to_server.contains_key(&slot) {
                return Some(slot);
            }
            slot = (slot + 1) % self.slot_count;
            if slot == start {
                return None;
            }
        }
    }
}
