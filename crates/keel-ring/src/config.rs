//! Ring construction parameters.

use serde::{Deserialize, Serialize};

use crate::hasher::HasherKind;

/// Default number of slots in the hash space.
pub const DEFAULT_SLOT_COUNT: u32 = 512;

/// Default number of virtual nodes per server.
pub const DEFAULT_VIRTUALS_PER_SERVER: u32 = 9;

/// Parameters fixed for the life of a ring.
///
/// Deserializes from a `[ring]` TOML table; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Number of discrete positions in the hash space.
    pub slot_count: u32,
    /// Virtual nodes assigned to each server on join.
    pub virtuals_per_server: u32,
    /// Hash strategy for requests and virtual nodes.
    pub hasher: HasherKind,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            virtuals_per_server: DEFAULT_VIRTUALS_PER_SERVER,
            hasher: HasherKind::default(),
        }
    }
}

impl RingConfig {
    /// Maximum number of servers that fit without exhausting the slots.
    pub fn capacity(&self) -> u32 {
        self.slot_count
            .checked_div(self.virtuals_per_server)
            .unwrap_or(0)
    }
}
