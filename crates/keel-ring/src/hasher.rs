//! Pluggable hash strategies mapping keys and virtual nodes onto slots.
//!
//! The ring never hashes anything itself; it asks a [`SlotHasher`] for a
//! candidate slot and handles collisions on its own. Swapping the strategy
//! therefore changes placement but never ring mechanics.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::id::{RequestKey, ServerId};

/// Maps request keys and `(server, vnode)` pairs into `[0, slot_count)`.
///
/// Implementations must be pure: the same inputs always produce the same
/// slot, across calls and across process restarts.
pub trait SlotHasher: Send + Sync + fmt::Debug {
    /// Candidate slot for a request key.
    fn hash_request(&self, key: &RequestKey, slot_count: u32) -> u32;

    /// Candidate slot for virtual node `vnode` of `server`.
    fn hash_virtual(&self, server: ServerId, vnode: u32, slot_count: u32) -> u32;
}

/// blake3-based strategy: first 128 bits of the digest, reduced mod `slot_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestHasher;

impl DigestHasher {
    fn reduce(hash: blake3::Hash, slot_count: u32) -> u32 {
        let mut wide = [0u8; 16];
        wide.copy_from_slice(&hash.as_bytes()[..16]);
        (u128::from_le_bytes(wide) % u128::from(slot_count)) as u32
    }
}

impl SlotHasher for DigestHasher {
    fn hash_request(&self, key: &RequestKey, slot_count: u32) -> u32 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"req");
        hasher.update(&key.to_bytes());
        Self::reduce(hasher.finalize(), slot_count)
    }

    fn hash_virtual(&self, server: ServerId, vnode: u32, slot_count: u32) -> u32 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"vnode");
        hasher.update(&server.get().to_le_bytes());
        hasher.update(&vnode.to_le_bytes());
        Self::reduce(hasher.finalize(), slot_count)
    }
}

/// Linear strategy: `(a*i + b) mod slots` for requests and
/// `(server + c*j + d) mod slots` for virtual nodes.
///
/// Cheap but low-entropy; consecutive keys land on consecutive slots, which
/// clusters load. Kept for comparison against [`DigestHasher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearHasher {
    /// Request multiplier.
    pub a: u64,
    /// Request offset.
    pub b: u64,
    /// Virtual-node index multiplier.
    pub c: u64,
    /// Virtual-node offset.
    pub d: u64,
}

impl LinearHasher {
    /// `3i + 17` / `s + 3j + 25`.
    pub const CLASSIC: Self = Self {
        a: 3,
        b: 17,
        c: 3,
        d: 25,
    };

    /// `5i + 13` / `s + 5j + 17`.
    pub const ALTERNATE: Self = Self {
        a: 5,
        b: 13,
        c: 5,
        d: 17,
    };
}

impl Default for LinearHasher {
    fn default() -> Self {
        Self::CLASSIC
    }
}

impl SlotHasher for LinearHasher {
    fn hash_request(&self, key: &RequestKey, slot_count: u32) -> u32 {
        let i = u128::from(key.as_u64());
        ((u128::from(self.a) * i + u128::from(self.b)) % u128::from(slot_count)) as u32
    }

    fn hash_virtual(&self, server: ServerId, vnode: u32, slot_count: u32) -> u32 {
        let s = u128::from(server.get());
        let j = u128::from(vnode);
        ((s + u128::from(self.c) * j + u128::from(self.d)) % u128::from(slot_count)) as u32
    }
}

/// Strategy built from two plain functions or closures.
///
/// Results outside `[0, slot_count)` are reduced modulo `slot_count`.
#[derive(Clone)]
pub struct FnHasher<R, V> {
    request: R,
    virtual_node: V,
}

impl<R, V> FnHasher<R, V>
where
    R: Fn(&RequestKey, u32) -> u32 + Send + Sync,
    V: Fn(ServerId, u32, u32) -> u32 + Send + Sync,
{
    /// Wrap a request hash and a virtual-node hash.
    pub fn new(request: R, virtual_node: V) -> Self {
        Self {
            request,
            virtual_node,
        }
    }
}

impl<R, V> fmt::Debug for FnHasher<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHasher").finish_non_exhaustive()
    }
}

impl<R, V> SlotHasher for FnHasher<R, V>
where
    R: Fn(&RequestKey, u32) -> u32 + Send + Sync,
    V: Fn(ServerId, u32, u32) -> u32 + Send + Sync,
{
    fn hash_request(&self, key: &RequestKey, slot_count: u32) -> u32 {
        (self.request)(key, slot_count) % slot_count
    }

    fn hash_virtual(&self, server: ServerId, vnode: u32, slot_count: u32) -> u32 {
        (self.virtual_node)(server, vnode, slot_count) % slot_count
    }
}

/// Named hash strategies, selectable from config files and the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HasherKind {
    /// [`DigestHasher`].
    #[default]
    Digest,
    /// [`LinearHasher::CLASSIC`].
    Linear,
    /// [`LinearHasher::ALTERNATE`].
    LinearAlt,
}

impl HasherKind {
    /// Every available strategy, in comparison order.
    pub const ALL: [HasherKind; 3] = [Self::Digest, Self::Linear, Self::LinearAlt];

    /// Instantiate the strategy.
    pub fn build(self) -> Arc<dyn SlotHasher> {
        match self {
            Self::Digest => Arc::new(DigestHasher),
            Self::Linear => Arc::new(LinearHasher::CLASSIC),
            Self::LinearAlt => Arc::new(LinearHasher::ALTERNATE),
        }
    }

    /// Config-file spelling of this strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::Linear => "linear",
            Self::LinearAlt => "linear-alt",
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HasherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digest" => Ok(Self::Digest),
            "linear" => Ok(Self::Linear),
            "linear-alt" => Ok(Self::LinearAlt),
            other => Err(format!(
                "unknown hasher {other:?} (expected digest, linear or linear-alt)"
            )),
        }
    }
}
