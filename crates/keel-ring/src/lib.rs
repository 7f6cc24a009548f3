//! Consistent hashing ring for routing requests to a dynamic set of servers.
//!
//! The hash space is a fixed number of discrete slots arranged in a circle.
//! Each server claims several slots (virtual nodes) on join; a request is
//! served by the owner of the first occupied slot at or after the request's
//! own slot, wrapping around past the end. Adding or removing a server only
//! moves the keys that fall into the ranges its virtual nodes cover.
//!
//! Slot candidates come from a pluggable [`SlotHasher`]. Collisions are
//! resolved by probing forward to the next free slot, and a join that runs
//! out of free slots is rolled back completely.

mod config;
mod error;
mod hasher;
mod id;
mod ring;

pub use config::{DEFAULT_SLOT_COUNT, DEFAULT_VIRTUALS_PER_SERVER, RingConfig};
pub use error::RingError;
pub use hasher::{DigestHasher, FnHasher, HasherKind, LinearHasher, SlotHasher};
pub use id::{ParseServerIdError, RequestKey, ServerId};
pub use ring::{Remap, Ring};
