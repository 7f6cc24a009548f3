//! Routing service over a consistent hash ring.
//!
//! [`Balancer`] owns one [`Ring`](keel_ring::Ring) behind a read-write lock:
//! scale operations take the write lock for their whole batch, lookups share
//! the read lock. A lookup therefore sees a scale batch either completely or
//! not at all.

mod balancer;
mod error;

pub use balancer::{Balancer, BalancerEvent, Route};
pub use error::RouterError;
