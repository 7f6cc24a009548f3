//! Error types for the routing service.

use keel_ring::{RingError, ServerId};

/// Errors produced by [`Balancer`](crate::Balancer) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// An error from the underlying ring.
    #[error(transparent)]
    Ring(#[from] RingError),

    /// Malformed scale request.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// A server named in a scale-down request is not a member.
    #[error("{0} is not a member of the ring")]
    NotMember(ServerId),

    /// Scaling down would leave no servers behind.
    #[error("cannot remove {requested} servers: only {members} present and at least one must remain")]
    WouldEmpty {
        /// How many removals were requested.
        requested: usize,
        /// How many servers are currently members.
        members: usize,
    },

    /// The ring has no members to route to.
    #[error("no server available")]
    NoServerAvailable,
}
