//! Error types for ring operations.

use crate::id::ServerId;

/// Errors produced by the hash ring.
///
/// All of them are structural and deterministic: retrying the same call on
/// the same ring state yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// No free slot was left while placing one of the server's virtual nodes.
    ///
    /// The ring has been rolled back to its state before the call.
    #[error("ring full: placed {placed} of the virtual nodes for {server} across {slot_count} slots")]
    RingFull {
        /// The server that could not join.
        server: ServerId,
        /// How many virtual nodes were placed before the ring ran out.
        placed: u32,
        /// Total number of slots in the ring.
        slot_count: u32,
    },

    /// The server is already a member of the ring.
    #[error("{0} is already a member of the ring")]
    AlreadyMember(ServerId),

    /// The ring was constructed with unusable parameters.
    #[error("invalid ring configuration: {0}")]
    InvalidConfig(String),
}
