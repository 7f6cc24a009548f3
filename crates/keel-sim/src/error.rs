//! Error types for simulations.

use keel_ring::RingError;

/// Errors that can occur while running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The ring rejected a configuration or membership change.
    #[error("ring error: {0}")]
    Ring(#[from] RingError),

    /// A simulation parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
