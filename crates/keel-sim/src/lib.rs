//! Request-distribution simulator for the keel hash ring.
//!
//! Drives a [`Ring`](keel_ring::Ring) with seeded random request keys and
//! reports how load spreads across servers:
//!
//! - [`distribution`] — per-server request counts for a fixed membership.
//! - [`scaling_sweep`] — the same, for a range of server counts.
//! - [`failure_recovery`] — one server fails and is replaced; how many keys move.
//! - [`compare_hashers`] — load spread under each hash strategy.
//!
//! Every run is deterministic for a given [`SimConfig`].

mod error;
mod experiments;
mod report;


pub use error::SimError;
pub use experiments::{
    SimConfig, SimReport, compare_hashers, distribution, failure_recovery, run_all,
    scaling_sweep,
};
pub use report::{HasherComparison, LoadReport, RecoveryReport, ScalePoint};
