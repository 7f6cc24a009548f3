//! The load experiments.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use keel_ring::{HasherKind, Ring, RingConfig, ServerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::report::{HasherComparison, LoadReport, RecoveryReport, ScalePoint};

/// Parameters shared by every experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ring shape and hash strategy.
    pub ring: RingConfig,
    /// Requests routed per run.
    pub requests: u64,
    /// Request keys are drawn uniformly from `0..=key_space`.
    pub key_space: u64,
    /// RNG seed; the same seed always produces the same keys.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ring: RingConfig::default(),
            requests: 10_000,
            key_space: 1_000,
            seed: 0,
        }
    }
}

/// Results of every experiment for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimReport {
    /// Load on a fixed membership.
    pub distribution: LoadReport,
    /// Load for two to six servers.
    pub scaling: Vec<ScalePoint>,
    /// Failure of server 2 and its replacement.
    pub recovery: RecoveryReport,
    /// Load under each hash strategy.
    pub hashers: Vec<HasherComparison>,
}

/// Run every experiment with `n_servers` servers.
pub fn run_all(config: &SimConfig, n_servers: usize) -> Result<SimReport, SimError> {
    Ok(SimReport {
        distribution: distribution(config, n_servers)?,
        scaling: scaling_sweep(config, 2..=6)?,
        recovery: failure_recovery(config, n_servers)?,
        hashers: compare_hashers(config, n_servers, &HasherKind::ALL)?,
    })
}

/// Route `config.requests` random keys over servers `1..=n_servers`.
pub fn distribution(config: &SimConfig, n_servers: usize) -> Result<LoadReport, SimError> {
    if n_servers == 0 {
        return Err(SimError::InvalidParameter(
            "at least one server is required".into(),
        ));
    }

    let ring = build_ring(&config.ring, n_servers)?;
    let mut counts: BTreeMap<ServerId, u64> =
        ring.members().into_iter().map(|s| (s, 0)).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);

    for _ in 0..config.requests {
        let key = rng.random_range(0..=config.key_space);
        if let Some(server) = ring.lookup(key) {
            *counts.entry(server).or_insert(0) += 1;
        }
    }

    let report = LoadReport::from_counts(counts);
    debug!(
        servers = n_servers,
        imbalance = report.imbalance,
        "distribution run complete"
    );
    Ok(report)
}

/// Run [`distribution`] once per server count in `servers`.
pub fn scaling_sweep(
    config: &SimConfig,
    servers: RangeInclusive<usize>,
) -> Result<Vec<ScalePoint>, SimError> {
    servers
        .map(|n| -> Result<ScalePoint, SimError> {
            let report = distribution(config, n)?;
            Ok(ScalePoint {
                servers: n,
                average_load: report.mean,
                report,
            })
        })
        .collect()
}

/// Fail server 2 on a ring of `n_servers`, spawn server `n_servers + 1`,
/// and measure how many keys in the key space changed server.
pub fn failure_recovery(config: &SimConfig, n_servers: usize) -> Result<RecoveryReport, SimError> {
    if n_servers < 2 {
        return Err(SimError::InvalidParameter(
            "failure recovery needs at least two servers".into(),
        ));
    }

    let before = build_ring(&config.ring, n_servers)?;
    let failed = ServerId::new(2);
    let replacement = ServerId::new(n_servers as u64 + 1);

    let mut after = before.clone();
    after.remove_server(failed);
    after.add_server(replacement)?;

    let remaps = Ring::diff(&before, &after, 0..=config.key_space);
    let keys_checked = config.key_space + 1;
    let keys_remapped = remaps.len() as u64;
    let only_affected_keys_moved = remaps
        .iter()
        .all(|r| r.from == Some(failed) || r.to == Some(replacement));

    Ok(RecoveryReport {
        members_before: before.members(),
        members_after: after.members(),
        failed,
        replacement,
        keys_checked,
        keys_remapped,
        remap_fraction: keys_remapped as f64 / keys_checked as f64,
        only_affected_keys_moved,
    })
}

/// Run [`distribution`] under each hash strategy in `kinds`.
pub fn compare_hashers(
    config: &SimConfig,
    n_servers: usize,
    kinds: &[HasherKind],
) -> Result<Vec<HasherComparison>, SimError> {
    kinds
        .iter()
        .map(|&hasher| -> Result<HasherComparison, SimError> {
            let mut config = config.clone();
            config.ring.hasher = hasher;
            Ok(HasherComparison {
                hasher,
                report: distribution(&config, n_servers)?,
            })
        })
        .collect()
}

/// A ring with servers `1..=n` joined in order.
fn build_ring(config: &RingConfig, n: usize) -> Result<Ring, SimError> {
    let mut ring = Ring::from_config(config)?;
    for i in 1..=n as u64 {
        ring.add_server(ServerId::new(i))?;
    }
    Ok(ring)
}
