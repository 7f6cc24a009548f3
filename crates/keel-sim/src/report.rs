//! Simulation result types.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use keel_ring::{HasherKind, ServerId};
use serde::Serialize;

/// How requests spread over the servers of one ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    /// Requests received per server (servers that got none are listed with 0).
    pub counts: BTreeMap<ServerId, u64>,
    /// Requests routed in total.
    pub total: u64,
    /// Mean requests per server.
    pub mean: f64,
    /// Population standard deviation of the per-server counts.
    pub std_dev: f64,
    /// Fewest requests any server received.
    pub min: u64,
    /// Most requests any server received.
    pub max: u64,
    /// `max / mean`; 1.0 is perfectly even.
    pub imbalance: f64,
}

impl LoadReport {
    /// Summarize per-server counts.
    pub fn from_counts(counts: BTreeMap<ServerId, u64>) -> Self {
        let total: u64 = counts.values().sum();
        let n = counts.len();
        let min = counts.values().copied().min().unwrap_or(0);
        let max = counts.values().copied().max().unwrap_or(0);

        let (mean, std_dev) = if n == 0 {
            (0.0, 0.0)
        } else {
            let mean = total as f64 / n as f64;
            let variance = counts
                .values()
                .map(|&c| (c as f64 - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            (mean, variance.sqrt())
        };

        let imbalance = if mean > 0.0 { max as f64 / mean } else { 0.0 };

        Self {
            counts,
            total,
            mean,
            std_dev,
            min,
            max,
            imbalance,
        }
    }

    /// Plain-text horizontal bar chart, longest bar `width` characters.
    pub fn render_bars(&self, width: usize) -> String {
        let mut out = String::new();
        for (server, &count) in &self.counts {
            let len = if self.max == 0 {
                0
            } else {
                (count as u128 * width as u128 / self.max as u128) as usize
            };
            let bar = "#".repeat(len);
            let _ = writeln!(out, "{:<12} {bar:<width$} {count}", server.to_string());
        }
        out
    }
}

/// Load at one point of a server-count sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalePoint {
    /// Number of servers on the ring.
    pub servers: usize,
    /// Average requests per server.
    pub average_load: f64,
    /// Full distribution for this point.
    pub report: LoadReport,
}

/// Outcome of replacing a failed server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryReport {
    /// Members before the failure.
    pub members_before: Vec<ServerId>,
    /// Members after the replacement joined.
    pub members_after: Vec<ServerId>,
    /// The server that failed.
    pub failed: ServerId,
    /// The server spawned in its place.
    pub replacement: ServerId,
    /// Keys compared between the two ring states.
    pub keys_checked: u64,
    /// Keys whose server changed.
    pub keys_remapped: u64,
    /// `keys_remapped / keys_checked`.
    pub remap_fraction: f64,
    /// True if every moved key either left the failed server or went to the replacement.
    pub only_affected_keys_moved: bool,
}

/// Load under one hash strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HasherComparison {
    /// The strategy used.
    pub hasher: HasherKind,
    /// Resulting distribution.
    pub report: LoadReport,
}
