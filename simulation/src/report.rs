//! Serializable scenario results
//!
//! Every report prints as a short human summary through `Display` and as
//! JSON through serde.

use std::fmt;

use serde::Serialize;

use towermesh_node::{Delivery, Outcome};

/// One packet's journey
#[derive(Debug, Clone, Serialize)]
pub struct JourneyRecord {
    pub from: String,
    pub to: String,
    pub outcome: Outcome,
    /// Hand-offs between towers
    pub hops: usize,
    /// Names of the towers visited, in order
    pub trip: Vec<String>,
    pub elapsed_ms: i64,
}

impl JourneyRecord {
    pub fn new(from: &str, delivery: &Delivery) -> Self {
        Self {
            from: from.to_string(),
            to: delivery.destination.name().to_string(),
            outcome: delivery.outcome,
            hops: delivery.hop_count(),
            trip: delivery
                .trip
                .iter()
                .map(|tower| tower.name().to_string())
                .collect(),
            elapsed_ms: delivery.elapsed.num_milliseconds(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.outcome == Outcome::Delivered
    }
}

impl fmt::Display for JourneyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} after {} hops in {} ms [{}]",
            self.from,
            self.to,
            self.outcome,
            self.hops,
            self.elapsed_ms,
            self.trip.join(" ")
        )
    }
}

/// A single route annealing trial
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    pub trial: usize,
    pub from: String,
    pub to: String,
    /// Shortest possible hop count in the topology
    pub shortest: Option<usize>,
    /// Hops taken by the first delivered packet
    pub first_hops: Option<usize>,
    /// Hops taken by the last delivered packet
    pub last_hops: Option<usize>,
    /// Mean hops over the first quarter of delivered packets
    pub early_mean: f64,
    /// Mean hops over the last quarter of delivered packets
    pub late_mean: f64,
    pub delivered: usize,
    pub dropped: usize,
    /// Whether the last trip was no longer than the first
    pub annealed: bool,
}

/// Results of a set of annealing trials
#[derive(Debug, Clone, Serialize)]
pub struct AnnealReport {
    pub towers: usize,
    pub packets_per_trial: usize,
    pub trials: Vec<TrialReport>,
    pub passed: usize,
    pub pass_rate: f64,
    /// At least 80% of trials annealed
    pub success: bool,
}

impl fmt::Display for AnnealReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Route annealing: {} towers, {} packets per trial ===",
            self.towers, self.packets_per_trial
        )?;
        for trial in &self.trials {
            writeln!(
                f,
                "  trial {}: {} -> {} shortest {} | first {} last {} | early {:.1} late {:.1} | {} delivered {} dropped{}",
                trial.trial,
                trial.from,
                trial.to,
                show(trial.shortest),
                show(trial.first_hops),
                show(trial.last_hops),
                trial.early_mean,
                trial.late_mean,
                trial.delivered,
                trial.dropped,
                if trial.annealed { "" } else { "  (did not anneal)" }
            )?;
        }
        write!(
            f,
            "  {} of {} trials annealed ({:.0}%): {}",
            self.passed,
            self.trials.len(),
            self.pass_rate * 100.0,
            if self.success { "PASS" } else { "FAIL" }
        )
    }
}

/// Results of many concurrent packets over one topology
#[derive(Debug, Clone, Serialize)]
pub struct FloodReport {
    pub towers: usize,
    pub edges: usize,
    pub packets: usize,
    pub delivered: usize,
    pub dropped: usize,
    /// Packets that did not terminate before the deadline
    pub lost: usize,
    pub mean_hops: f64,
    pub max_hops: usize,
    /// Most visited towers, busiest first
    pub busiest: Vec<(String, usize)>,
}

impl fmt::Display for FloodReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Flood: {} packets over {} towers / {} edges ===",
            self.packets, self.towers, self.edges
        )?;
        writeln!(
            f,
            "  delivered {} dropped {} lost {}",
            self.delivered, self.dropped, self.lost
        )?;
        writeln!(
            f,
            "  hops: mean {:.2} max {}",
            self.mean_hops, self.max_hops
        )?;
        write!(f, "  busiest:")?;
        for (tower, visits) in &self.busiest {
            write!(f, " {tower}={visits}")?;
        }
        Ok(())
    }
}

/// A packet down a chain and one back
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub length: usize,
    pub outbound: JourneyRecord,
    pub inbound: JourneyRecord,
    /// Routes learned by all towers together
    pub routes_learned: u64,
    /// Forwards that used a cached route
    pub cached_forwards: u64,
}

impl fmt::Display for ChainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Chain of {} towers ===", self.length)?;
        writeln!(f, "  out:  {}", self.outbound)?;
        writeln!(f, "  back: {}", self.inbound)?;
        write!(
            f,
            "  routes learned {} | cached forwards {}",
            self.routes_learned, self.cached_forwards
        )
    }
}

fn show(value: Option<usize>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
