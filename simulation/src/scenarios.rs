//! Pre-built simulation scenarios
//!
//! - [`run_chain`]: one packet down a chain and one back, showing what the
//!   towers learned on the way
//! - [`run_anneal`]: repeated traffic between a fixed pair on a random
//!   topology, checking whether trips get shorter as caches fill
//! - [`run_flood`]: many concurrent packets between random pairs

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use tracing::{info, warn};

use towermesh_node::{Delivery, TowerConfig, TowerHandle};
use towermesh_pipeline::{demultiplex, gather, multiplex, pipe};

use crate::error::{SimResult, SimulationError};
use crate::report::{AnnealReport, ChainReport, FloodReport, JourneyRecord, TrialReport};
use crate::topology::Topology;

/// Share of annealing trials that must pass
pub const ANNEAL_PASS_RATE: f64 = 0.8;

/// How long a single packet may travel before it is given up on
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Send one packet and wait for it to terminate
pub async fn journey(
    from: &TowerHandle,
    to: &TowerHandle,
    deadline: Duration,
) -> SimResult<Delivery> {
    let trip = async {
        let packet = from.inject(to).await?;
        Ok::<_, SimulationError>(packet.wait().await)
    };
    tokio::time::timeout(deadline, trip)
        .await
        .map_err(|_| SimulationError::Timeout {
            from: from.name().to_string(),
            to: to.name().to_string(),
            millis: deadline.as_millis() as u64,
        })?
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Send one packet down a chain and one back
pub async fn run_chain(
    length: usize,
    config: &TowerConfig,
    deadline: Duration,
) -> SimResult<ChainReport> {
    if length < 2 {
        return Err(SimulationError::TooFewTowers {
            needed: 2,
            got: length,
        });
    }

    let network = Topology::chain(length).build("c", config).await?;
    let (head, tail) = (&network.towers()[0], &network.towers()[length - 1]);

    let outbound = journey(head, tail, deadline).await?;
    let inbound = journey(tail, head, deadline).await?;

    let mut routes_learned = 0;
    let mut cached_forwards = 0;
    for tower in network.towers() {
        let stats = tower.snapshot().await?.stats;
        routes_learned += stats.routes_learned;
        cached_forwards += stats.cached;
    }

    let report = ChainReport {
        length,
        outbound: JourneyRecord::new(head.name(), &outbound),
        inbound: JourneyRecord::new(tail.name(), &inbound),
        routes_learned,
        cached_forwards,
    };
    network.shutdown().await?;
    Ok(report)
}

/// Options for [`run_anneal`]
#[derive(Debug, Clone)]
pub struct AnnealOptions {
    pub towers: usize,
    /// Packets sent from start to stop in each trial
    pub packets: usize,
    pub trials: usize,
    pub seed: Option<u64>,
    pub deadline: Duration,
    pub config: TowerConfig,
}

impl Default for AnnealOptions {
    fn default() -> Self {
        Self {
            towers: 20,
            packets: 50,
            trials: 5,
            seed: None,
            deadline: DEFAULT_DEADLINE,
            config: TowerConfig::default(),
        }
    }
}

/// Run several route annealing trials
///
/// Each trial builds a fresh random topology and picks a random pair. Every
/// packet from start to stop is answered by one from stop to start: towers
/// only learn routes back toward where a packet came from, so the return
/// traffic is what teaches the way to `stop`.
pub async fn run_anneal(options: &AnnealOptions) -> SimResult<AnnealReport> {
    if options.towers < 2 {
        return Err(SimulationError::TooFewTowers {
            needed: 2,
            got: options.towers,
        });
    }

    let mut rng = rng_for(options.seed);
    let mut trials = Vec::with_capacity(options.trials);
    for trial in 0..options.trials {
        let report = anneal_trial(trial, options, &mut rng).await?;
        info!(
            trial,
            first = ?report.first_hops,
            last = ?report.last_hops,
            annealed = report.annealed,
            "Annealing trial finished"
        );
        trials.push(report);
    }

    let passed = trials.iter().filter(|t| t.annealed).count();
    let pass_rate = if trials.is_empty() {
        0.0
    } else {
        passed as f64 / trials.len() as f64
    };

    Ok(AnnealReport {
        towers: options.towers,
        packets_per_trial: options.packets,
        trials,
        passed,
        pass_rate,
        success: pass_rate >= ANNEAL_PASS_RATE,
    })
}

async fn anneal_trial(
    trial: usize,
    options: &AnnealOptions,
    rng: &mut StdRng,
) -> SimResult<TrialReport> {
    let topology = Topology::annealing(options.towers, rng);
    let network = topology
        .build(&format!("a{trial}-"), &options.config)
        .await?;

    let pair = index::sample(rng, options.towers, 2);
    let (start_index, stop_index) = (pair.index(0), pair.index(1));
    let start = &network.towers()[start_index];
    let stop = &network.towers()[stop_index];

    let mut hops = Vec::with_capacity(options.packets);
    let mut dropped = 0;
    for _ in 0..options.packets {
        let delivery = journey(start, stop, options.deadline).await?;
        if delivery.is_delivered() {
            hops.push(delivery.hop_count());
        } else {
            dropped += 1;
        }
        journey(stop, start, options.deadline).await?;
    }

    let quarter = (hops.len() / 4).max(1);
    let first_hops = hops.first().copied();
    let last_hops = hops.last().copied();
    let report = TrialReport {
        trial,
        from: start.name().to_string(),
        to: stop.name().to_string(),
        shortest: topology.shortest_path(start_index, stop_index),
        first_hops,
        last_hops,
        early_mean: mean(hops.iter().take(quarter)),
        late_mean: mean(hops.iter().rev().take(quarter)),
        delivered: hops.len(),
        dropped,
        annealed: matches!((first_hops, last_hops), (Some(first), Some(last)) if last <= first),
    };

    network.shutdown().await?;
    Ok(report)
}

fn mean<'a>(values: impl Iterator<Item = &'a usize>) -> f64 {
    let (sum, count) = values.fold((0usize, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Options for [`run_flood`]
#[derive(Debug, Clone)]
pub struct FloodOptions {
    pub towers: usize,
    pub packets: usize,
    pub seed: Option<u64>,
    pub deadline: Duration,
    /// How many of the busiest towers to report
    pub top: usize,
    pub config: TowerConfig,
}

impl Default for FloodOptions {
    fn default() -> Self {
        Self {
            towers: 20,
            packets: 100,
            seed: None,
            deadline: DEFAULT_DEADLINE,
            top: 5,
            config: TowerConfig::default(),
        }
    }
}

/// Send many packets at once between random pairs
///
/// Every packet is watched by its own task; their results are merged into
/// one pipe and split by outcome.
pub async fn run_flood(options: &FloodOptions) -> SimResult<FloodReport> {
    if options.towers < 2 {
        return Err(SimulationError::TooFewTowers {
            needed: 2,
            got: options.towers,
        });
    }

    let mut rng = rng_for(options.seed);
    let topology = Topology::annealing(options.towers, &mut rng);
    let network = topology.build("f", &options.config).await?;
    let visits: Arc<DashMap<String, usize>> = Arc::new(DashMap::new());

    let mut lanes = Vec::with_capacity(options.packets);
    for _ in 0..options.packets {
        let pair = index::sample(&mut rng, options.towers, 2);
        let from = network.towers()[pair.index(0)].clone();
        let to = network.towers()[pair.index(1)].clone();
        let visits = Arc::clone(&visits);
        let deadline = options.deadline;
        let (tx, rx) = pipe();

        tokio::spawn(async move {
            match journey(&from, &to, deadline).await {
                Ok(delivery) => {
                    for tower in &delivery.trip {
                        *visits.entry(tower.name().to_string()).or_insert(0) += 1;
                    }
                    let _ = tx.send(JourneyRecord::new(from.name(), &delivery)).await;
                }
                Err(e) => warn!(error = %e, "Packet lost"),
            }
        });
        lanes.push(rx);
    }

    let (delivered, dropped) = demultiplex(multiplex(lanes), JourneyRecord::is_delivered);
    let (delivered, dropped) = tokio::join!(gather(delivered), gather(dropped));

    let max_hops = delivered.iter().map(|r| r.hops).max().unwrap_or(0);
    let mean_hops = mean(delivered.iter().map(|r| &r.hops));

    let mut busiest: Vec<(String, usize)> = visits
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();
    busiest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    busiest.truncate(options.top);

    let report = FloodReport {
        towers: options.towers,
        edges: topology.edge_count(),
        packets: options.packets,
        delivered: delivered.len(),
        dropped: dropped.len(),
        lost: options.packets - delivered.len() - dropped.len(),
        mean_hops,
        max_hops,
        busiest,
    };
    network.shutdown().await?;
    Ok(report)
}
