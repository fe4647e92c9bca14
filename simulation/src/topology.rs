//! Tower topologies for simulation runs
//!
//! A [`Topology`] is a plain description: a tower count and a set of
//! undirected edges between tower indices. [`Topology::build`] spawns one
//! tower per index and joins every edge, producing a live [`Network`].
//!
//! - Chain: `0 - 1 - ... - n-1`
//! - Ring: a chain closed back on itself
//! - Annealing: a random tour through every tower plus random chords
//! - Custom: from an edge list

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use towermesh_node::{Tower, TowerConfig, TowerHandle, join};

use crate::error::{SimResult, SimulationError};

/// An undirected graph over tower indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    count: usize,
    edges: BTreeSet<(usize, usize)>,
}

impl Topology {
    /// Towers with no edges
    pub fn isolated(count: usize) -> Self {
        Self {
            count,
            edges: BTreeSet::new(),
        }
    }

    /// `0 - 1 - ... - count-1`
    pub fn chain(count: usize) -> Self {
        let mut topology = Self::isolated(count);
        for i in 1..count {
            topology.link(i - 1, i);
        }
        topology
    }

    /// A chain with its ends joined
    pub fn ring(count: usize) -> Self {
        let mut topology = Self::chain(count);
        if count > 2 {
            topology.link(count - 1, 0);
        }
        topology
    }

    /// A random tour through every tower, plus chords
    ///
    /// About half the towers get one extra link and about a tenth get
    /// another, so there are several routes of different length between
    /// most pairs.
    pub fn annealing<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut topology = Self::isolated(count);
        if count < 2 {
            return topology;
        }

        let mut tour: Vec<usize> = (0..count).collect();
        tour.shuffle(rng);
        topology.link_cycle(&tour);

        for share in [count / 2 + 1, count / 10 + 1] {
            let mut picks: Vec<usize> = (0..count).collect();
            picks.shuffle(rng);
            picks.truncate(share.min(count));
            topology.link_cycle(&picks);
        }
        topology
    }

    /// From an explicit edge list
    pub fn from_edges(count: usize, edges: &[(usize, usize)]) -> SimResult<Self> {
        let mut topology = Self::isolated(count);
        for &(a, b) in edges {
            if a >= count || b >= count {
                return Err(SimulationError::EdgeOutOfRange { a, b, count });
            }
            if a == b {
                return Err(SimulationError::SelfLoop(a));
            }
            topology.link(a, b);
        }
        Ok(topology)
    }

    fn link(&mut self, a: usize, b: usize) {
        if a != b {
            self.edges.insert((a.min(b), a.max(b)));
        }
    }

    fn link_cycle(&mut self, order: &[usize]) {
        if order.len() < 2 {
            return;
        }
        for (i, &a) in order.iter().enumerate() {
            self.link(a, order[(i + 1) % order.len()]);
        }
    }

    /// Number of towers
    pub fn tower_count(&self) -> usize {
        self.count
    }

    /// Edges as `(low, high)` index pairs
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges touching `tower`
    pub fn degree(&self, tower: usize) -> usize {
        self.edges
            .iter()
            .filter(|(a, b)| *a == tower || *b == tower)
            .count()
    }

    /// Whether every tower can reach every other
    pub fn is_connected(&self) -> bool {
        if self.count == 0 {
            return true;
        }
        let mut seen = vec![false; self.count];
        let mut queue = VecDeque::from([0]);
        seen[0] = true;
        while let Some(at) = queue.pop_front() {
            for (a, b) in self.edges() {
                let next = match (a == at, b == at) {
                    (true, _) => b,
                    (_, true) => a,
                    _ => continue,
                };
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Hop count of the shortest path between two towers
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<usize> {
        if from >= self.count || to >= self.count {
            return None;
        }
        let mut distance = vec![None; self.count];
        distance[from] = Some(0);
        let mut queue = VecDeque::from([from]);
        while let Some(at) = queue.pop_front() {
            let here = distance[at]?;
            if at == to {
                return Some(here);
            }
            for (a, b) in self.edges() {
                let next = match (a == at, b == at) {
                    (true, _) => b,
                    (_, true) => a,
                    _ => continue,
                };
                if distance[next].is_none() {
                    distance[next] = Some(here + 1);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Spawn the towers and join every edge
    ///
    /// Towers are named `{prefix}{index}`.
    pub async fn build(&self, prefix: &str, config: &TowerConfig) -> SimResult<Network> {
        let mut towers = Vec::with_capacity(self.count);
        for i in 0..self.count {
            towers.push(Tower::spawn_with_config(
                format!("{prefix}{i}"),
                config.clone(),
            )?);
        }
        for (a, b) in self.edges() {
            join(&towers[a], &towers[b]).await?;
            debug!(a = %towers[a].id(), b = %towers[b].id(), "Joined");
        }
        info!(
            towers = self.count,
            edges = self.edge_count(),
            "Network built"
        );
        Ok(Network { towers })
    }
}

/// Live towers built from a [`Topology`]
#[derive(Debug)]
pub struct Network {
    towers: Vec<TowerHandle>,
}

impl Network {
    /// The tower at `index`
    pub fn tower(&self, index: usize) -> Option<&TowerHandle> {
        self.towers.get(index)
    }

    /// All towers, by index
    pub fn towers(&self) -> &[TowerHandle] {
        &self.towers
    }

    /// Number of towers
    pub fn len(&self) -> usize {
        self.towers.len()
    }

    /// Whether the network has no towers
    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    /// Destroy every tower
    pub async fn shutdown(self) -> SimResult<()> {
        for tower in &self.towers {
            tower.destroy().await?;
        }
        Ok(())
    }
}
