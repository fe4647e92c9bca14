//! Forwarding engine
//!
//! The [`ForwardingEngine`] decides, for one packet at one tower, where the
//! packet goes next. It mutates the tower's [`RoutingCache`] as a side effect
//! (learning from the trip log, evicting stale entries) but never touches
//! channels: the caller applies the returned [`RouteDecision`].
//!
//! All random choices go through the engine's own RNG, so a seeded engine is
//! fully reproducible given the same inputs.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use towermesh_core::TowerId;
use tracing::{debug, trace};

use crate::cache::{RoutingCache, Upsert};
use crate::decision::{DropReason, ForwardReason, RouteDecision};
use crate::error::{RoutingError, RoutingResult};
use crate::neighborhood::Neighborhood;

/// Default chance of ignoring the cache and exploring a random neighbor
pub const DEFAULT_PATHFIND_PROBABILITY: f64 = 0.1;

/// Default chance of evicting a cache entry for a packet that looped back
pub const DEFAULT_STALE_EVICTION_PROBABILITY: f64 = 0.1;

/// Probability knobs for the forwarding engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingParams {
    /// Chance of exploring a random neighbor instead of using the cache
    pub pathfind_probability: f64,
    /// Chance of evicting the destination's entry when a packet loops back
    pub stale_eviction_probability: f64,
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            pathfind_probability: DEFAULT_PATHFIND_PROBABILITY,
            stale_eviction_probability: DEFAULT_STALE_EVICTION_PROBABILITY,
        }
    }
}

impl RoutingParams {
    /// Parameters that never take a random detour or evict on loops
    pub fn deterministic() -> Self {
        Self {
            pathfind_probability: 0.0,
            stale_eviction_probability: 0.0,
        }
    }

    /// Set the pathfinding probability
    pub fn with_pathfind_probability(mut self, probability: f64) -> Self {
        self.pathfind_probability = probability;
        self
    }

    /// Set the stale eviction probability
    pub fn with_stale_eviction_probability(mut self, probability: f64) -> Self {
        self.stale_eviction_probability = probability;
        self
    }

    /// Check that both probabilities are within `[0, 1]`
    pub fn validate(&self) -> RoutingResult<()> {
        check_probability("pathfinding", self.pathfind_probability)?;
        check_probability("stale eviction", self.stale_eviction_probability)
    }
}

fn check_probability(name: &'static str, value: f64) -> RoutingResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RoutingError::InvalidProbability { name, value })
    }
}

/// Counters kept by a [`ForwardingEngine`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Packets routed
    pub routed: u64,
    /// Packets that were addressed to the local tower
    pub arrived: u64,
    /// Forwards straight to the destination
    pub direct: u64,
    /// Forwards chosen by exploration
    pub explored: u64,
    /// Forwards through a cached via-hop
    pub cached: u64,
    /// Forwards to a random neighbor
    pub fallback: u64,
    /// Packets dropped for lack of neighbors
    pub dropped: u64,
    /// Cache upserts that inserted or improved an entry
    pub routes_learned: u64,
    /// Entries evicted because their via-hop was gone
    pub stale_evictions: u64,
    /// Entries evicted because a packet looped back
    pub loop_evictions: u64,
}

/// Per-tower forwarding decision procedure
#[derive(Debug)]
pub struct ForwardingEngine<R: Rng> {
    params: RoutingParams,
    rng: R,
    stats: EngineStats,
}

impl<R: Rng> ForwardingEngine<R> {
    /// Create an engine with the given parameters and RNG
    pub fn new(params: RoutingParams, rng: R) -> RoutingResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            rng,
            stats: EngineStats::default(),
        })
    }

    /// Parameters in use
    pub fn params(&self) -> &RoutingParams {
        &self.params
    }

    /// Counters so far
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Decide where a packet goes next
    ///
    /// `trip` is the packet's trip log, normally ending with `local` (the
    /// tower records itself before routing). A trip that does not end with
    /// `local` is treated as the history before it.
    pub fn route<N: Neighborhood>(
        &mut self,
        cache: &mut RoutingCache,
        local: &TowerId,
        destination: &TowerId,
        trip: &[TowerId],
        neighbors: &N,
    ) -> RouteDecision {
        self.stats.routed += 1;

        if destination == local {
            self.stats.arrived += 1;
            return RouteDecision::Arrived;
        }

        let history = match trip.split_last() {
            Some((last, earlier)) if last == local => earlier,
            _ => trip,
        };
        let last_hop = history.last();

        self.mine_trail(cache, local, destination, history, neighbors);

        if neighbors.is_neighbor(destination) {
            self.stats.direct += 1;
            trace!(dest = %destination, "Direct: destination is a neighbor");
            return RouteDecision::forward(destination.clone(), ForwardReason::Direct);
        }

        if self.rng.random_bool(self.params.pathfind_probability) {
            if let Some(next) = self.pick(neighbors, last_hop, false) {
                self.stats.explored += 1;
                trace!(dest = %destination, next = %next, "Explore: ignoring cache");
                return RouteDecision::forward(next, ForwardReason::Explore);
            }
        }

        if let Some(entry) = cache.get(destination) {
            if neighbors.is_neighbor(&entry.via) {
                self.stats.cached += 1;
                trace!(
                    dest = %destination,
                    via = %entry.via,
                    distance = entry.distance,
                    "Cached: via-hop is live"
                );
                return RouteDecision::forward(entry.via.clone(), ForwardReason::Cached);
            }

            if let Some(stale) = cache.evict(destination) {
                self.stats.stale_evictions += 1;
                debug!(
                    dest = %destination,
                    via = %stale.via,
                    distance = stale.distance,
                    "Evicted stale route: via-hop is no longer a neighbor"
                );
            }
        }

        match self.pick(neighbors, last_hop, true) {
            Some(next) => {
                self.stats.fallback += 1;
                trace!(dest = %destination, next = %next, "Fallback: random neighbor");
                RouteDecision::forward(next, ForwardReason::Fallback)
            }
            None => {
                self.stats.dropped += 1;
                debug!(dest = %destination, "No route: tower has no neighbors");
                RouteDecision::drop(DropReason::NoRoute)
            }
        }
    }

    /// Learn routes back to every non-neighbor tower in the history
    ///
    /// The distance to `history[i]` is the number of hops from there to the
    /// local tower; the via-hop is the tower that handed the packet over.
    fn mine_trail<N: Neighborhood>(
        &mut self,
        cache: &mut RoutingCache,
        local: &TowerId,
        destination: &TowerId,
        history: &[TowerId],
        neighbors: &N,
    ) {
        let Some(via) = history.last() else {
            return;
        };

        if neighbors.is_neighbor(via) {
            let here = history.len();
            for (i, tower) in history.iter().enumerate() {
                if tower == local || neighbors.is_neighbor(tower) {
                    continue;
                }
                let distance = (here - i) as u32;
                match cache.upsert(tower, via, distance) {
                    Upsert::Inserted | Upsert::Improved { .. } => {
                        self.stats.routes_learned += 1;
                        trace!(to = %tower, via = %via, distance, "Learned route");
                    }
                    Upsert::Kept => {}
                }
            }
        }

        // The packet came back here, so the route we hold for its
        // destination did not get it there
        if history.contains(local)
            && cache.contains(destination)
            && self.rng.random_bool(self.params.stale_eviction_probability)
        {
            cache.evict(destination);
            self.stats.loop_evictions += 1;
            debug!(dest = %destination, "Evicted route after packet looped back");
        }
    }

    /// Pick a uniformly random neighbor other than `exclude`
    ///
    /// With `allow_excluded`, falls back to `exclude` itself when it is the
    /// only neighbor.
    fn pick<N: Neighborhood>(
        &mut self,
        neighbors: &N,
        exclude: Option<&TowerId>,
        allow_excluded: bool,
    ) -> Option<TowerId> {
        let ids = neighbors.neighbor_ids();
        let candidates: Vec<&TowerId> = ids.iter().filter(|id| Some(*id) != exclude).collect();

        if let Some(next) = candidates.choose(&mut self.rng) {
            return Some((*next).clone());
        }
        if allow_excluded {
            return ids.choose(&mut self.rng).cloned();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn make_id(name: &str) -> TowerId {
        TowerId::new(name).unwrap()
    }

    fn engine(params: RoutingParams) -> ForwardingEngine<StdRng> {
        ForwardingEngine::new(params, StdRng::seed_from_u64(42)).unwrap()
    }

    fn set(ids: &[&TowerId]) -> BTreeSet<TowerId> {
        ids.iter().map(|id| (*id).clone()).collect()
    }

    #[test]
    fn test_arrival() {
        let mut engine = engine(RoutingParams::default());
        let mut cache = RoutingCache::new();
        let a = make_id("a");

        let decision = engine.route(&mut cache, &a, &a, &[a.clone()], &BTreeSet::new());
        assert_eq!(decision, RouteDecision::Arrived);
        assert_eq!(engine.stats().arrived, 1);
    }

    #[test]
    fn test_trail_mining_learns_non_neighbors() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (a, b, c, d, z) = (
            make_id("a"),
            make_id("b"),
            make_id("c"),
            make_id("d"),
            make_id("z"),
        );
        let neighbors = set(&[&b, &d]);

        engine.route(&mut cache, &c, &z, &[a.clone(), b.clone(), c.clone()], &neighbors);

        let entry = cache.get(&a).unwrap();
        assert_eq!(entry.via, b);
        assert_eq!(entry.distance, 2);
        assert!(!cache.contains(&b));
        assert!(!cache.contains(&c));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_trail_mining_keeps_shortest_occurrence() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (a, b, c, x, z) = (
            make_id("a"),
            make_id("b"),
            make_id("c"),
            make_id("x"),
            make_id("z"),
        );
        let neighbors = set(&[&b]);

        // a visited twice; the later visit is closer
        let trip = [a.clone(), x.clone(), a.clone(), b.clone(), c.clone()];
        engine.route(&mut cache, &c, &z, &trip, &neighbors);

        assert_eq!(cache.get(&a).unwrap().distance, 2);
        assert_eq!(cache.get(&x).unwrap().distance, 3);
    }

    #[test]
    fn test_single_entry_trip_learns_nothing() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (a, b, z) = (make_id("a"), make_id("b"), make_id("z"));

        engine.route(&mut cache, &a, &z, &[a.clone()], &set(&[&b]));
        assert!(cache.is_empty());
        assert_eq!(engine.stats().routes_learned, 0);
    }

    #[test]
    fn test_direct_beats_cache() {
        let mut engine = engine(RoutingParams::default().with_pathfind_probability(1.0));
        let mut cache = RoutingCache::new();
        let (a, b, d) = (make_id("a"), make_id("b"), make_id("d"));
        cache.upsert(&d, &b, 1);

        let decision = engine.route(&mut cache, &a, &d, &[a.clone()], &set(&[&b, &d]));
        assert_eq!(decision, RouteDecision::forward(d, ForwardReason::Direct));
    }

    #[test]
    fn test_explore_never_returns_to_last_hop() {
        let mut engine = engine(RoutingParams::default().with_pathfind_probability(1.0));
        let mut cache = RoutingCache::new();
        let (b, c, d, e, z) = (
            make_id("b"),
            make_id("c"),
            make_id("d"),
            make_id("e"),
            make_id("z"),
        );
        let neighbors = set(&[&b, &d, &e]);

        for _ in 0..200 {
            let decision = engine.route(&mut cache, &c, &z, &[b.clone(), c.clone()], &neighbors);
            match decision {
                RouteDecision::Forward { next, reason } => {
                    assert_eq!(reason, ForwardReason::Explore);
                    assert_ne!(next, b);
                }
                other => panic!("unexpected decision {:?}", other),
            }
        }
    }

    #[test]
    fn test_explore_without_candidates_falls_through() {
        let mut engine = engine(RoutingParams::default().with_pathfind_probability(1.0));
        let mut cache = RoutingCache::new();
        let (b, c, z) = (make_id("b"), make_id("c"), make_id("z"));

        let decision = engine.route(&mut cache, &c, &z, &[b.clone(), c.clone()], &set(&[&b]));
        assert_eq!(decision, RouteDecision::forward(b, ForwardReason::Fallback));
        assert_eq!(engine.stats().explored, 0);
    }

    #[test]
    fn test_cached_shortcut() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (a, b, d, z) = (make_id("a"), make_id("b"), make_id("d"), make_id("z"));
        cache.upsert(&z, &d, 4);

        let decision = engine.route(&mut cache, &a, &z, &[a.clone()], &set(&[&b, &d]));
        assert_eq!(decision, RouteDecision::forward(d, ForwardReason::Cached));
        assert_eq!(engine.stats().cached, 1);
    }

    #[test]
    fn test_stale_entry_evicted_before_fallback() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (a, b, gone, z) = (make_id("a"), make_id("b"), make_id("gone"), make_id("z"));
        cache.upsert(&z, &gone, 2);

        let decision = engine.route(&mut cache, &a, &z, &[a.clone()], &set(&[&b]));
        assert_eq!(decision, RouteDecision::forward(b, ForwardReason::Fallback));
        assert!(!cache.contains(&z));
        assert_eq!(engine.stats().stale_evictions, 1);
    }

    #[test]
    fn test_fallback_avoids_last_hop() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (b, c, d, z) = (make_id("b"), make_id("c"), make_id("d"), make_id("z"));
        let neighbors = set(&[&b, &d]);

        for _ in 0..50 {
            let decision = engine.route(&mut cache, &c, &z, &[b.clone(), c.clone()], &neighbors);
            assert_eq!(decision, RouteDecision::forward(d.clone(), ForwardReason::Fallback));
        }
    }

    #[test]
    fn test_isolated_tower_drops() {
        let mut engine = engine(RoutingParams::default());
        let mut cache = RoutingCache::new();
        let (a, z) = (make_id("a"), make_id("z"));

        let decision = engine.route(&mut cache, &a, &z, &[a.clone()], &BTreeSet::new());
        assert_eq!(decision, RouteDecision::drop(DropReason::NoRoute));
        assert_eq!(engine.stats().dropped, 1);
    }

    #[test]
    fn test_loop_evicts_destination_entry() {
        let params = RoutingParams::deterministic().with_stale_eviction_probability(1.0);
        let mut engine = engine(params);
        let mut cache = RoutingCache::new();
        let (b, c, d, z) = (make_id("b"), make_id("c"), make_id("d"), make_id("z"));
        cache.upsert(&z, &d, 3);

        let trip = [c.clone(), b.clone(), c.clone()];
        let decision = engine.route(&mut cache, &c, &z, &trip, &set(&[&b, &d]));

        assert!(!cache.contains(&z));
        assert_eq!(engine.stats().loop_evictions, 1);
        assert_eq!(decision, RouteDecision::forward(d, ForwardReason::Fallback));
    }

    #[test]
    fn test_loop_eviction_disabled() {
        let mut engine = engine(RoutingParams::deterministic());
        let mut cache = RoutingCache::new();
        let (b, c, d, z) = (make_id("b"), make_id("c"), make_id("d"), make_id("z"));
        cache.upsert(&z, &d, 3);

        let trip = [c.clone(), b.clone(), c.clone()];
        let decision = engine.route(&mut cache, &c, &z, &trip, &set(&[&b, &d]));

        assert!(cache.contains(&z));
        assert_eq!(decision, RouteDecision::forward(d, ForwardReason::Cached));
    }

    #[test]
    fn test_seeded_engines_agree() {
        let params = RoutingParams::default().with_pathfind_probability(0.5);
        let mut first = engine(params);
        let mut second = engine(params);
        let ids: Vec<_> = (0..6).map(|i| make_id(&format!("n{i}"))).collect();
        let local = make_id("local");
        let z = make_id("z");
        let neighbors: BTreeSet<_> = ids.iter().cloned().collect();

        for i in 0..100 {
            let trip = [ids[i % ids.len()].clone(), local.clone()];
            let a = first.route(&mut RoutingCache::new(), &local, &z, &trip, &neighbors);
            let b = second.route(&mut RoutingCache::new(), &local, &z, &trip, &neighbors);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = RoutingParams::default().with_pathfind_probability(-0.1);
        assert!(ForwardingEngine::new(params, StdRng::seed_from_u64(1)).is_err());

        let params = RoutingParams::default().with_stale_eviction_probability(2.0);
        assert!(matches!(
            params.validate(),
            Err(RoutingError::InvalidProbability { name: "stale eviction", .. })
        ));
    }
}
