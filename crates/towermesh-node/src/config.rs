//! Configuration for towers

use std::time::Duration;

use serde::{Deserialize, Serialize};
use towermesh_routing::{
    DEFAULT_PATHFIND_PROBABILITY, DEFAULT_STALE_EVICTION_PROBABILITY, RoutingParams,
};

use crate::error::{TowerError, TowerResult};
use crate::mode;

/// Default packet queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// What a tower does when the chosen neighbor's packet queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum HandoffPolicy {
    /// Wait until the neighbor has room
    #[default]
    Block,
    /// Wait at most `millis`, then drop the packet
    Timeout { millis: u64 },
}

impl HandoffPolicy {
    /// Bounded hand-off with the given deadline
    pub fn timeout(deadline: Duration) -> Self {
        HandoffPolicy::Timeout {
            millis: deadline.as_millis() as u64,
        }
    }

    /// The hand-off deadline, if any
    pub fn deadline(&self) -> Option<Duration> {
        match self {
            HandoffPolicy::Block => None,
            HandoffPolicy::Timeout { millis } => Some(Duration::from_millis(*millis)),
        }
    }
}

/// Configuration for a single tower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerConfig {
    /// Capacity of the inbound packet queue
    pub queue_capacity: usize,
    /// Forwarding tick interval, in microseconds
    pub tick_interval_us: u64,
    /// Chance of exploring a random neighbor instead of using the cache
    pub pathfind_probability: f64,
    /// Chance of evicting a route when a packet loops back
    pub stale_eviction_probability: f64,
    /// Behavior when a neighbor's queue is full
    #[serde(default)]
    pub handoff: HandoffPolicy,
    /// Seed for the forwarding RNG; `None` seeds from the OS
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tick_interval_us: micros(mode::default_tick_interval()),
            pathfind_probability: DEFAULT_PATHFIND_PROBABILITY,
            stale_eviction_probability: DEFAULT_STALE_EVICTION_PROBABILITY,
            handoff: HandoffPolicy::Block,
            seed: None,
        }
    }
}

impl TowerConfig {
    /// Fast, deterministic configuration for tests
    ///
    /// Ticks every millisecond, never explores, never evicts on loops and
    /// uses a fixed seed.
    pub fn testing() -> Self {
        Self {
            tick_interval_us: micros(mode::TEST_TICK_INTERVAL),
            pathfind_probability: 0.0,
            stale_eviction_probability: 0.0,
            seed: Some(0),
            ..Self::default()
        }
    }

    /// Forwarding tick interval
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us)
    }

    /// Routing parameters for the forwarding engine
    pub fn routing_params(&self) -> RoutingParams {
        RoutingParams {
            pathfind_probability: self.pathfind_probability,
            stale_eviction_probability: self.stale_eviction_probability,
        }
    }

    /// Set the packet queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the forwarding tick interval
    ///
    /// Anything below a microsecond becomes zero and fails validation.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_us = micros(interval);
        self
    }

    /// Set the exploration probability
    pub fn with_pathfind_probability(mut self, probability: f64) -> Self {
        self.pathfind_probability = probability;
        self
    }

    /// Set the loop eviction probability
    pub fn with_stale_eviction_probability(mut self, probability: f64) -> Self {
        self.stale_eviction_probability = probability;
        self
    }

    /// Set the hand-off policy
    pub fn with_handoff(mut self, handoff: HandoffPolicy) -> Self {
        self.handoff = handoff;
        self
    }

    /// Seed the forwarding RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration before a tower is spawned
    pub fn validate(&self) -> TowerResult<()> {
        if self.queue_capacity == 0 {
            return Err(TowerError::Config(
                "queue capacity must be at least 1".into(),
            ));
        }
        if self.tick_interval_us == 0 {
            return Err(TowerError::Config(
                "tick interval must be at least 1 µs".into(),
            ));
        }
        if self.handoff.deadline() == Some(Duration::ZERO) {
            return Err(TowerError::Config(
                "hand-off timeout must be at least 1 ms".into(),
            ));
        }
        self.routing_params().validate()?;
        Ok(())
    }
}

fn micros(interval: Duration) -> u64 {
    u64::try_from(interval.as_micros()).unwrap_or(u64::MAX)
}
