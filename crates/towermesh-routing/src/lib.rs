//! # Towermesh Routing
//!
//! Routing layer for Towermesh.
//!
//! Towers learn routes opportunistically: every packet carries its trip log,
//! and every tower it passes through mines that log for "I know how to get
//! back there" hints. Nothing here touches channels or tasks; a tower's
//! control loop owns one [`RoutingCache`] and one [`ForwardingEngine`] and
//! calls into them synchronously.
//!
//! ## Core Components
//!
//! - [`RoutingCache`]: Destination → (via-neighbor, distance) hints with
//!   upsert-if-better semantics and lazy eviction
//! - [`ForwardingEngine`]: The per-packet decision procedure
//! - [`Neighborhood`]: What the engine needs to know about the local edges
//!
//! ## Forwarding Algorithm
//!
//! For a packet whose trip log ends at the local tower:
//!
//! 1. **ARRIVED**: The local tower is the destination
//! 2. **MINE**: Learn cache entries from the trip log (and occasionally evict
//!    the entry for the destination if the packet looped back here)
//! 3. **DIRECT**: The destination is a neighbor
//! 4. **EXPLORE**: With a small probability, a random neighbor other than the
//!    last hop
//! 5. **CACHED**: A cached via-hop that is still a neighbor; stale entries are
//!    evicted on sight
//! 6. **FALLBACK**: A random neighbor, or **DROP** when there are none
//!
//! ## Example
//!
//! ```rust,ignore
//! use rand::{SeedableRng, rngs::StdRng};
//! use towermesh_routing::{ForwardingEngine, RouteDecision, RoutingCache, RoutingParams};
//!
//! let mut engine = ForwardingEngine::new(RoutingParams::default(), StdRng::seed_from_u64(7))?;
//! let mut cache = RoutingCache::new();
//!
//! match engine.route(&mut cache, &local, &destination, &trip, &neighbors) {
//!     RouteDecision::Arrived => { /* close the packet */ }
//!     RouteDecision::Forward { next, reason } => { /* hand off */ }
//!     RouteDecision::Drop { reason } => { /* close the packet */ }
//! }
//! ```

pub mod cache;
pub mod decision;
pub mod engine;
pub mod error;
pub mod neighborhood;

pub use cache::{CacheEntry, RoutingCache, Upsert};
pub use decision::{DropReason, ForwardReason, RouteDecision};
pub use engine::{
    DEFAULT_PATHFIND_PROBABILITY, DEFAULT_STALE_EVICTION_PROBABILITY, EngineStats,
    ForwardingEngine, RoutingParams,
};
pub use error::{RoutingError, RoutingResult};
pub use neighborhood::Neighborhood;
