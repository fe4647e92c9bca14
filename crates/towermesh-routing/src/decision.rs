//! Routing decisions

use derive_more::Display;
use serde::{Deserialize, Serialize};
use towermesh_core::TowerId;

/// Why a packet was sent to a particular neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ForwardReason {
    /// The destination is a direct neighbor
    #[display("direct")]
    Direct,
    /// Random exploration, ignoring the cache
    #[display("explore")]
    Explore,
    /// A live cached via-hop
    #[display("cached")]
    Cached,
    /// Random neighbor, nothing better known
    #[display("fallback")]
    Fallback,
}

/// Why a packet stopped travelling short of its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum DropReason {
    /// The tower holding the packet has no neighbors
    #[display("no route")]
    NoRoute,
    /// The chosen neighbor left between the decision and the hand-off
    #[display("neighbor gone")]
    NeighborGone,
    /// The chosen neighbor's queue stayed full past the hand-off timeout
    #[display("hand-off timed out")]
    HandoffTimedOut,
}

/// Outcome of routing one packet at one tower
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The local tower is the destination
    Arrived,

    /// Hand the packet to a neighbor
    Forward {
        /// The neighbor to hand off to
        next: TowerId,
        /// Which step of the algorithm chose it
        reason: ForwardReason,
    },

    /// Terminate the packet without delivering it
    Drop {
        /// Why the packet is dropped
        reason: DropReason,
    },
}

impl RouteDecision {
    /// Create a forward decision
    pub fn forward(next: TowerId, reason: ForwardReason) -> Self {
        Self::Forward { next, reason }
    }

    /// Create a drop decision
    pub fn drop(reason: DropReason) -> Self {
        Self::Drop { reason }
    }

    /// Check if the packet arrived
    pub fn is_arrival(&self) -> bool {
        matches!(self, Self::Arrived)
    }

    /// Check if this is a forward decision
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::Forward { .. })
    }

    /// Check if this is a drop decision
    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop { .. })
    }

    /// The chosen neighbor, for forward decisions
    pub fn next_hop(&self) -> Option<&TowerId> {
        match self {
            Self::Forward { next, .. } => Some(next),
            _ => None,
        }
    }
}
