//! # Towermesh Node
//!
//! Tower actors for Towermesh.
//!
//! Each tower is an independently scheduled task that owns its neighbor set,
//! routing cache and bounded packet queue. Towers only talk through channels:
//! membership changes and queries go through a control mailbox and are
//! answered through a one-shot reply, packets go through the bounded queue.
//! There is no central registry; the topology is whatever the symmetric
//! neighbor sets say it is.
//!
//! ## Example
//!
//! ```rust,ignore
//! use towermesh_node::{Tower, join};
//!
//! let a = Tower::spawn("a")?;
//! let b = Tower::spawn("b")?;
//! let c = Tower::spawn("c")?;
//! join(&a, &b).await?;
//! join(&b, &c).await?;
//!
//! // Watch the packet hop from a to c
//! let mut packet = a.inject(&c).await?;
//! while let Some(tower) = packet.next_hop().await {
//!     println!("at {}", tower);
//! }
//!
//! c.destroy().await?;
//! ```

mod config;
mod error;
mod message;
mod mode;
mod tower;

pub use config::{DEFAULT_QUEUE_CAPACITY, HandoffPolicy, TowerConfig};
pub use error::{TowerError, TowerResult};
pub use mode::{
    DEFAULT_TICK_INTERVAL, TEST_TICK_INTERVAL, default_tick_interval, is_test_mode, set_test_mode,
};
pub use tower::{Tower, TowerHandle, TowerSnapshot};

// Re-exported so callers only need this crate for the common case
pub use towermesh_core::{Delivery, Outcome, PacketHandle, PacketId, TowerId};
pub use towermesh_routing::{CacheEntry, EngineStats};

use tracing::debug;

/// Link two towers
///
/// Both sides add each other independently; the returned future completes
/// once both have. Joining an existing edge is a no-op.
///
/// If either side has been torn down the join fails, and the side that did
/// add the edge drops it again, so no tower is left holding a dead neighbor.
pub async fn join(a: &TowerHandle, b: &TowerHandle) -> TowerResult<()> {
    if a.id() == b.id() {
        return Err(TowerError::SelfLink {
            tower: a.id().short_id(),
        });
    }
    match tokio::join!(a.add_neighbor(b), b.add_neighbor(a)) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(err)) => {
            undo_half_join(a, b).await;
            Err(err)
        }
        (Err(err), Ok(())) => {
            undo_half_join(b, a).await;
            Err(err)
        }
        (Err(err), Err(_)) => Err(err),
    }
}

/// `live` added `dead`, but `dead` never added `live` back
async fn undo_half_join(live: &TowerHandle, dead: &TowerHandle) {
    debug!(tower = %live.id(), gone = %dead.id(), "Join failed, dropping half edge");
    // Terminated here means both sides are gone and there is nothing to undo
    let _ = live.remove_neighbor(dead.id()).await;
}

/// Unlink two towers
///
/// Removing an edge that does not exist is a no-op. Cached routes through
/// the removed edge are left in place and evicted when next used.
pub async fn disjoin(a: &TowerHandle, b: &TowerHandle) -> TowerResult<()> {
    if a.id() == b.id() {
        return Err(TowerError::SelfLink {
            tower: a.id().short_id(),
        });
    }
    tokio::try_join!(a.remove_neighbor(b.id()), b.remove_neighbor(a.id()))?;
    Ok(())
}
