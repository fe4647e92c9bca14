//! Control mailbox messages
//!
//! Everything that changes a tower's state, other than packets, arrives as a
//! [`Control`] message and is handled in order by the tower's own loop.

use towermesh_core::{Call, TowerId};

use crate::tower::{TowerHandle, TowerSnapshot};

#[derive(Debug)]
pub(crate) enum Control {
    /// Add an edge to another tower
    AddNeighbor(Call<TowerHandle, ()>),
    /// Remove an edge, if present
    RemoveNeighbor(Call<TowerId, ()>),
    /// A neighbor is being destroyed; no reply
    NeighborGone(TowerId),
    /// Current neighbor count
    NumNeighbors(Call<(), usize>),
    /// Read-only view of the tower's state
    Snapshot(Call<(), TowerSnapshot>),
    /// Notify neighbors and halt
    Destruct(Call<(), ()>),
}

impl Control {
    /// Short label for logging
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Control::AddNeighbor(_) => "add_neighbor",
            Control::RemoveNeighbor(_) => "remove_neighbor",
            Control::NeighborGone(_) => "neighbor_gone",
            Control::NumNeighbors(_) => "num_neighbors",
            Control::Snapshot(_) => "snapshot",
            Control::Destruct(_) => "destruct",
        }
    }
}
