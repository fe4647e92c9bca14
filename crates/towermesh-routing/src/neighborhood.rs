//! Local edge view for the forwarding engine

use std::collections::{BTreeMap, BTreeSet};

use towermesh_core::TowerId;

/// The local tower's current neighbor set
///
/// `neighbor_ids` must return a stable order (for instance sorted by id) so
/// that a seeded engine makes reproducible choices.
pub trait Neighborhood {
    /// Whether `id` is currently a neighbor
    fn is_neighbor(&self, id: &TowerId) -> bool;

    /// All neighbors, in a stable order
    fn neighbor_ids(&self) -> Vec<TowerId>;

    /// Number of neighbors
    fn neighbor_count(&self) -> usize {
        self.neighbor_ids().len()
    }
}

impl Neighborhood for BTreeSet<TowerId> {
    fn is_neighbor(&self, id: &TowerId) -> bool {
        self.contains(id)
    }

    fn neighbor_ids(&self) -> Vec<TowerId> {
        self.iter().cloned().collect()
    }

    fn neighbor_count(&self) -> usize {
        self.len()
    }
}

impl<V> Neighborhood for BTreeMap<TowerId, V> {
    fn is_neighbor(&self, id: &TowerId) -> bool {
        self.contains_key(id)
    }

    fn neighbor_ids(&self) -> Vec<TowerId> {
        self.keys().cloned().collect()
    }

    fn neighbor_count(&self) -> usize {
        self.len()
    }
}
