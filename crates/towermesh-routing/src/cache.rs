//! Routing cache
//!
//! The [`RoutingCache`] memoizes "to reach X, hand the packet to neighbor V;
//! it is about N hops away" hints mined from passing traffic.
//!
//! The cache is a hint structure, never a source of truth. It is owned by a
//! single tower's control loop, so it is a plain map with no interior
//! locking. Entries are only ever replaced by strictly shorter ones; the
//! only way for a distance to grow is eviction followed by relearning.

use std::collections::HashMap;

use serde::Serialize;
use towermesh_core::TowerId;

/// A cached route hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Destination this entry leads to
    #[serde(serialize_with = "serialize_tower")]
    pub destination: TowerId,
    /// Neighbor to hand the packet to
    #[serde(serialize_with = "serialize_tower")]
    pub via: TowerId,
    /// Hop count estimate from the local tower
    pub distance: u32,
}

fn serialize_tower<S: serde::Serializer>(id: &TowerId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(id.name())
}

/// Result of [`RoutingCache::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// No entry existed for the destination
    Inserted,
    /// The new distance beat the existing one
    Improved { previous: u32 },
    /// The existing entry was at least as good and was left alone
    Kept,
}

/// Per-tower routing cache
#[derive(Debug, Clone, Default)]
pub struct RoutingCache {
    entries: HashMap<TowerId, CacheEntry>,
}

impl RoutingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Record a route if it is new or strictly shorter than the known one
    ///
    /// Ties keep the existing entry, including its via-hop.
    pub fn upsert(&mut self, destination: &TowerId, via: &TowerId, distance: u32) -> Upsert {
        match self.entries.get_mut(destination) {
            None => {
                self.entries.insert(
                    destination.clone(),
                    CacheEntry {
                        destination: destination.clone(),
                        via: via.clone(),
                        distance,
                    },
                );
                Upsert::Inserted
            }
            Some(entry) if distance < entry.distance => {
                let previous = entry.distance;
                entry.via = via.clone();
                entry.distance = distance;
                Upsert::Improved { previous }
            }
            Some(_) => Upsert::Kept,
        }
    }

    /// Look up the route to a destination
    pub fn get(&self, destination: &TowerId) -> Option<&CacheEntry> {
        self.entries.get(destination)
    }

    /// Whether a route to the destination is cached
    pub fn contains(&self, destination: &TowerId) -> bool {
        self.entries.contains_key(destination)
    }

    /// Remove the route to a destination
    pub fn evict(&mut self, destination: &TowerId) -> Option<CacheEntry> {
        self.entries.remove(destination)
    }

    /// Number of cached routes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Routes that currently go through `via`
    pub fn routes_via<'a>(&'a self, via: &'a TowerId) -> impl Iterator<Item = &'a CacheEntry> {
        self.entries.values().filter(move |entry| &entry.via == via)
    }

    /// Copy of all entries, shortest first (ties by destination)
    pub fn routes_by_distance(&self) -> Vec<CacheEntry> {
        let mut routes: Vec<_> = self.entries.values().cloned().collect();
        routes.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then_with(|| a.destination.cmp(&b.destination))
        });
        routes
    }
}
