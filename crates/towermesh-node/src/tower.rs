//! Tower actor
//!
//! A tower is a single tokio task that owns its neighbor set, its routing
//! cache and its forwarding engine. The outside world only ever holds a
//! [`TowerHandle`], which carries two channel senders:
//!
//! - an unbounded control mailbox for membership, queries and teardown
//! - a bounded packet queue, so a full tower pushes back on whoever hands it
//!   a packet
//!
//! On every pulse the tower takes at most one packet off its queue, stamps
//! itself on the trip log, asks the engine where the packet goes and applies
//! the decision.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{Instrument, debug, info, info_span, trace};

use towermesh_core::call::call;
use towermesh_core::{Packet, PacketHandle, Pulse, TowerId};
use towermesh_routing::{
    CacheEntry, DropReason, EngineStats, ForwardReason, ForwardingEngine, RouteDecision,
    RoutingCache,
};

use crate::config::TowerConfig;
use crate::error::{TowerError, TowerResult};
use crate::message::Control;

/// Cloneable reference to a running tower
#[derive(Debug, Clone)]
pub struct TowerHandle {
    id: TowerId,
    control: mpsc::UnboundedSender<Control>,
    packets: mpsc::Sender<Packet>,
}

impl TowerHandle {
    /// Identity of the tower
    pub fn id(&self) -> &TowerId {
        &self.id
    }

    /// Name of the tower
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Whether the tower has stopped accepting operations
    pub fn is_terminated(&self) -> bool {
        self.control.is_closed()
    }

    /// Add `other` to this tower's neighbor set
    ///
    /// One side of an edge only. Use [`join`](crate::join) to link both.
    pub async fn add_neighbor(&self, other: &TowerHandle) -> TowerResult<()> {
        call(&self.control, other.clone(), Control::AddNeighbor)
            .await
            .map_err(|_| TowerError::terminated(&self.id))
    }

    /// Remove `other` from this tower's neighbor set, if present
    pub async fn remove_neighbor(&self, other: &TowerId) -> TowerResult<()> {
        call(&self.control, other.clone(), Control::RemoveNeighbor)
            .await
            .map_err(|_| TowerError::terminated(&self.id))
    }

    /// Current number of neighbors
    pub async fn neighbor_count(&self) -> TowerResult<usize> {
        call(&self.control, (), Control::NumNeighbors)
            .await
            .map_err(|_| TowerError::terminated(&self.id))
    }

    /// Read-only view of the tower's neighbors, routes and counters
    pub async fn snapshot(&self) -> TowerResult<TowerSnapshot> {
        call(&self.control, (), Control::Snapshot)
            .await
            .map_err(|_| TowerError::terminated(&self.id))
    }

    /// Put a packet on this tower's queue
    ///
    /// Waits while the queue is full.
    pub async fn handle_packet(&self, packet: Packet) -> TowerResult<()> {
        self.packets
            .send(packet)
            .await
            .map_err(|_| TowerError::terminated(&self.id))
    }

    /// Create a packet for `destination` and start it at this tower
    pub async fn inject(&self, destination: impl AsRef<TowerId>) -> TowerResult<PacketHandle> {
        let (packet, handle) = Packet::new(destination.as_ref().clone());
        trace!(
            packet = %packet.id(),
            from = %self.id,
            dest = %packet.destination(),
            "Injecting packet"
        );
        self.handle_packet(packet).await?;
        Ok(handle)
    }

    /// Tear the tower down
    ///
    /// Every current neighbor is told to drop its edge before the control
    /// loop halts. Packets still queued here are dropped.
    pub async fn destroy(&self) -> TowerResult<()> {
        call(&self.control, (), Control::Destruct)
            .await
            .map_err(|_| TowerError::terminated(&self.id))
    }
}

impl AsRef<TowerId> for TowerHandle {
    fn as_ref(&self) -> &TowerId {
        &self.id
    }
}

/// Point-in-time view of a tower
#[derive(Debug, Clone, Serialize)]
pub struct TowerSnapshot {
    #[serde(serialize_with = "serialize_tower")]
    pub id: TowerId,
    /// Neighbors in id order
    #[serde(serialize_with = "serialize_towers")]
    pub neighbors: Vec<TowerId>,
    /// Cached routes, shortest first
    pub routes: Vec<CacheEntry>,
    /// Packets waiting in the queue
    pub queued_packets: usize,
    /// Forwarding engine counters
    pub stats: EngineStats,
    /// Packets dropped because the hand-off to the chosen neighbor failed
    pub handoff_failures: u64,
}

impl TowerSnapshot {
    /// Cached route to `destination`, if any
    pub fn route_to(&self, destination: &TowerId) -> Option<&CacheEntry> {
        self.routes
            .iter()
            .find(|entry| &entry.destination == destination)
    }

    /// Whether `other` is a neighbor
    pub fn has_neighbor(&self, other: &TowerId) -> bool {
        self.neighbors.contains(other)
    }
}

fn serialize_tower<S: serde::Serializer>(id: &TowerId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(id.name())
}

fn serialize_towers<S: serde::Serializer>(ids: &[TowerId], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(ids.iter().map(|id| id.name()))
}

/// The actor state behind a [`TowerHandle`]
pub struct Tower {
    id: TowerId,
    config: TowerConfig,
    neighbors: BTreeMap<TowerId, TowerHandle>,
    cache: RoutingCache,
    engine: ForwardingEngine<StdRng>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    packet_rx: mpsc::Receiver<Packet>,
    handoff_failures: u64,
}

impl Tower {
    /// Spawn a tower with the default configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(name: impl AsRef<str>) -> TowerResult<TowerHandle> {
        Self::spawn_with_config(name, TowerConfig::default())
    }

    /// Spawn a tower with the given configuration
    pub fn spawn_with_config(
        name: impl AsRef<str>,
        config: TowerConfig,
    ) -> TowerResult<TowerHandle> {
        config.validate()?;
        let id = TowerId::new(name)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ id.seq()),
            None => StdRng::from_os_rng(),
        };
        let engine = ForwardingEngine::new(config.routing_params(), rng)?;
        let pulse = Pulse::start(config.tick_interval())?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (packet_tx, packet_rx) = mpsc::channel(config.queue_capacity);

        let handle = TowerHandle {
            id: id.clone(),
            control: control_tx,
            packets: packet_tx,
        };

        let span = info_span!("tower", tower = %id.short_id());
        let tower = Self {
            id,
            config,
            neighbors: BTreeMap::new(),
            cache: RoutingCache::new(),
            engine,
            control_rx,
            packet_rx,
            handoff_failures: 0,
        };

        tokio::spawn(tower.run(pulse).instrument(span));
        Ok(handle)
    }

    /// Run the control loop until teardown
    async fn run(mut self, mut pulse: Pulse) {
        info!(
            queue_capacity = self.config.queue_capacity,
            tick_us = self.config.tick_interval_us,
            "Tower started"
        );

        loop {
            tokio::select! {
                message = self.control_rx.recv() => match message {
                    Some(Control::Destruct(call)) => {
                        self.teardown();
                        call.respond(());
                        break;
                    }
                    Some(message) => self.handle_control(message),
                    None => {
                        debug!("All handles dropped");
                        self.teardown();
                        break;
                    }
                },
                Some(_) = pulse.tick() => self.forward_one().await,
            }
        }

        pulse.cancel();
        info!(
            routed = self.engine.stats().routed,
            routes = self.cache.len(),
            "Tower terminated"
        );
    }

    fn handle_control(&mut self, message: Control) {
        trace!(kind = message.kind(), "Control message");

        match message {
            Control::AddNeighbor(call) => {
                let (other, responder) = call.into_parts();
                if other.id == self.id {
                    debug!("Ignoring link to self");
                } else if self.neighbors.insert(other.id.clone(), other.clone()).is_none() {
                    debug!(neighbor = %other.id, count = self.neighbors.len(), "Neighbor added");
                }
                responder.respond(());
            }
            Control::RemoveNeighbor(call) => {
                let (other, responder) = call.into_parts();
                self.unlink(&other);
                responder.respond(());
            }
            Control::NeighborGone(other) => self.unlink(&other),
            Control::NumNeighbors(call) => call.respond(self.neighbors.len()),
            Control::Snapshot(call) => call.respond(self.snapshot()),
            // Handled by the loop itself
            Control::Destruct(call) => call.respond(()),
        }
    }

    /// Drop an edge; cached routes through it are cleaned up lazily
    fn unlink(&mut self, other: &TowerId) {
        if self.neighbors.remove(other).is_some() {
            debug!(
                neighbor = %other,
                count = self.neighbors.len(),
                stale_routes = self.cache.routes_via(other).count(),
                "Neighbor removed"
            );
        }
    }

    fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id.clone(),
            neighbors: self.neighbors.keys().cloned().collect(),
            routes: self.cache.routes_by_distance(),
            queued_packets: self.packet_rx.len(),
            stats: self.engine.stats(),
            handoff_failures: self.handoff_failures,
        }
    }

    /// Tell every neighbor to forget this tower, then stop accepting work
    fn teardown(&mut self) {
        let neighbors = std::mem::take(&mut self.neighbors);
        for neighbor in neighbors.values() {
            // A neighbor that is itself gone has nothing to forget
            let _ = neighbor
                .control
                .send(Control::NeighborGone(self.id.clone()));
        }

        self.control_rx.close();
        self.packet_rx.close();

        let mut dropped = 0usize;
        while let Ok(packet) = self.packet_rx.try_recv() {
            packet.close();
            dropped += 1;
        }

        info!(
            notified = neighbors.len(),
            dropped_packets = dropped,
            "Tower tearing down"
        );
    }

    /// Take at most one packet off the queue and move it along
    async fn forward_one(&mut self) {
        let Ok(packet) = self.packet_rx.try_recv() else {
            return;
        };

        packet.record_hop(&self.id);
        let trip = packet.trip();
        let decision = self.engine.route(
            &mut self.cache,
            &self.id,
            packet.destination(),
            &trip,
            &self.neighbors,
        );

        match decision {
            RouteDecision::Arrived => {
                debug!(
                    packet = %packet.id(),
                    hops = trip.len().saturating_sub(1),
                    age_ms = packet.age().num_milliseconds(),
                    "Packet arrived"
                );
                packet.close();
            }
            RouteDecision::Drop { reason } => {
                debug!(
                    packet = %packet.id(),
                    dest = %packet.destination(),
                    %reason,
                    "Packet dropped"
                );
                packet.close();
            }
            RouteDecision::Forward { next, reason } => self.hand_off(packet, next, reason).await,
        }
    }

    /// Put the packet on the chosen neighbor's queue
    async fn hand_off(&mut self, packet: Packet, next: TowerId, reason: ForwardReason) {
        let Some(neighbor) = self.neighbors.get(&next) else {
            self.fail_hand_off(packet, &next, DropReason::NeighborGone);
            return;
        };
        let queue = neighbor.packets.clone();

        trace!(packet = %packet.id(), next = %next, %reason, "Forwarding");

        let result = match self.config.handoff.deadline() {
            None => queue
                .send(packet)
                .await
                .map_err(|err| (err.0, DropReason::NeighborGone)),
            Some(deadline) => {
                match queue.send_timeout(packet, deadline).await {
                    Ok(()) => Ok(()),
                    Err(SendTimeoutError::Timeout(packet)) => {
                        Err((packet, DropReason::HandoffTimedOut))
                    }
                    Err(SendTimeoutError::Closed(packet)) => {
                        Err((packet, DropReason::NeighborGone))
                    }
                }
            }
        };

        if let Err((packet, reason)) = result {
            self.fail_hand_off(packet, &next, reason);
        }
    }

    fn fail_hand_off(&mut self, packet: Packet, next: &TowerId, reason: DropReason) {
        self.handoff_failures += 1;
        debug!(
            packet = %packet.id(),
            next = %next,
            %reason,
            "Hand-off failed, dropping packet"
        );
        packet.close();

        // A closed queue means the neighbor is gone for good
        if reason == DropReason::NeighborGone {
            self.unlink(next);
        }
    }
}
