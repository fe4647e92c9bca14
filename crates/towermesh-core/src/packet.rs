//! Packets, trip logs and delivery tracking
//!
//! A [`Packet`] travels from tower to tower by value. Its originator keeps
//! the matching [`PacketHandle`], which observes progress through two
//! channels that both outlive any single hop:
//!
//! - the shared [`TripLog`], snapshot at any time with [`PacketHandle::trip`]
//! - the journey stream, which yields each visited tower in order and closes
//!   exactly once, when the packet is dropped for any reason
//!
//! Closing is tied to ownership: the journey sender lives inside the packet,
//! so a packet that arrives, is dropped for lack of a route, or is lost in a
//! torn-down tower's queue closes its stream the moment it is dropped.

use std::fmt::{self, Display};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use derive_more::Display as DeriveDisplay;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::identity::TowerId;

/// Unique identifier for a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(Uuid);

impl PacketId {
    /// Generate a new random packet ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "{}", &simple[..8])
    }
}

/// Append-only record of the towers a packet has visited
///
/// Clones share the same underlying log. Appends and snapshots take a short
/// lock; nothing is ever removed or reordered.
#[derive(Debug, Clone, Default)]
pub struct TripLog {
    hops: Arc<Mutex<Vec<TowerId>>>,
}

impl TripLog {
    /// Create an empty trip log
    pub fn new() -> Self {
        Self {
            hops: Arc::new(Mutex::new(Vec::with_capacity(10))),
        }
    }

    /// Append a visit, returning the new length
    pub fn record(&self, tower: &TowerId) -> usize {
        let mut hops = self.hops.lock();
        hops.push(tower.clone());
        hops.len()
    }

    /// Copy of the log as it stands now
    pub fn snapshot(&self) -> Vec<TowerId> {
        self.hops.lock().clone()
    }

    /// Number of recorded visits
    pub fn len(&self) -> usize {
        self.hops.lock().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.hops.lock().is_empty()
    }}

/// A unit of traffic addressed to a tower
#[derive(Debug)]
pub struct Packet {
    id: PacketId,
    destination: TowerId,
    trip: TripLog,
    journey: mpsc::UnboundedSender<TowerId>,
    created_at: DateTime<Utc>,
}

impl Packet {
    /// Create a packet addressed to `destination`, along with the
    /// originator's handle for observing it
    pub fn new(destination: TowerId) -> (Self, PacketHandle) {
        let id = PacketId::generate();
        let trip = TripLog::new();
        let (journey_tx, journey_rx) = mpsc::unbounded_channel();
        let created_at = Utc::now();

        let packet = Self {
            id,
            destination: destination.clone(),
            trip: trip.clone(),
            journey: journey_tx,
            created_at,
        };
        let handle = PacketHandle {
            id,
            destination,
            trip,
            journey: journey_rx,
            seen: Vec::new(),
            created_at,
        };
        (packet, handle)
    }

    /// Packet identifier
    pub fn id(&self) -> PacketId {
        self.id
    }

    /// Final destination
    pub fn destination(&self) -> &TowerId {
        &self.destination
    }

    /// Record a visit on the trip log and report it on the journey stream
    ///
    /// The log is appended before the report goes out, so a reader woken by
    /// the report always finds the hop in the log. A departed originator is
    /// not an error; the packet keeps travelling.
    pub fn record_hop(&self, tower: &TowerId) {
        self.trip.record(tower);
        let _ = self.journey.send(tower.clone());
    }

    /// Snapshot of the trip log
    pub fn trip(&self) -> Vec<TowerId> {
        self.trip.snapshot()
    }

    /// Number of towers visited so far
    pub fn hop_count(&self) -> usize {
        self.trip.len()
    }

    /// Time since the packet was created
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.created_at
    }

    /// Terminate the packet, closing its journey stream
    pub fn close(self) {}
}

/// How a packet's journey ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DeriveDisplay)]
pub enum Outcome {
    /// The last reported tower was the destination
    #[display("delivered")]
    Delivered,
    /// The stream closed anywhere else
    #[display("dropped")]
    Dropped,
}

/// Summary of a finished journey
#[derive(Debug, Clone)]
pub struct Delivery {
    pub packet_id: PacketId,
    pub destination: TowerId,
    pub outcome: Outcome,
    /// Every tower reported, in order
    pub trip: Vec<TowerId>,
    pub elapsed: TimeDelta,
}

impl Delivery {
    /// Whether the packet reached its destination
    pub fn is_delivered(&self) -> bool {
        self.outcome == Outcome::Delivered
    }

    /// Number of hand-offs between towers
    pub fn hop_count(&self) -> usize {
        self.trip.len().saturating_sub(1)
    }

    /// Last tower the packet was seen at
    pub fn last_hop(&self) -> Option<&TowerId> {
        self.trip.last()
    }
}

/// The originator's view of a packet in flight
#[derive(Debug)]
pub struct PacketHandle {
    id: PacketId,
    destination: TowerId,
    trip: TripLog,
    journey: mpsc::UnboundedReceiver<TowerId>,
    seen: Vec<TowerId>,
    created_at: DateTime<Utc>,
}

impl PacketHandle {
    /// Packet identifier
    pub fn id(&self) -> PacketId {
        self.id
    }

    /// Final destination
    pub fn destination(&self) -> &TowerId {
        &self.destination
    }

    /// Wait for the next visited tower
    ///
    /// Returns `None` once the packet has terminated.
    pub async fn next_hop(&mut self) -> Option<TowerId> {
        let hop = self.journey.recv().await?;
        self.seen.push(hop.clone());
        Some(hop)
    }

    /// Snapshot of the shared trip log
    pub fn trip(&self) -> Vec<TowerId> {
        self.trip.snapshot()
    }

    /// Drain the journey stream until the packet terminates
    pub async fn wait(mut self) -> Delivery {
        while self.next_hop().await.is_some() {}

        let outcome = match self.seen.last() {
            Some(last) if *last == self.destination => Outcome::Delivered,
            _ => Outcome::Dropped,
        };

        Delivery {
            packet_id: self.id,
            destination: self.destination,
            outcome,
            trip: self.seen,
            elapsed: Utc::now() - self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_id(name: &str) -> TowerId {
        TowerId::new(name).unwrap()
    }

    #[test]
    fn test_trip_log_shared_between_clones() {
        let log = TripLog::new();
        let other = log.clone();
        let a = make_id("a");

        assert!(log.is_empty());
        assert_eq!(other.record(&a), 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.snapshot(), vec![a]);
    }

    #[test]
    fn test_packet_id_display_is_short() {
        let id = PacketId::generate();
        assert_eq!(format!("{}", id).len(), 8);
        assert_ne!(PacketId::generate(), id);
    }

    #[tokio::test]
    async fn test_record_hop_reports_in_order() {
        let a = make_id("a");
        let b = make_id("b");
        let (packet, mut handle) = Packet::new(b.clone());

        packet.record_hop(&a);
        packet.record_hop(&b);

        assert_eq!(handle.next_hop().await, Some(a.clone()));
        assert_eq!(handle.trip(), vec![a.clone(), b.clone()]);
        assert_eq!(handle.next_hop().await, Some(b.clone()));
        assert_eq!(packet.hop_count(), 2);
    }

    #[tokio::test]
    async fn test_wait_delivered() {
        let a = make_id("a");
        let b = make_id("b");
        let (packet, handle) = Packet::new(b.clone());

        packet.record_hop(&a);
        packet.record_hop(&b);
        packet.close();

        let delivery = handle.wait().await;
        assert!(delivery.is_delivered());
        assert_eq!(delivery.trip, vec![a, b.clone()]);
        assert_eq!(delivery.hop_count(), 1);
        assert_eq!(delivery.last_hop(), Some(&b));
    }

    #[tokio::test]
    async fn test_wait_dropped() {
        let a = make_id("a");
        let b = make_id("b");
        let (packet, handle) = Packet::new(b);

        packet.record_hop(&a);
        drop(packet);

        let delivery = handle.wait().await;
        assert_eq!(delivery.outcome, Outcome::Dropped);
        assert_eq!(delivery.trip, vec![a]);
    }

    #[tokio::test]
    async fn test_dropped_without_any_hop() {
        let (packet, handle) = Packet::new(make_id("z"));
        drop(packet);

        let delivery = handle.wait().await;
        assert_eq!(delivery.outcome, Outcome::Dropped);
        assert!(delivery.trip.is_empty());
        assert_eq!(delivery.hop_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_keeps_hops_already_read() {
        let a = make_id("a");
        let b = make_id("b");
        let (packet, mut handle) = Packet::new(b.clone());

        packet.record_hop(&a);
        assert_eq!(handle.next_hop().await, Some(a.clone()));
        packet.record_hop(&b);
        packet.close();

        let delivery = handle.wait().await;
        assert_eq!(delivery.trip, vec![a, b]);
        assert!(delivery.is_delivered());
    }

    #[test]
    fn test_next_hop_pending_while_in_flight() {
        let a = make_id("a");
        let (packet, mut handle) = Packet::new(make_id("b"));

        let mut next = tokio_test::task::spawn(handle.next_hop());
        tokio_test::assert_pending!(next.poll());

        packet.record_hop(&a);
        assert!(next.is_woken());
        let hop = tokio_test::assert_ready!(next.poll());
        assert_eq!(hop, Some(a));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Delivered.to_string(), "delivered");
        assert_eq!(Outcome::Dropped.to_string(), "dropped");
    }
}
