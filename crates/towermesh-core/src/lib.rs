//! # Towermesh Core
//!
//! Core types and actor plumbing for the Towermesh stack.
//!
//! This crate holds everything a tower needs that is not routing policy:
//!
//! - [`TowerId`]: Stable, process-unique tower identity
//! - [`Packet`] / [`PacketHandle`]: A unit of traffic and the originator's view of it
//! - [`TripLog`]: Append-only, shareable record of visited towers
//! - [`Call`]: Single-reply envelope that turns a mailbox send into an awaited call
//! - [`Pulse`]: Fixed-cadence signal source that runs until cancelled

pub mod call;
pub mod error;
pub mod identity;
pub mod packet;
pub mod pulse;

pub use call::{Call, Pending, Responder};
pub use error::{CallError, CoreError, CoreResult, IdentityError};
pub use identity::TowerId;
pub use packet::{Delivery, Outcome, Packet, PacketHandle, PacketId, TripLog};
pub use pulse::Pulse;
