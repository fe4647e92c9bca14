//! Routing error types

use thiserror::Error;

/// Errors raised when configuring routing
///
/// Forwarding itself never fails: a packet with nowhere to go becomes a
/// [`RouteDecision::Drop`](crate::RouteDecision::Drop), not an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    /// A probability knob is outside `[0, 1]`
    #[error("Invalid {name} probability: {value} (must be within 0.0..=1.0)")]
    InvalidProbability { name: &'static str, value: f64 },
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
