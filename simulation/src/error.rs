//! Error types for simulation runs

use thiserror::Error;
use towermesh_node::TowerError;

/// Errors raised while building topologies or running scenarios
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A scenario needs more towers than it was given
    #[error("Need at least {needed} towers, got {got}")]
    TooFewTowers { needed: usize, got: usize },

    /// An edge names a tower index that does not exist
    #[error("Edge ({a}, {b}) is out of range for {count} towers")]
    EdgeOutOfRange { a: usize, b: usize, count: usize },

    /// An edge links a tower to itself
    #[error("Edge ({0}, {0}) is a self-loop")]
    SelfLoop(usize),

    /// A packet did not terminate in time
    #[error("Packet from {from} to {to} still travelling after {millis} ms")]
    Timeout { from: String, to: String, millis: u64 },

    /// A tower operation failed
    #[error("Tower error: {0}")]
    Tower(#[from] TowerError),
}

/// Result type alias for simulation operations
pub type SimResult<T> = Result<T, SimulationError>;
