//! Error types for tower operations

use thiserror::Error;
use towermesh_core::{CoreError, IdentityError, TowerId};
use towermesh_routing::RoutingError;

/// Errors that can occur when operating on towers
#[derive(Debug, Error)]
pub enum TowerError {
    /// The tower has been destroyed
    #[error("Tower {tower} has terminated")]
    Terminated { tower: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tower was asked to link with itself
    #[error("Tower {tower} cannot be linked to itself")]
    SelfLink { tower: String },

    /// Invalid routing parameters
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Invalid tower name
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Core plumbing error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl TowerError {
    /// The tower behind `id` no longer accepts operations
    pub fn terminated(id: &TowerId) -> Self {
        TowerError::Terminated {
            tower: id.short_id(),
        }
    }

    /// Check if this error means the tower is gone
    pub fn is_terminated(&self) -> bool {
        matches!(self, TowerError::Terminated { .. })
    }
}

/// Result type alias for tower operations
pub type TowerResult<T> = Result<T, TowerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_names_tower() {
        let id = TowerId::new("alpha").unwrap();
        let err = TowerError::terminated(&id);
        assert!(err.is_terminated());
        assert!(format!("{}", err).contains("alpha#"));
    }

    #[test]
    fn test_conversions() {
        let err: TowerError = IdentityError::EmptyName.into();
        assert!(matches!(err, TowerError::Identity(_)));
        assert!(!err.is_terminated());

        let err: TowerError = RoutingError::InvalidProbability {
            name: "pathfinding",
            value: 3.0,
        }
        .into();
        assert!(format!("{}", err).contains("pathfinding"));
    }
}
