//! # Towermesh Simulation
//!
//! Builds tower networks and drives traffic through them.
//!
//! ## Architecture
//!
//! - **Topology** (`topology.rs`): graph shapes over tower indices, and
//!   [`Network`], the live towers built from one
//! - **Scenarios** (`scenarios.rs`): chain, flood and route annealing runs
//! - **Reports** (`report.rs`): serializable results of each scenario
//!
//! ## Example
//!
//! ```rust,ignore
//! use towermesh_simulation::*;
//! use towermesh_node::TowerConfig;
//!
//! let network = Topology::ring(6).build("t", &TowerConfig::default()).await?;
//! let delivery = journey(
//!     &network.towers()[0],
//!     &network.towers()[3],
//!     DEFAULT_DEADLINE,
//! )
//! .await?;
//! assert!(delivery.is_delivered());
//! network.shutdown().await?;
//! ```

pub mod error;
pub mod report;
pub mod scenarios;
pub mod topology;

pub use error::{SimResult, SimulationError};
pub use report::{AnnealReport, ChainReport, FloodReport, JourneyRecord, TrialReport};
pub use scenarios::{
    ANNEAL_PASS_RATE, AnnealOptions, DEFAULT_DEADLINE, FloodOptions, journey, run_anneal,
    run_chain, run_flood,
};
pub use topology::{Network, Topology};
