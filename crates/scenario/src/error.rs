//! Error types for scenario setup and execution.

use netsim_simulation::SimError;
use netsim_types::EntityId;
use thiserror::Error;

/// Errors building or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The simulation core rejected an operation.
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A traffic pair could not be parsed.
    #[error("Invalid traffic pair '{0}': expected <source>:<destination>")]
    InvalidTrafficPair(String),

    /// A model expected an attribute the entity does not carry.
    #[error("{entity} has no '{name}' attribute")]
    MissingAttribute { entity: EntityId, name: &'static str },

    /// The scenario file is not valid TOML for [`ScenarioConfig`](crate::ScenarioConfig).
    #[error("Failed to parse scenario config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The delay histogram could not be created.
    #[error("Failed to create delay histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}
