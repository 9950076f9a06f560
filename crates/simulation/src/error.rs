//! Error types for the simulation core.

use netsim_types::{EntityId, SimDuration, SimTime};
use thiserror::Error;

/// Errors reported synchronously by the scheduler, the entity registry and
/// the random stream manager.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// An event was scheduled before the current virtual time.
    #[error("Cannot schedule at {requested}: current time is {now}")]
    InvalidTime { requested: SimTime, now: SimTime },

    /// A relative delay was negative.
    #[error("Negative scheduling delay: {0}")]
    NegativeDelay(SimDuration),

    /// A relative delay pushed the timestamp past the representable range.
    #[error("Scheduling delay {delay} from {now} overflows virtual time")]
    TimeOverflow { now: SimTime, delay: SimDuration },

    /// The entity id was never created in this simulation.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// A random draw was requested over an empty or non-finite range.
    #[error("Invalid random range [{min}, {max}]")]
    ExhaustedOrInvalidRange { min: f64, max: f64 },

    /// The stream handle was not issued by this stream manager.
    #[error("Unknown random stream: {0}")]
    UnknownStream(u32),

    /// Virtual time would move backwards. Indicates a scheduler defect.
    #[error("Time regression from {from} to {to}")]
    TimeRegression { from: SimTime, to: SimTime },
}
