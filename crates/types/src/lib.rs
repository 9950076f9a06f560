//! Core value types for netsim.
//!
//! Virtual time, entity identifiers and typed attribute values shared by the
//! simulation core and the scenario models built on it.

mod attribute;
mod identifiers;
mod time;

pub use attribute::{AttributeValue, Attributes, Vector};
pub use identifiers::{EntityId, EntityKind};
pub use time::{SimDuration, SimTime};
