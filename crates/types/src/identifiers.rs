//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity identifier.
///
/// Allocated by the entity registry from a monotonically increasing counter,
/// so an id is never reused within one simulation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Get the raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// What an entity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// A simulated network node.
    Node,
    /// An application installed on a node (traffic source or sink).
    Application,
    /// A shared transmission medium.
    Channel,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Node => "Node",
            EntityKind::Application => "Application",
            EntityKind::Channel => "Channel",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ordering_follows_allocation() {
        assert!(EntityId(0) < EntityId(1));
        assert_eq!(EntityId(7).get(), 7);
        assert_eq!(EntityId(3).to_string(), "Entity(3)");
    }
}
