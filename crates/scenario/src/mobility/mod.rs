//! Node placement and movement.
//!
//! A node's motion lives in three entity attributes: the last computed
//! `position`, the current `velocity`, and the `position_time` at which
//! `position` was valid. Positions in between are derived on demand by
//! [`position_at`], so a moving node costs one event per course change
//! rather than one per tick.

mod grid;
mod random_walk;

pub use grid::GridPositionAllocator;
pub use random_walk::{RandomWalk2d, Rectangle, MOBILITY_STREAM};

use crate::error::ScenarioError;
use netsim_simulation::EntityRegistry;
use netsim_types::{AttributeValue, EntityId, SimTime, Vector};

/// Attribute holding the last computed position.
pub const POSITION: &str = "position";

/// Attribute holding the current velocity in m/s.
pub const VELOCITY: &str = "velocity";

/// Attribute holding the time at which [`POSITION`] was computed.
pub const POSITION_TIME: &str = "position_time";

/// Position of `node` at `time`.
///
/// Nodes without a velocity are stationary.
pub fn position_at(
    entities: &EntityRegistry,
    node: EntityId,
    time: SimTime,
) -> Result<Vector, ScenarioError> {
    let entity = entities.get(node)?;
    let position = entity
        .attribute(POSITION)
        .and_then(AttributeValue::as_vector)
        .ok_or(ScenarioError::MissingAttribute {
            entity: node,
            name: POSITION,
        })?;
    let velocity = entity
        .attribute(VELOCITY)
        .and_then(AttributeValue::as_vector)
        .unwrap_or(Vector::ZERO);
    let since = entity
        .attribute(POSITION_TIME)
        .and_then(AttributeValue::as_time)
        .unwrap_or(SimTime::ZERO);

    let elapsed = time.duration_since(since).as_secs_f64();
    Ok(position.add(velocity.scale(elapsed)))
}

/// Current velocity of `node`.
pub fn velocity_of(entities: &EntityRegistry, node: EntityId) -> Result<Vector, ScenarioError> {
    Ok(entities
        .attribute(node, VELOCITY)?
        .and_then(AttributeValue::as_vector)
        .unwrap_or(Vector::ZERO))
}

/// Record a course change at `time`.
pub(crate) fn set_motion(
    entities: &mut EntityRegistry,
    node: EntityId,
    position: Vector,
    velocity: Vector,
    time: SimTime,
) -> Result<(), ScenarioError> {
    entities.set_attribute(node, POSITION, position)?;
    entities.set_attribute(node, VELOCITY, velocity)?;
    entities.set_attribute(node, POSITION_TIME, time)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_types::{Attributes, EntityKind};

    #[test]
    fn test_position_is_extrapolated_from_velocity() {
        let mut entities = EntityRegistry::new();
        let node = entities.create(EntityKind::Node, Attributes::new());
        set_motion(
            &mut entities,
            node,
            Vector::planar(1.0, 1.0),
            Vector::planar(2.0, -1.0),
            SimTime::from_secs(10),
        )
        .unwrap();

        assert_eq!(
            position_at(&entities, node, SimTime::from_secs(10)).unwrap(),
            Vector::planar(1.0, 1.0)
        );
        assert_eq!(
            position_at(&entities, node, SimTime::from_millis(10_500)).unwrap(),
            Vector::planar(2.0, 0.5)
        );
    }

    #[test]
    fn test_missing_position() {
        let mut entities = EntityRegistry::new();
        let node = entities.create(EntityKind::Node, Attributes::new());
        let err = position_at(&entities, node, SimTime::ZERO).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::MissingAttribute { name: POSITION, .. }
        ));
        assert_eq!(velocity_of(&entities, node).unwrap(), Vector::ZERO);
    }
}
