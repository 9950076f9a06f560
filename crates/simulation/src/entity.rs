//! Entity registry.
//!
//! The registry owns every simulated object. Callers only ever hold
//! [`EntityId`]s, so growing the backing storage never invalidates a handle.

use crate::SimError;
use netsim_types::{AttributeValue, Attributes, EntityId, EntityKind};

/// A simulated object with persistent identity and named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    attributes: Attributes,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Look up a single attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Registry of all entities in a simulation.
///
/// Ids are dense indices handed out in creation order and never reused;
/// there is no deletion.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity and return its id.
    pub fn create(&mut self, kind: EntityKind, attributes: Attributes) -> EntityId {
        let id = EntityId(self.entities.len() as u64);
        self.entities.push(Entity {
            id,
            kind,
            attributes,
        });
        id
    }

    /// Get an entity.
    pub fn get(&self, id: EntityId) -> Result<&Entity, SimError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.entities.get(index))
            .ok_or(SimError::UnknownEntity(id))
    }

    /// Get a single attribute of an entity.
    ///
    /// `Ok(None)` means the entity exists but has no such attribute.
    pub fn attribute(
        &self,
        id: EntityId,
        name: &str,
    ) -> Result<Option<&AttributeValue>, SimError> {
        Ok(self.get(id)?.attribute(name))
    }

    /// Set (insert or overwrite) an attribute.
    ///
    /// Overwriting keeps the attribute's original position in iteration order.
    pub fn set_attribute(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), SimError> {
        let entity = usize::try_from(id.0)
            .ok()
            .and_then(|index| self.entities.get_mut(index))
            .ok_or(SimError::UnknownEntity(id))?;
        entity.attributes.insert(name.into(), value.into());
        Ok(())
    }

    /// Check whether an id was created in this registry.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_ok()
    }

    /// Get the number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Ids of every entity of `kind`, in creation order.
    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_types::Vector;

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = EntityRegistry::new();
        let a = registry.create(EntityKind::Node, Attributes::new());
        let b = registry.create(EntityKind::Application, Attributes::new());
        let c = registry.create(EntityKind::Node, Attributes::new());

        assert!(a < b && b < c);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.ids_of_kind(EntityKind::Node), vec![a, c]);
    }

    #[test]
    fn test_set_and_get_attribute() {
        let mut registry = EntityRegistry::new();
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), "n0".into());
        let node = registry.create(EntityKind::Node, attributes);

        registry
            .set_attribute(node, "position", Vector::planar(1.0, 2.0))
            .unwrap();
        registry.set_attribute(node, "name", "renamed").unwrap();

        let entity = registry.get(node).unwrap();
        assert_eq!(entity.kind(), EntityKind::Node);
        assert_eq!(
            entity.attribute("position").and_then(AttributeValue::as_vector),
            Some(Vector::planar(1.0, 2.0))
        );
        let names: Vec<_> = entity.attributes().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["name", "position"], "Overwrite keeps order");
        assert_eq!(
            registry.attribute(node, "name").unwrap(),
            Some(&AttributeValue::from("renamed"))
        );
        assert_eq!(registry.attribute(node, "missing").unwrap(), None);
    }

    #[test]
    fn test_unknown_entity() {
        let mut registry = EntityRegistry::new();
        let ghost = EntityId(42);
        assert_eq!(registry.get(ghost).unwrap_err(), SimError::UnknownEntity(ghost));
        assert_eq!(
            registry.set_attribute(ghost, "x", 1u64).unwrap_err(),
            SimError::UnknownEntity(ghost)
        );
        assert!(!registry.contains(ghost));
    }
}
