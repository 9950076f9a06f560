//! Typed entity attributes.

use crate::{EntityId, SimTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named attributes of an entity.
///
/// Iteration follows insertion order, so snapshots are deterministic.
pub type Attributes = IndexMap<String, AttributeValue>;

/// A three-dimensional vector, in meters (positions) or meters per second
/// (velocities).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const ZERO: Self = Vector {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A vector in the z = 0 plane.
    pub const fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn add(self, other: Vector) -> Self {
        Vector::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(self, factor: f64) -> Self {
        Vector::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vector) -> f64 {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z).length()
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.x, self.y, self.z)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Vector(Vector),
    Time(SimTime),
    Entity(EntityId),
}

impl AttributeValue {
    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "int",
            AttributeValue::UInt(_) => "uint",
            AttributeValue::Float(_) => "float",
            AttributeValue::Text(_) => "text",
            AttributeValue::Vector(_) => "vector",
            AttributeValue::Time(_) => "time",
            AttributeValue::Entity(_) => "entity",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttributeValue::UInt(v) => Some(*v),
            AttributeValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Numeric value as a float. Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vector> {
        match self {
            AttributeValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<SimTime> {
        match self {
            AttributeValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            AttributeValue::Entity(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::UInt(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::UInt(v as u64)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<Vector> for AttributeValue {
    fn from(v: Vector) -> Self {
        AttributeValue::Vector(v)
    }
}

impl From<SimTime> for AttributeValue {
    fn from(v: SimTime) -> Self {
        AttributeValue::Time(v)
    }
}

impl From<EntityId> for AttributeValue {
    fn from(v: EntityId) -> Self {
        AttributeValue::Entity(v)
    }
}
