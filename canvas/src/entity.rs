//! Entity model: the points drawn on the map and the store that holds them.
//!
//! Entities come from an external data source and are read-only here. The
//! whole list is replaced on every refresh; nothing from a previous list
//! survives a replacement. Entities whose coordinates are not finite numbers
//! are dropped at the store boundary so the renderer and hit-tester never see
//! them.

#[cfg(test)]
#[path = "entity_test.rs"]
mod entity_test;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Stable identifier of a map entity. Servers send either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for EntityId {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A point entity on the world grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Column in logical grid units, in `[0, grid_size)`.
    pub x: f64,
    /// Row in logical grid units, in `[0, grid_size)`; 0 is the top row.
    pub y: f64,
    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Everything else the data source attached, passed through to consumers.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    #[must_use]
    pub fn new(id: impl Into<EntityId>, x: f64, y: f64) -> Self {
        Self { id: id.into(), x, y, display_name: None, attributes: serde_json::Map::new() }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Logical position.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Text drawn next to the marker: the display name, else the id.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.id.to_string(),
        }
    }

    fn has_valid_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The current entity list, in the order the data source supplied it.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list. Returns how many entities were dropped for
    /// having non-finite coordinates.
    pub fn replace(&mut self, entities: Vec<Entity>) -> usize {
        let total = entities.len();
        self.entities = entities.into_iter().filter(Entity::has_valid_position).collect();
        let dropped = total - self.entities.len();
        if dropped > 0 {
            log::debug!("dropped {dropped} entities with invalid coordinates");
        }
        dropped
    }

    /// First entity with `id`, if present.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Entities in supplied order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
