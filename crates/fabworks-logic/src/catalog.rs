//! Resource ids and static resource definitions.
//!
//! The catalog is the lookup collaborator that resolves an opaque resource id
//! to its static definition (weight, volume, stacking behavior). It is built
//! once at world start and passed explicitly to every component that needs
//! lookups — there is no global asset registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a resource kind (e.g. `"wood"`, `"iron_ingot"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Static definition of a resource kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Display name (used for sorting and reports).
    pub name: String,
    /// Weight of a single unit.
    pub weight: f32,
    /// Volume of a single unit.
    pub volume: f32,
    /// Whether units of this resource may share a slot.
    pub stackable: bool,
    /// Maximum units per slot when stackable.
    pub max_stack: u32,
}

impl ResourceDef {
    pub fn new(name: impl Into<String>, weight: f32, volume: f32) -> Self {
        Self {
            name: name.into(),
            weight,
            volume,
            stackable: true,
            max_stack: 100,
        }
    }

    /// Mark this resource as non-stackable (one unit per slot).
    pub fn unstackable(mut self) -> Self {
        self.stackable = false;
        self.max_stack = 1;
        self
    }

    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack.max(1);
        self
    }
}

/// Resolves resource ids to their static definitions.
///
/// Lookups are synchronous and cheap; an unknown id resolves to `None` and
/// callers treat it as weightless, volumeless, and non-stackable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    defs: HashMap<ResourceId, ResourceDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ResourceId>, def: ResourceDef) {
        self.defs.insert(id.into(), def);
    }

    pub fn resolve(&self, id: &ResourceId) -> Option<&ResourceDef> {
        self.defs.get(id)
    }

    pub fn weight_of(&self, id: &ResourceId) -> f32 {
        self.resolve(id).map(|d| d.weight).unwrap_or(0.0)
    }

    pub fn volume_of(&self, id: &ResourceId) -> f32 {
        self.resolve(id).map(|d| d.volume).unwrap_or(0.0)
    }

    pub fn is_stackable(&self, id: &ResourceId) -> bool {
        self.resolve(id).map(|d| d.stackable).unwrap_or(false)
    }

    pub fn max_stack_of(&self, id: &ResourceId) -> u32 {
        self.resolve(id).map(|d| d.max_stack).unwrap_or(1)
    }

    /// Display name for an id, falling back to the id itself.
    pub fn name_of<'a>(&'a self, id: &'a ResourceId) -> &'a str {
        self.resolve(id).map(|d| d.name.as_str()).unwrap_or(id.as_str())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
