//! Production recipes: named inputs, outputs, duration, and power need.
//!
//! Recipes are plain data. Inputs and outputs are ordinary sequences of
//! `(resource, quantity)` pairs; the catalog resolves ids to definitions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ResourceId;

/// Opaque identifier for a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeId(String);

impl RecipeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One named resource requirement or yield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: ResourceId,
    pub quantity: u32,
}

impl ResourceAmount {
    pub fn new(resource: impl Into<ResourceId>, quantity: u32) -> Self {
        Self {
            resource: resource.into(),
            quantity,
        }
    }
}

/// A production recipe: what one repeat consumes and produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    /// Consumed per repeat.
    pub inputs: Vec<ResourceAmount>,
    /// Produced per repeat.
    pub outputs: Vec<ResourceAmount>,
    /// Base duration of one repeat in seconds, before station speed scaling.
    pub base_seconds: f32,
    /// Whether the station's capability gate (power/fuel) must be satisfied.
    pub requires_power: bool,
}

impl Recipe {
    pub fn new(id: impl Into<RecipeId>, base_seconds: f32) -> Self {
        Self {
            id: id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            base_seconds: base_seconds.max(0.0),
            requires_power: false,
        }
    }

    pub fn input(mut self, resource: impl Into<ResourceId>, quantity: u32) -> Self {
        self.inputs.push(ResourceAmount::new(resource, quantity));
        self
    }

    pub fn output(mut self, resource: impl Into<ResourceId>, quantity: u32) -> Self {
        self.outputs.push(ResourceAmount::new(resource, quantity));
        self
    }

    pub fn powered(mut self) -> Self {
        self.requires_power = true;
        self
    }

    /// A recipe is well-formed when every input and output names a resource
    /// with a positive quantity.
    pub fn is_well_formed(&self) -> bool {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .all(|a| a.quantity > 0 && !a.resource.as_str().is_empty())
    }
}

/// Lookup table of recipes, built at world start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeBook {
    recipes: HashMap<RecipeId, Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.id.clone(), recipe);
    }

    pub fn get(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
