//! Common components and identity resolution.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

/// 3D position vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// World position of an entity (stores, stations, requesters).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub loc: Vec3,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { loc: Vec3::new(x, y, z) }
    }
}

/// Stable controlling identity (e.g. a player account id). Access control
/// compares these, never entity handles, so identity survives respawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableId(pub String);

/// Link from a body to the controller driving it.
#[derive(Debug, Clone, Copy)]
pub struct ControlledBy(pub Entity);

/// Link from a controller to the body it currently possesses.
#[derive(Debug, Clone, Copy)]
pub struct PossessedBy(pub Entity);

/// Link from an entity to the entity that owns it (e.g. a placed chest to
/// the player that placed it).
#[derive(Debug, Clone, Copy)]
pub struct OwnedBy(pub Entity);

/// Upper bound on the controller-chain walk. Chains in practice are two or
/// three links deep; the bound guards against accidental cycles.
const MAX_CHAIN_DEPTH: usize = 8;

/// Resolve an actor to its controlling identity.
///
/// Walks the fixed chain direct controller -> possessed body -> owning
/// entity, stopping at the first entity carrying a [`StableId`]. A stale or
/// missing handle resolves to `None` ("requester gone"), never an error.
pub fn resolve_controller(world: &World, actor: Entity) -> Option<String> {
    let mut current = actor;
    for _ in 0..MAX_CHAIN_DEPTH {
        if !world.contains(current) {
            return None;
        }
        if let Ok(id) = world.get::<&StableId>(current) {
            return Some(id.0.clone());
        }
        if let Ok(link) = world.get::<&ControlledBy>(current) {
            current = link.0;
            continue;
        }
        if let Ok(link) = world.get::<&PossessedBy>(current) {
            current = link.0;
            continue;
        }
        if let Ok(link) = world.get::<&OwnedBy>(current) {
            current = link.0;
            continue;
        }
        return None;
    }
    None
}
