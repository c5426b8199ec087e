//! Fabworks Core - Authoritative Production-Job Simulation
//!
//! Models production stations that consume and produce discrete, stackable
//! resources held in slotted stores, shared across multiple requesters.
//! All authority lives on one logical thread per simulated world: mutating
//! operations execute serially, non-authoritative callers go through the
//! `request_*` relay on [`engine::SimWorld`].
//!
//! # Architecture
//!
//! Entities (stores, stations, requesters) live in a `hecs` world. Components
//! are plain data; system functions query and update them. Weak references —
//! requesters, owners, controller chains — are `hecs::Entity` handles, and a
//! stale handle resolves to "gone" rather than erroring.
//!
//! # Example
//!
//! ```rust,no_run
//! use fabworks_core::prelude::*;
//! use fabworks_logic::catalog::{Catalog, ResourceDef};
//! use fabworks_logic::recipe::{Recipe, RecipeBook};
//!
//! let mut catalog = Catalog::new();
//! catalog.insert("wood", ResourceDef::new("Wood", 2.0, 1.0));
//! catalog.insert("plank", ResourceDef::new("Plank", 1.0, 1.0));
//!
//! let mut recipes = RecipeBook::new();
//! recipes.insert(Recipe::new("plank", 4.0).input("wood", 2).output("plank", 1));
//!
//! let mut sim = SimWorld::new(catalog, recipes);
//!
//! // Run the authoritative loop
//! loop {
//!     sim.update(1.0 / 60.0);
//! }
//! ```

pub mod components;
pub mod engine;
pub mod locator;
pub mod persistence;
pub mod queue;
pub mod scheduler;
pub mod station;
pub mod store;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::{Position, StableId, Vec3};
    pub use crate::engine::{SimEvent, SimWorld};
    pub use crate::queue::{JobId, JobQueue, JobRequest, JobState, QueueEvent};
    pub use crate::station::{
        AlwaysPowered, CapabilityGate, PowerSource, PoweredGate, ProductionEngine, StationConfig,
        StationEvent,
    };
    pub use crate::store::{ResourceStack, ResourceStore, StoreEvent};
}
