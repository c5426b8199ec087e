//! Versioned save/load of the simulation state.
//!
//! Entity handles are never serialized; stores and stations are written as
//! an indexed list and cross-references (a station's input/output store)
//! become indices into that list, remapped to fresh entities on load.
//!
//! What survives a save: positions, identities, store contents, power
//! state, station configuration, and the pending queue backlog. The
//! in-flight job does not: its inputs were already consumed and are lost,
//! exactly as they would be on a cancel. Restored backlog entries carry no
//! requester, so admission treats them as "requester gone".

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use fabworks_logic::recipe::RecipeId;
use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::components::{Position, StableId};
use crate::engine::SimWorld;
use crate::queue::{self, JobQueue, JobRequest};
use crate::station::{PowerSource, ProductionEngine, StationConfig};
use crate::store::ResourceStore;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(bincode::Error),
    VersionMismatch { expected: u32, found: u32 },
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "io error: {e}"),
            SaveError::Bincode(e) => write!(f, "encode/decode error: {e}"),
            SaveError::VersionMismatch { expected, found } => {
                write!(f, "save version mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bincode::Error> for SaveError {
    fn from(e: bincode::Error) -> Self {
        SaveError::Bincode(e)
    }
}

/// A queued job as it survives a save: recipe and repeats only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedJob {
    pub recipe: RecipeId,
    pub repeats: u32,
}

/// Station configuration with store references flattened to save indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedStation {
    pub input_store: Option<usize>,
    pub output_store: Option<usize>,
    pub include_interactor_store: bool,
    pub use_nearby_public: bool,
    pub public_search_radius: f32,
    pub fallback_output_to_public: bool,
    pub speed_multiplier: f32,
    pub backlog: Vec<SavedJob>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedEntity {
    pub position: Option<Position>,
    pub stable_id: Option<String>,
    pub store: Option<ResourceStore>,
    pub power: Option<PowerSource>,
    pub station: Option<SavedStation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub sim_time: f64,
    pub entities: Vec<SavedEntity>,
}

/// Capture the persistent state of a world.
pub fn snapshot(sim: &SimWorld) -> SaveData {
    let refs: Vec<hecs::EntityRef<'_>> = sim.world.iter().collect();
    let index_of: HashMap<Entity, usize> = refs
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.entity(), idx))
        .collect();

    let entities = refs
        .iter()
        .map(|entity_ref| {
            let station = entity_ref.get::<&ProductionEngine>().map(|engine| {
                let config = &engine.config;
                let backlog = entity_ref
                    .get::<&JobQueue>()
                    .map(|q| {
                        q.entries()
                            .iter()
                            .filter(|e| e.state == queue::JobState::Pending)
                            .map(|e| SavedJob {
                                recipe: e.request.recipe.clone(),
                                repeats: e.request.repeats,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                SavedStation {
                    input_store: config.input_store.and_then(|e| index_of.get(&e).copied()),
                    output_store: config.output_store.and_then(|e| index_of.get(&e).copied()),
                    include_interactor_store: config.include_interactor_store,
                    use_nearby_public: config.use_nearby_public,
                    public_search_radius: config.public_search_radius,
                    fallback_output_to_public: config.fallback_output_to_public,
                    speed_multiplier: config.speed_multiplier,
                    backlog,
                }
            });

            SavedEntity {
                position: entity_ref.get::<&Position>().map(|p| *p),
                stable_id: entity_ref.get::<&StableId>().map(|id| id.0.clone()),
                store: entity_ref.get::<&ResourceStore>().map(|s| (*s).clone()),
                power: entity_ref.get::<&PowerSource>().map(|p| *p),
                station,
            }
        })
        .collect();

    SaveData {
        version: SAVE_VERSION,
        sim_time: sim.now(),
        entities,
    }
}

/// Rebuild world state from a snapshot into a fresh [`SimWorld`] that
/// already carries the catalog and recipe book.
pub fn restore(sim: &mut SimWorld, data: &SaveData) -> Result<(), SaveError> {
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }

    // First pass: spawn everything so cross-references can be remapped.
    let spawned: Vec<Entity> = data.entities.iter().map(|_| sim.world.spawn(())).collect();

    for (saved, &entity) in data.entities.iter().zip(&spawned) {
        if let Some(position) = saved.position {
            let _ = sim.world.insert_one(entity, position);
        }
        if let Some(id) = &saved.stable_id {
            let _ = sim.world.insert_one(entity, StableId(id.clone()));
        }
        if let Some(store) = &saved.store {
            let mut store = store.clone();
            store.recompute_aggregates(&sim.catalog);
            store.drain_events();
            let _ = sim.world.insert_one(entity, store);
        }
        if let Some(power) = saved.power {
            let _ = sim.world.insert_one(entity, power);
        }
        if let Some(station) = &saved.station {
            let config = StationConfig {
                input_store: station.input_store.and_then(|i| spawned.get(i).copied()),
                output_store: station.output_store.and_then(|i| spawned.get(i).copied()),
                include_interactor_store: station.include_interactor_store,
                use_nearby_public: station.use_nearby_public,
                public_search_radius: station.public_search_radius,
                fallback_output_to_public: station.fallback_output_to_public,
                speed_multiplier: station.speed_multiplier,
            };
            let _ = sim
                .world
                .insert(entity, (ProductionEngine::new(config), JobQueue::new()));
            for job in &station.backlog {
                queue::enqueue(
                    &mut sim.world,
                    &sim.recipes,
                    entity,
                    JobRequest {
                        recipe: job.recipe.clone(),
                        repeats: job.repeats,
                        requester: None,
                    },
                );
            }
        }
    }
    Ok(())
}

pub fn save_to_file(sim: &SimWorld, path: &Path) -> Result<(), SaveError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, &snapshot(sim))?;
    Ok(())
}

pub fn load_from_file(sim: &mut SimWorld, path: &Path) -> Result<(), SaveError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let data: SaveData = bincode::deserialize_from(reader)?;
    restore(sim, &data)
}
