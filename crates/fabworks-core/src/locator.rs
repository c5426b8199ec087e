//! Finds the stores relevant to a station or requester.
//!
//! Stateless: every call performs a fresh search over the world, so a store
//! that despawned since the last call simply stops being found.
//!
//! Source ordering is deterministic: the station's own input store first,
//! then the interactor's carried store, then nearby public stores
//! nearest-first (entity id breaks distance ties). Admission outcomes are
//! therefore reproducible.

use fabworks_logic::catalog::{Catalog, ResourceId};
use hecs::{Entity, World};

use crate::components::Position;
use crate::station::StationConfig;
use crate::store::ResourceStore;
use fabworks_logic::access::AccessMode;

fn has_store(world: &World, entity: Entity) -> bool {
    world.get::<&ResourceStore>(entity).is_ok()
}

fn position_of(world: &World, entity: Entity) -> Option<Position> {
    world.get::<&Position>(entity).ok().map(|p| *p)
}

/// Public stores within `radius` of `center`, nearest first.
fn nearby_public_stores(
    world: &World,
    center: Position,
    radius: f32,
    exclude: &[Entity],
) -> Vec<Entity> {
    let radius_sq = radius * radius;
    let mut found: Vec<(f32, u64, Entity)> = Vec::new();

    for (entity, (store, pos)) in world.query::<(&ResourceStore, &Position)>().iter() {
        if exclude.contains(&entity) || store.access != AccessMode::Public {
            continue;
        }
        let dist_sq = center.loc.distance_squared(&pos.loc);
        if dist_sq > radius_sq {
            continue;
        }
        found.push((dist_sq, entity.to_bits().get(), entity));
    }

    found.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    found.into_iter().map(|(_, _, e)| e).collect()
}

/// Input sources for a station, in declared priority order.
pub fn gather_input_sources(
    world: &World,
    station: Entity,
    interactor: Option<Entity>,
    config: &StationConfig,
) -> Vec<Entity> {
    let mut sources = Vec::new();

    if let Some(input) = config.input_store {
        if has_store(world, input) {
            sources.push(input);
        }
    }

    if config.include_interactor_store {
        if let Some(actor) = interactor {
            if has_store(world, actor) && !sources.contains(&actor) {
                sources.push(actor);
            }
        }
    }

    if config.use_nearby_public {
        if let Some(center) = position_of(world, station) {
            let mut exclude = sources.clone();
            exclude.push(station);
            for entity in nearby_public_stores(world, center, config.public_search_radius, &exclude)
            {
                sources.push(entity);
            }
        }
    }

    sources
}

/// Destination store for a station's outputs: the explicit output store if
/// configured, else the nearest qualifying public store when the fallback
/// policy is enabled.
pub fn select_output_store(world: &World, station: Entity, config: &StationConfig) -> Option<Entity> {
    if let Some(output) = config.output_store {
        if has_store(world, output) {
            return Some(output);
        }
    }
    if !config.fallback_output_to_public {
        return None;
    }
    let center = position_of(world, station)?;
    nearby_public_stores(world, center, config.public_search_radius, &[station])
        .into_iter()
        .next()
}

/// Units of `resource` available across `sources`.
pub fn count_across(world: &World, sources: &[Entity], resource: &ResourceId) -> u64 {
    sources
        .iter()
        .filter_map(|&entity| world.get::<&ResourceStore>(entity).ok())
        .map(|store| store.count_of(resource))
        .sum()
}

/// Drain `quantity` units of `resource` from `sources` in priority order,
/// slots scanned in index order within each store. Returns true when the
/// full quantity was removed.
///
/// Callers pre-check availability with [`count_across`]; under single-thread
/// authority the drain then cannot under-run.
pub fn remove_across(
    world: &mut World,
    catalog: &Catalog,
    sources: &[Entity],
    resource: &ResourceId,
    quantity: u32,
) -> bool {
    let mut remaining = quantity;
    for &entity in sources {
        if remaining == 0 {
            break;
        }
        let Ok(mut store) = world.get::<&mut ResourceStore>(entity) else {
            continue;
        };
        while remaining > 0 {
            let Some(slot) = store.find_slot_with(resource) else {
                break;
            };
            let present = store.get(slot).map(|s| s.quantity).unwrap_or(0);
            let delta = present.min(remaining);
            if !store.remove_exact(catalog, slot, delta) {
                break;
            }
            remaining -= delta;
        }
    }
    remaining == 0
}
