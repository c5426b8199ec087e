//! Authoritative simulation facade.
//!
//! [`SimWorld`] owns the ECS world, the timer table, and the shared catalogs,
//! and is the only place requests from the outside enter the simulation. The
//! `request_*` surface resolves the requesting actor to a stable identity,
//! applies store access control, and relays to the store/station/queue
//! operations; the operations themselves stay permission-free.
//!
//! Single-threaded by construction: one `update` call at a time, no interior
//! locking, every mutation funnels through `&mut self`.

use fabworks_logic::catalog::Catalog;
use fabworks_logic::recipe::{RecipeBook, RecipeId};
use hecs::{Entity, World};

use crate::components::{resolve_controller, Position, StableId};
use crate::queue::{self, JobId, JobQueue, JobRequest, QueueEvent};
use crate::scheduler::Scheduler;
use crate::station::{
    self, AlwaysPowered, CapabilityGate, ProductionEngine, StationConfig, StationEvent,
};
use crate::store::ResourceStore;

/// Simulation-level events surfaced to the host each update.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Station { station: Entity, event: StationEvent },
    Queue { station: Entity, event: QueueEvent },
}

/// The authoritative world: ECS state, scheduler, catalogs, capability gate.
pub struct SimWorld {
    pub world: World,
    pub scheduler: Scheduler,
    pub catalog: Catalog,
    pub recipes: RecipeBook,
    gate: Box<dyn CapabilityGate>,
    time_scale: f64,
    pending_events: Vec<SimEvent>,
}

impl SimWorld {
    pub fn new(catalog: Catalog, recipes: RecipeBook) -> Self {
        Self {
            world: World::new(),
            scheduler: Scheduler::new(),
            catalog,
            recipes,
            gate: Box::new(AlwaysPowered),
            time_scale: 1.0,
            pending_events: Vec::new(),
        }
    }

    /// Replace the capability gate (e.g. a power-aware gate).
    pub fn with_gate(mut self, gate: Box<dyn CapabilityGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Scale simulated time relative to wall dt. Zero freezes the world.
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    // ---------- Spawning ----------

    pub fn spawn_store(&mut self, store: ResourceStore, position: Position) -> Entity {
        self.world.spawn((store, position))
    }

    /// An actor with a stable controlling identity, optionally carrying a
    /// store of its own.
    pub fn spawn_actor(
        &mut self,
        id: impl Into<String>,
        position: Position,
        carried: Option<ResourceStore>,
    ) -> Entity {
        let actor = self.world.spawn((StableId(id.into()), position));
        if let Some(store) = carried {
            // insert_one only fails for a despawned entity
            let _ = self.world.insert_one(actor, store);
        }
        actor
    }

    /// A production station with an engine and an empty job queue.
    pub fn spawn_station(&mut self, config: StationConfig, position: Position) -> Entity {
        self.world
            .spawn((ProductionEngine::new(config), JobQueue::new(), position))
    }

    // ---------- Tick ----------

    /// Advance the simulation by `dt` wall seconds (scaled by the time
    /// scale): fire due timers, settle station/queue bookkeeping, pump idle
    /// stations, and return the events that occurred.
    pub fn update(&mut self, dt: f64) -> Vec<SimEvent> {
        let fired = self.scheduler.advance(dt * self.time_scale);
        let stations = self.stations();

        for handle in fired {
            for &station in &stations {
                let consumed = station::handle_timer_fired(
                    &mut self.world,
                    &mut self.scheduler,
                    &self.catalog,
                    &self.recipes,
                    self.gate.as_ref(),
                    station,
                    handle,
                );
                if consumed {
                    break;
                }
            }
        }

        for &station in &stations {
            self.settle_station(station);
            queue::refresh_etas(&mut self.world, &self.scheduler, &self.recipes, station);
        }
        std::mem::take(&mut self.pending_events)
    }

    fn stations(&self) -> Vec<Entity> {
        self.world
            .query::<&ProductionEngine>()
            .iter()
            .map(|(e, _)| e)
            .collect()
    }

    /// Drain engine events, settle the queue against them, then pump.
    fn settle_station(&mut self, station: Entity) {
        let fired = match self.world.get::<&mut ProductionEngine>(station) {
            Ok(mut engine) => engine.drain_events(),
            Err(_) => return,
        };
        for event in fired {
            queue::handle_station_event(&mut self.world, station, &event);
            self.pending_events.push(SimEvent::Station { station, event });
        }

        queue::pump(
            &mut self.world,
            &mut self.scheduler,
            &self.catalog,
            &self.recipes,
            self.gate.as_ref(),
            station,
        );

        if let Ok(mut q) = self.world.get::<&mut JobQueue>(station) {
            for event in q.drain_events() {
                self.pending_events.push(SimEvent::Queue { station, event });
            }
        }
    }

    // ---------- Request relay (store operations) ----------

    /// Resolve an actor to its stable controlling identity, if any.
    pub fn identity_of(&self, actor: Entity) -> Option<String> {
        resolve_controller(&self.world, actor)
    }

    fn authorize_modify(&self, actor: Entity, store_entity: Entity) -> bool {
        let requester = resolve_controller(&self.world, actor);
        match self.world.get::<&ResourceStore>(store_entity) {
            Ok(store) => store.can_modify(requester.as_deref()),
            Err(_) => false,
        }
    }

    /// Whether the actor may see the contents of a store.
    pub fn can_view_store(&self, actor: Entity, store_entity: Entity) -> bool {
        let requester = resolve_controller(&self.world, actor);
        match self.world.get::<&ResourceStore>(store_entity) {
            Ok(store) => store.can_view(requester.as_deref()),
            Err(_) => false,
        }
    }

    /// Move a stack between two slots of one store, on behalf of `actor`.
    pub fn request_move_stack(
        &mut self,
        actor: Entity,
        store_entity: Entity,
        from: usize,
        to: usize,
    ) -> bool {
        if !self.authorize_modify(actor, store_entity) {
            return false;
        }
        match self.world.get::<&mut ResourceStore>(store_entity) {
            Ok(mut store) => store.move_stack(&self.catalog, from, to),
            Err(_) => false,
        }
    }

    /// Split part of a stack into a free slot, on behalf of `actor`.
    pub fn request_split(
        &mut self,
        actor: Entity,
        store_entity: Entity,
        slot: usize,
        quantity: u32,
    ) -> bool {
        if !self.authorize_modify(actor, store_entity) {
            return false;
        }
        match self.world.get::<&mut ResourceStore>(store_entity) {
            Ok(mut store) => store.split(slot, quantity),
            Err(_) => false,
        }
    }

    /// Sort a store's stacks by display name, on behalf of `actor`.
    pub fn request_sort(&mut self, actor: Entity, store_entity: Entity) -> bool {
        if !self.authorize_modify(actor, store_entity) {
            return false;
        }
        match self.world.get::<&mut ResourceStore>(store_entity) {
            Ok(mut store) => {
                store.sort_by_name(&self.catalog);
                true
            }
            Err(_) => false,
        }
    }

    /// Transfer a stack between two stores, on behalf of `actor`. Requires
    /// modify rights on both sides; atomic with respect to the pair.
    pub fn request_transfer(
        &mut self,
        actor: Entity,
        from_store: Entity,
        from_slot: usize,
        to_store: Entity,
        to_slot: Option<usize>,
    ) -> bool {
        if !self.authorize_modify(actor, from_store) || !self.authorize_modify(actor, to_store) {
            return false;
        }
        if from_store == to_store {
            let Ok(mut store) = self.world.get::<&mut ResourceStore>(from_store) else {
                return false;
            };
            let to = match to_slot.or_else(|| store.find_free_slot()) {
                Some(to) => to,
                None => return false,
            };
            return store.move_stack(&self.catalog, from_slot, to);
        }

        // Two &mut stores on distinct entities: lift the source component
        // out for the duration of the transfer.
        let Ok(mut source) = self.world.remove_one::<ResourceStore>(from_store) else {
            return false;
        };
        let moved = match self.world.get::<&mut ResourceStore>(to_store) {
            Ok(mut dest) => source.transfer_to(&self.catalog, from_slot, &mut dest, to_slot),
            Err(_) => false,
        };
        let _ = self.world.insert_one(from_store, source);
        moved
    }

    // ---------- Request relay (production) ----------

    /// Start a job directly, bypassing the queue.
    pub fn request_start_job(
        &mut self,
        actor: Entity,
        station: Entity,
        recipe: &RecipeId,
        repeats: u32,
    ) -> bool {
        station::start_job(
            &mut self.world,
            &mut self.scheduler,
            &self.catalog,
            &self.recipes,
            self.gate.as_ref(),
            station,
            Some(actor),
            recipe,
            repeats,
        )
    }

    /// Queue a job; starts immediately when the station is idle.
    pub fn request_enqueue(
        &mut self,
        actor: Entity,
        station: Entity,
        recipe: &RecipeId,
        repeats: u32,
    ) -> Option<JobId> {
        let id = queue::enqueue(
            &mut self.world,
            &self.recipes,
            station,
            JobRequest {
                recipe: recipe.clone(),
                repeats,
                requester: Some(actor),
            },
        )?;
        self.settle_station(station);
        Some(id)
    }

    /// Remove a pending queue entry.
    pub fn request_dequeue(&mut self, station: Entity, id: JobId) -> bool {
        let removed = queue::remove_pending(&mut self.world, station, id);
        if removed {
            if let Ok(mut q) = self.world.get::<&mut JobQueue>(station) {
                let drained = q.drain_events();
                drop(q);
                for event in drained {
                    self.pending_events.push(SimEvent::Queue { station, event });
                }
            }
        }
        removed
    }

    /// Cancel the active job; the queue advances to the next entry.
    pub fn request_cancel_job(&mut self, station: Entity) {
        station::cancel_job(&mut self.world, &mut self.scheduler, station);
        self.settle_station(station);
    }

    pub fn request_pause_job(&mut self, station: Entity) {
        station::pause_job(&mut self.world, &mut self.scheduler, station);
    }

    pub fn request_resume_job(&mut self, station: Entity) {
        station::resume_job(&mut self.world, &mut self.scheduler, station);
    }
}
