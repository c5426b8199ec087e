//! FIFO job queue in front of a production station.
//!
//! The queue holds requests the station has not started yet. Whenever the
//! station is idle the pump tries the head entry; an entry whose admission
//! fails is marked failed and the pump moves on, so one unsatisfiable
//! request never wedges the entries behind it.

use fabworks_logic::catalog::Catalog;
use fabworks_logic::recipe::{RecipeBook, RecipeId};
use hecs::{Entity, World};
use log::debug;

use crate::scheduler::Scheduler;
use crate::station::{self, CapabilityGate, ProductionEngine, StationEvent};

/// Queue-local job id, unique per station queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// What a requester asked the station to make.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub recipe: RecipeId,
    pub repeats: u32,
    /// Weak handle to whoever asked; a stale handle means "requester gone"
    /// and only narrows which input stores are searched.
    pub requester: Option<Entity>,
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: JobId,
    pub request: JobRequest,
    pub state: JobState,
    /// Estimated seconds until this entry finishes, from the last refresh.
    pub eta_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued(JobId),
    Started(JobId),
    Finished(JobId, JobState),
    Removed(JobId),
}

/// Job queue component, paired with a [`ProductionEngine`] on the same
/// entity.
#[derive(Debug, Default)]
pub struct JobQueue {
    next_id: u64,
    entries: Vec<QueueEntry>,
    active: Option<JobId>,
    events: Vec<QueueEvent>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn entry(&self, id: JobId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn active_id(&self) -> Option<JobId> {
        self.active
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == JobState::Pending)
            .count()
    }

    pub fn drain_events(&mut self) -> Vec<QueueEvent> {
        std::mem::take(&mut self.events)
    }

    fn push(&mut self, request: JobRequest) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        self.entries.push(QueueEntry {
            id,
            request,
            state: JobState::Pending,
            eta_seconds: None,
        });
        self.events.push(QueueEvent::Enqueued(id));
        id
    }

    fn set_state(&mut self, id: JobId, state: JobState) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.state = state;
            entry.eta_seconds = None;
        }
        if state.is_terminal() {
            self.events.push(QueueEvent::Finished(id, state));
        }
    }
}

/// Append a request. Rejected when the queue component is missing, the
/// recipe is unknown, or repeats is zero.
pub fn enqueue(
    world: &mut World,
    recipes: &RecipeBook,
    station: Entity,
    request: JobRequest,
) -> Option<JobId> {
    if request.repeats < 1 || recipes.get(&request.recipe).is_none() {
        return None;
    }
    let mut queue = world.get::<&mut JobQueue>(station).ok()?;
    Some(queue.push(request))
}

/// Remove a pending entry. Active and finished entries cannot be removed;
/// cancel the station to stop an active one.
pub fn remove_pending(world: &mut World, station: Entity, id: JobId) -> bool {
    let Ok(mut queue) = world.get::<&mut JobQueue>(station) else {
        return false;
    };
    let Some(pos) = queue
        .entries
        .iter()
        .position(|e| e.id == id && e.state == JobState::Pending)
    else {
        return false;
    };
    queue.entries.remove(pos);
    queue.events.push(QueueEvent::Removed(id));
    true
}

/// Remove every pending entry. The active job, if any, keeps running.
pub fn clear_pending(world: &mut World, station: Entity) {
    let Ok(mut queue) = world.get::<&mut JobQueue>(station) else {
        return;
    };
    let removed: Vec<JobId> = queue
        .entries
        .iter()
        .filter(|e| e.state == JobState::Pending)
        .map(|e| e.id)
        .collect();
    queue.entries.retain(|e| e.state != JobState::Pending);
    for id in removed {
        queue.events.push(QueueEvent::Removed(id));
    }
}

/// Drop finished entries, keeping pending and active history compact.
pub fn prune_finished(world: &mut World, station: Entity) {
    if let Ok(mut queue) = world.get::<&mut JobQueue>(station) {
        queue.entries.retain(|e| !e.state.is_terminal());
    }
}

/// Apply a station event to the queue's bookkeeping. Only `JobEnded`
/// matters: it settles the active entry and frees the station for the pump.
pub fn handle_station_event(world: &mut World, station: Entity, event: &StationEvent) {
    let StationEvent::JobEnded { success, .. } = event else {
        return;
    };
    let Ok(mut queue) = world.get::<&mut JobQueue>(station) else {
        return;
    };
    let Some(id) = queue.active.take() else {
        return;
    };
    let state = if *success {
        JobState::Completed
    } else {
        JobState::Failed
    };
    queue.set_state(id, state);
}

/// While the station is idle, try pending entries in order. An entry whose
/// admission fails is marked failed and skipped, so the queue heals past it.
pub fn pump(
    world: &mut World,
    scheduler: &mut Scheduler,
    catalog: &Catalog,
    recipes: &RecipeBook,
    gate: &dyn CapabilityGate,
    station: Entity,
) {
    loop {
        {
            let Ok(engine) = world.get::<&ProductionEngine>(station) else {
                return;
            };
            if engine.is_running() {
                return;
            }
        }
        let Some((id, request)) = ({
            let Ok(queue) = world.get::<&JobQueue>(station) else {
                return;
            };
            queue
                .entries
                .iter()
                .find(|e| e.state == JobState::Pending)
                .map(|e| (e.id, e.request.clone()))
        }) else {
            return;
        };

        let started = station::start_job(
            world,
            scheduler,
            catalog,
            recipes,
            gate,
            station,
            request.requester,
            &request.recipe,
            request.repeats,
        );

        let Ok(mut queue) = world.get::<&mut JobQueue>(station) else {
            return;
        };
        if started {
            queue.active = Some(id);
            if let Some(entry) = queue.entries.iter_mut().find(|e| e.id == id) {
                entry.state = JobState::Active;
            }
            queue.events.push(QueueEvent::Started(id));
            return;
        }
        debug!("queue on {station:?}: entry {id:?} unsatisfiable, skipping");
        queue.set_state(id, JobState::Failed);
        // Loop on to the next pending entry.
    }
}

/// Recompute `eta_seconds` for the active and pending entries, assuming
/// entries run back to back at the station's current speed.
pub fn refresh_etas(world: &mut World, scheduler: &Scheduler, recipes: &RecipeBook, station: Entity) {
    let (active_remaining, speed) = {
        let Ok(engine) = world.get::<&ProductionEngine>(station) else {
            return;
        };
        let mut remaining = engine.remaining_seconds(scheduler).unwrap_or(0.0);
        if let Some(job) = engine.active() {
            if let Some(recipe) = recipes.get(&job.recipe) {
                let cycle = recipe.base_seconds as f64
                    / engine.config.speed_multiplier.max(0.01) as f64;
                remaining += cycle * job.repeats_remaining as f64;
            }
        }
        (remaining, engine.config.speed_multiplier.max(0.01) as f64)
    };

    let Ok(mut queue) = world.get::<&mut JobQueue>(station) else {
        return;
    };
    let mut horizon = active_remaining;
    for entry in queue.entries.iter_mut() {
        match entry.state {
            JobState::Active => entry.eta_seconds = Some(active_remaining),
            JobState::Pending => {
                let Some(recipe) = recipes.get(&entry.request.recipe) else {
                    entry.eta_seconds = None;
                    continue;
                };
                let cycle = recipe.base_seconds as f64 / speed;
                horizon += cycle * entry.request.repeats as f64;
                entry.eta_seconds = Some(horizon);
            }
            _ => entry.eta_seconds = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Position;
    use crate::station::{AlwaysPowered, StationConfig};
    use crate::store::ResourceStore;
    use fabworks_logic::catalog::{Catalog, ResourceDef, ResourceId};
    use fabworks_logic::recipe::Recipe;

    struct Rig {
        world: World,
        scheduler: Scheduler,
        catalog: Catalog,
        recipes: RecipeBook,
        station: Entity,
        input: Entity,
        output: Entity,
    }

    fn rig() -> Rig {
        let mut catalog = Catalog::new();
        catalog.insert("wood", ResourceDef::new("Wood", 2.0, 1.0));
        catalog.insert("plank", ResourceDef::new("Plank", 1.0, 1.0));
        catalog.insert("ore", ResourceDef::new("Ore", 4.0, 2.0));
        catalog.insert("ingot", ResourceDef::new("Ingot", 3.0, 1.0));

        let mut recipes = RecipeBook::new();
        recipes.insert(Recipe::new("plank", 4.0).input("wood", 2).output("plank", 1));
        recipes.insert(Recipe::new("smelt", 6.0).input("ore", 1).output("ingot", 1));

        let mut world = World::new();
        let input = world.spawn((ResourceStore::new(8),));
        let output = world.spawn((ResourceStore::new(8),));
        let config = StationConfig {
            input_store: Some(input),
            output_store: Some(output),
            ..StationConfig::default()
        };
        let station = world.spawn((
            ProductionEngine::new(config),
            JobQueue::new(),
            Position::new(0.0, 0.0, 0.0),
        ));

        Rig {
            world,
            scheduler: Scheduler::new(),
            catalog,
            recipes,
            station,
            input,
            output,
        }
    }

    fn stock(rig: &mut Rig, resource: &str, quantity: u32) {
        rig.world
            .get::<&mut ResourceStore>(rig.input)
            .unwrap()
            .add(&rig.catalog, &ResourceId::from(resource), quantity);
    }

    fn request(recipe: &str, repeats: u32) -> JobRequest {
        JobRequest {
            recipe: RecipeId::from(recipe),
            repeats,
            requester: None,
        }
    }

    fn pump_rig(rig: &mut Rig) {
        pump(
            &mut rig.world,
            &mut rig.scheduler,
            &rig.catalog,
            &rig.recipes,
            &AlwaysPowered,
            rig.station,
        );
    }

    /// Advance time, dispatch fired station timers, settle queue bookkeeping,
    /// then pump.
    fn tick(rig: &mut Rig, dt: f64) {
        for handle in rig.scheduler.advance(dt) {
            station::handle_timer_fired(
                &mut rig.world,
                &mut rig.scheduler,
                &rig.catalog,
                &rig.recipes,
                &AlwaysPowered,
                rig.station,
                handle,
            );
        }
        let fired = rig
            .world
            .get::<&mut ProductionEngine>(rig.station)
            .unwrap()
            .drain_events();
        for event in &fired {
            handle_station_event(&mut rig.world, rig.station, event);
        }
        pump_rig(rig);
    }

    fn state_of(rig: &Rig, id: JobId) -> Option<JobState> {
        rig.world
            .get::<&JobQueue>(rig.station)
            .unwrap()
            .entry(id)
            .map(|e| e.state)
    }

    fn output_count(rig: &Rig, resource: &str) -> u64 {
        rig.world
            .get::<&ResourceStore>(rig.output)
            .unwrap()
            .count_of(&ResourceId::from(resource))
    }

    #[test]
    fn entries_run_in_fifo_order() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);
        stock(&mut rig, "ore", 1);

        let first = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        let second = enqueue(&mut rig.world, &rig.recipes, rig.station, request("smelt", 1)).unwrap();
        pump_rig(&mut rig);

        assert_eq!(state_of(&rig, first), Some(JobState::Active));
        assert_eq!(state_of(&rig, second), Some(JobState::Pending));

        tick(&mut rig, 4.1);
        assert_eq!(state_of(&rig, first), Some(JobState::Completed));
        assert_eq!(state_of(&rig, second), Some(JobState::Active));
        assert_eq!(output_count(&rig, "plank"), 1);

        tick(&mut rig, 6.1);
        assert_eq!(state_of(&rig, second), Some(JobState::Completed));
        assert_eq!(output_count(&rig, "ingot"), 1);
    }

    #[test]
    fn unsatisfiable_head_does_not_wedge_queue() {
        let mut rig = rig();
        stock(&mut rig, "ore", 1); // no wood at all

        let starved = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        let viable = enqueue(&mut rig.world, &rig.recipes, rig.station, request("smelt", 1)).unwrap();
        pump_rig(&mut rig);

        assert_eq!(state_of(&rig, starved), Some(JobState::Failed));
        assert_eq!(state_of(&rig, viable), Some(JobState::Active));

        tick(&mut rig, 6.1);
        assert_eq!(output_count(&rig, "ingot"), 1);
    }

    #[test]
    fn enqueue_rejects_unknown_recipe_and_zero_repeats() {
        let mut rig = rig();
        assert!(enqueue(&mut rig.world, &rig.recipes, rig.station, request("nonsense", 1)).is_none());
        assert!(enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 0)).is_none());
    }

    #[test]
    fn remove_pending_only_touches_pending() {
        let mut rig = rig();
        stock(&mut rig, "wood", 4);

        let active = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        let waiting = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        pump_rig(&mut rig);

        assert!(!remove_pending(&mut rig.world, rig.station, active));
        assert!(remove_pending(&mut rig.world, rig.station, waiting));
        assert!(state_of(&rig, waiting).is_none());
        assert_eq!(state_of(&rig, active), Some(JobState::Active));
    }

    #[test]
    fn clear_pending_keeps_active_running() {
        let mut rig = rig();
        stock(&mut rig, "wood", 6);

        enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        pump_rig(&mut rig);

        clear_pending(&mut rig.world, rig.station);
        {
            let queue = rig.world.get::<&JobQueue>(rig.station).unwrap();
            assert_eq!(queue.pending_count(), 0);
            assert!(queue.active_id().is_some());
        }

        tick(&mut rig, 4.1);
        assert_eq!(output_count(&rig, "plank"), 1); // only the active one ran
    }

    #[test]
    fn failed_station_job_marks_entry_failed() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);

        let id = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        pump_rig(&mut rig);
        assert_eq!(state_of(&rig, id), Some(JobState::Active));

        station::cancel_job(&mut rig.world, &mut rig.scheduler, rig.station);
        let fired = rig
            .world
            .get::<&mut ProductionEngine>(rig.station)
            .unwrap()
            .drain_events();
        for event in &fired {
            handle_station_event(&mut rig.world, rig.station, event);
        }

        assert_eq!(state_of(&rig, id), Some(JobState::Failed));
    }

    #[test]
    fn etas_accumulate_down_the_queue() {
        let mut rig = rig();
        stock(&mut rig, "wood", 8);

        let first = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        let second = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 2)).unwrap();
        pump_rig(&mut rig);
        refresh_etas(&mut rig.world, &rig.scheduler, &rig.recipes, rig.station);

        let queue = rig.world.get::<&JobQueue>(rig.station).unwrap();
        let eta_first = queue.entry(first).unwrap().eta_seconds.unwrap();
        let eta_second = queue.entry(second).unwrap().eta_seconds.unwrap();
        assert!((eta_first - 4.0).abs() < 1e-6);
        assert!((eta_second - 12.0).abs() < 1e-6); // 4s active + 2 * 4s
    }

    #[test]
    fn prune_drops_only_finished_entries() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);

        let done = enqueue(&mut rig.world, &rig.recipes, rig.station, request("plank", 1)).unwrap();
        let starved = enqueue(&mut rig.world, &rig.recipes, rig.station, request("smelt", 1)).unwrap();
        pump_rig(&mut rig);
        tick(&mut rig, 4.1);

        assert_eq!(state_of(&rig, done), Some(JobState::Completed));
        assert_eq!(state_of(&rig, starved), Some(JobState::Failed));

        prune_finished(&mut rig.world, rig.station);
        let queue = rig.world.get::<&JobQueue>(rig.station).unwrap();
        assert!(queue.entries().is_empty());
    }
}
