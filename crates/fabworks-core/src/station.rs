//! Production stations: admission, countdown, pause/resume/cancel, delivery.
//!
//! A station runs at most one active job. Admission verifies inputs across
//! the located sources, a resolvable output destination, and the capability
//! gate, then consumes one repeat's inputs atomically and arms a countdown.
//! Consumed inputs are a bet: cancellation and mid-flight failure do not
//! refund them.

use fabworks_logic::catalog::Catalog;
use fabworks_logic::recipe::{Recipe, RecipeBook, RecipeId};
use hecs::{Entity, World};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::locator::{count_across, gather_input_sources, remove_across, select_output_store};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::store::ResourceStore;

/// Where a station draws inputs from and sends outputs to.
#[derive(Debug, Clone, Copy)]
pub struct StationConfig {
    /// The station's own input buffer store.
    pub input_store: Option<Entity>,
    /// Explicit output destination.
    pub output_store: Option<Entity>,
    /// Also draw from the requester's carried store.
    pub include_interactor_store: bool,
    /// Also draw from public stores near the station.
    pub use_nearby_public: bool,
    pub public_search_radius: f32,
    /// When no explicit output store is set, deliver to the nearest public
    /// store instead of failing admission.
    pub fallback_output_to_public: bool,
    /// Throughput scaling; duration = base_seconds / speed_multiplier.
    pub speed_multiplier: f32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            input_store: None,
            output_store: None,
            include_interactor_store: false,
            use_nearby_public: false,
            public_search_radius: 15.0,
            fallback_output_to_public: false,
            speed_multiplier: 1.0,
        }
    }
}

/// The single in-flight job of a station.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    pub recipe: RecipeId,
    /// Weak requester handle; a stale handle means "requester gone".
    pub requester: Option<Entity>,
    /// Repeats still owed after the current one.
    pub repeats_remaining: u32,
    pub started_at: f64,
    pub ends_at: f64,
    pub paused: bool,
}

/// Job lifecycle events, drained by the authoritative loop.
#[derive(Debug, Clone, PartialEq)]
pub enum StationEvent {
    JobStarted { recipe: RecipeId },
    /// One repeat finished (success or gate failure).
    CycleFinished { recipe: RecipeId, success: bool },
    /// The job ended and the station is idle again. `success` is false for
    /// cancellation and mid-flight failure.
    JobEnded { recipe: RecipeId, success: bool },
}

/// External boolean precondition a job depends on (power, fuel). Polled at
/// job start and again at completion; only recipes that require power
/// consult it.
pub trait CapabilityGate {
    fn is_satisfied(&self, world: &World, station: Entity, recipe: &Recipe) -> bool;
}

/// Gate that is always satisfied — for worlds without a power model.
pub struct AlwaysPowered;

impl CapabilityGate for AlwaysPowered {
    fn is_satisfied(&self, _world: &World, _station: Entity, _recipe: &Recipe) -> bool {
        true
    }
}

/// Fuel/power state a station entity may carry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PowerSource {
    pub active: bool,
}

/// Gate satisfied when the station's [`PowerSource`] is currently active.
pub struct PoweredGate;

impl CapabilityGate for PoweredGate {
    fn is_satisfied(&self, world: &World, station: Entity, _recipe: &Recipe) -> bool {
        world
            .get::<&PowerSource>(station)
            .map(|p| p.active)
            .unwrap_or(false)
    }
}

/// Production engine component: at most one active job at a time.
#[derive(Debug)]
pub struct ProductionEngine {
    pub config: StationConfig,
    active: Option<ActiveJob>,
    timer: Option<TimerHandle>,
    paused_remaining: Option<f64>,
    events: Vec<StationEvent>,
}

impl ProductionEngine {
    pub fn new(config: StationConfig) -> Self {
        Self {
            config,
            active: None,
            timer: None,
            paused_remaining: None,
            events: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.active.as_ref().map(|j| j.paused).unwrap_or(false)
    }

    pub fn active(&self) -> Option<&ActiveJob> {
        self.active.as_ref()
    }

    /// Seconds until the current repeat completes.
    pub fn remaining_seconds(&self, scheduler: &Scheduler) -> Option<f64> {
        if let Some(remaining) = self.paused_remaining {
            return Some(remaining);
        }
        self.timer.and_then(|t| scheduler.remaining(t))
    }

    pub fn drain_events(&mut self) -> Vec<StationEvent> {
        std::mem::take(&mut self.events)
    }

    fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.timer == Some(handle)
    }

    fn clear_job(&mut self) {
        self.active = None;
        self.timer = None;
        self.paused_remaining = None;
    }
}

/// Admission snapshot: everything verified before anything is consumed.
fn admit_one_repeat(
    world: &World,
    gate: &dyn CapabilityGate,
    station: Entity,
    requester: Option<Entity>,
    config: &StationConfig,
    recipe: &Recipe,
    repeats: u32,
) -> Option<Vec<Entity>> {
    let sources = gather_input_sources(world, station, requester, config);
    for input in &recipe.inputs {
        let needed = input.quantity as u64 * repeats as u64;
        if count_across(world, &sources, &input.resource) < needed {
            return None;
        }
    }
    select_output_store(world, station, config)?;
    if recipe.requires_power && !gate.is_satisfied(world, station, recipe) {
        return None;
    }
    Some(sources)
}

fn consume_inputs(
    world: &mut World,
    catalog: &Catalog,
    sources: &[Entity],
    recipe: &Recipe,
) -> bool {
    for input in &recipe.inputs {
        if !remove_across(world, catalog, sources, &input.resource, input.quantity) {
            // Cannot happen under single-thread authority: availability was
            // pre-checked against these same sources.
            return false;
        }
    }
    true
}

fn cycle_duration(recipe: &Recipe, config: &StationConfig) -> f64 {
    (recipe.base_seconds / config.speed_multiplier.max(0.01)) as f64
}

/// Try to start a job. Returns false (with no state change) when the
/// station is busy, the arguments are invalid, or admission fails.
pub fn start_job(
    world: &mut World,
    scheduler: &mut Scheduler,
    catalog: &Catalog,
    recipes: &RecipeBook,
    gate: &dyn CapabilityGate,
    station: Entity,
    requester: Option<Entity>,
    recipe_id: &RecipeId,
    repeats: u32,
) -> bool {
    if repeats < 1 {
        return false;
    }
    let Some(recipe) = recipes.get(recipe_id).cloned() else {
        return false;
    };

    let config = {
        let Ok(engine) = world.get::<&ProductionEngine>(station) else {
            return false;
        };
        if engine.is_running() {
            return false;
        }
        engine.config
    };

    // Availability is verified for every requested repeat up front; only the
    // first repeat's inputs are consumed here. Later repeats re-admit.
    let Some(sources) = admit_one_repeat(world, gate, station, requester, &config, &recipe, repeats)
    else {
        return false;
    };
    if !consume_inputs(world, catalog, &sources, &recipe) {
        return false;
    }

    let duration = cycle_duration(&recipe, &config);
    let handle = scheduler.schedule_once(duration);
    let now = scheduler.now();

    if let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) {
        engine.active = Some(ActiveJob {
            recipe: recipe.id.clone(),
            requester,
            repeats_remaining: repeats - 1,
            started_at: now,
            ends_at: now + duration,
            paused: false,
        });
        engine.timer = Some(handle);
        engine.paused_remaining = None;
        engine.events.push(StationEvent::JobStarted {
            recipe: recipe.id.clone(),
        });
    }
    debug!("station {station:?} started {recipe_id} x{repeats}");
    true
}

/// Stop the countdown and discard the active job. Consumed inputs are not
/// refunded. Safe to call when idle.
pub fn cancel_job(world: &mut World, scheduler: &mut Scheduler, station: Entity) {
    let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) else {
        return;
    };
    let Some(job) = engine.active.take() else {
        return;
    };
    if let Some(timer) = engine.timer.take() {
        scheduler.cancel(timer);
    }
    engine.paused_remaining = None;
    engine.events.push(StationEvent::JobEnded {
        recipe: job.recipe.clone(),
        success: false,
    });
    debug!("station {station:?} cancelled {}", job.recipe);
}

/// Freeze the countdown, recording the remaining time. No-op when idle or
/// already paused.
pub fn pause_job(world: &mut World, scheduler: &mut Scheduler, station: Entity) {
    let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) else {
        return;
    };
    let Some(job) = engine.active.as_mut() else {
        return;
    };
    if job.paused {
        return;
    }
    job.paused = true;
    if let Some(timer) = engine.timer.take() {
        let remaining = scheduler.remaining(timer).unwrap_or(0.0);
        scheduler.cancel(timer);
        engine.paused_remaining = Some(remaining);
    }
}

/// Re-arm the countdown for exactly the remaining time. No-op when idle or
/// not paused.
pub fn resume_job(world: &mut World, scheduler: &mut Scheduler, station: Entity) {
    let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) else {
        return;
    };
    if !engine.is_paused() {
        return;
    }
    let remaining = engine.paused_remaining.take().unwrap_or(0.0);
    let handle = scheduler.schedule_once(remaining);
    let now = scheduler.now();
    engine.timer = Some(handle);
    if let Some(job) = engine.active.as_mut() {
        job.paused = false;
        job.ends_at = now + remaining;
    }
}

/// Handle a fired countdown for this station. Returns true when the handle
/// belonged to this station's engine.
pub fn handle_timer_fired(
    world: &mut World,
    scheduler: &mut Scheduler,
    catalog: &Catalog,
    recipes: &RecipeBook,
    gate: &dyn CapabilityGate,
    station: Entity,
    handle: TimerHandle,
) -> bool {
    let (job, config) = {
        let Ok(engine) = world.get::<&ProductionEngine>(station) else {
            return false;
        };
        if !engine.owns_timer(handle) {
            return false;
        }
        (engine.active.clone(), engine.config)
    };
    let Some(job) = job else {
        return true;
    };

    let Some(recipe) = recipes.get(&job.recipe).cloned() else {
        end_job(world, station, &job.recipe, false);
        return true;
    };

    // Fuel/power may have run out mid-flight; the repeat fails rather than
    // silently completing. Inputs stay consumed.
    if recipe.requires_power && !gate.is_satisfied(world, station, &recipe) {
        push_event(world, station, StationEvent::CycleFinished {
            recipe: job.recipe.clone(),
            success: false,
        });
        end_job(world, station, &job.recipe, false);
        return true;
    }

    deliver_outputs(world, catalog, station, &config, &recipe);
    push_event(world, station, StationEvent::CycleFinished {
        recipe: job.recipe.clone(),
        success: true,
    });

    if job.repeats_remaining > 0 {
        let admitted = admit_one_repeat(world, gate, station, job.requester, &config, &recipe, 1)
            .map(|sources| consume_inputs(world, catalog, &sources, &recipe))
            .unwrap_or(false);
        if admitted {
            let duration = cycle_duration(&recipe, &config);
            let next_handle = scheduler.schedule_once(duration);
            let now = scheduler.now();
            if let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) {
                if let Some(active) = engine.active.as_mut() {
                    active.repeats_remaining -= 1;
                    active.started_at = now;
                    active.ends_at = now + duration;
                }
                engine.timer = Some(next_handle);
            }
        } else {
            // The next repeat is no longer satisfiable; end early with
            // success for the repeats already completed.
            end_job(world, station, &job.recipe, true);
        }
    } else {
        end_job(world, station, &job.recipe, true);
    }
    true
}

fn deliver_outputs(
    world: &mut World,
    catalog: &Catalog,
    station: Entity,
    config: &StationConfig,
    recipe: &Recipe,
) {
    let Some(dest) = select_output_store(world, station, config) else {
        warn!("station {station:?}: output destination gone, outputs dropped");
        return;
    };
    let Ok(mut store) = world.get::<&mut ResourceStore>(dest) else {
        return;
    };
    for output in &recipe.outputs {
        if !store.add(catalog, &output.resource, output.quantity) {
            // Destination full: the output is dropped, not queued.
            warn!(
                "station {station:?}: dropped {}x{} (destination full)",
                output.quantity, output.resource
            );
        }
    }
}

fn push_event(world: &mut World, station: Entity, event: StationEvent) {
    if let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) {
        engine.events.push(event);
    }
}

fn end_job(world: &mut World, station: Entity, recipe: &RecipeId, success: bool) {
    if let Ok(mut engine) = world.get::<&mut ProductionEngine>(station) {
        engine.clear_job();
        engine.events.push(StationEvent::JobEnded {
            recipe: recipe.clone(),
            success,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Position;
    use fabworks_logic::catalog::{ResourceDef, ResourceId};

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
        recipes.insert(Recipe::new("smelt", 6.0).input("ore", 1).output("ingot", 1).powered());

        let mut world = World::new();
        let input = world.spawn((ResourceStore::new(4),));
        let output = world.spawn((ResourceStore::new(4),));
        let config = StationConfig {
            input_store: Some(input),
            output_store: Some(output),
            ..StationConfig::default()
        };
        let station = world.spawn((ProductionEngine::new(config), Position::new(0.0, 0.0, 0.0)));

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

    fn id(s: &str) -> ResourceId {
        ResourceId::from(s)
    }

    fn stock(rig: &mut Rig, resource: &str, quantity: u32) {
        rig.world
            .get::<&mut ResourceStore>(rig.input)
            .unwrap()
            .add(&rig.catalog, &id(resource), quantity);
    }

    fn start(rig: &mut Rig, recipe: &str, repeats: u32) -> bool {
        start_job(
            &mut rig.world,
            &mut rig.scheduler,
            &rig.catalog,
            &rig.recipes,
            &AlwaysPowered,
            rig.station,
            None,
            &RecipeId::from(recipe),
            repeats,
        )
    }

    fn tick(rig: &mut Rig, dt: f64) {
        for handle in rig.scheduler.advance(dt) {
            handle_timer_fired(
                &mut rig.world,
                &mut rig.scheduler,
                &rig.catalog,
                &rig.recipes,
                &AlwaysPowered,
                rig.station,
                handle,
            );
        }
    }

    fn count(rig: &Rig, store: Entity, resource: &str) -> u64 {
        rig.world
            .get::<&ResourceStore>(store)
            .unwrap()
            .count_of(&id(resource))
    }

    fn events(rig: &mut Rig) -> Vec<StationEvent> {
        rig.world
            .get::<&mut ProductionEngine>(rig.station)
            .unwrap()
            .drain_events()
    }

    #[test]
    fn job_lifecycle_delivers_output() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);

        assert!(start(&mut rig, "plank", 1));
        assert_eq!(count(&rig, rig.input, "wood"), 0); // consumed up front

        tick(&mut rig, 3.9);
        assert_eq!(count(&rig, rig.output, "plank"), 0);

        tick(&mut rig, 0.2);
        assert_eq!(count(&rig, rig.output, "plank"), 1);

        let fired = events(&mut rig);
        assert!(fired.contains(&StationEvent::JobEnded {
            recipe: RecipeId::from("plank"),
            success: true,
        }));
        let engine = rig.world.get::<&ProductionEngine>(rig.station).unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn admission_failure_leaves_store_untouched() {
        let mut rig = rig();
        stock(&mut rig, "wood", 1); // recipe needs 2

        assert!(!start(&mut rig, "plank", 1));
        assert_eq!(count(&rig, rig.input, "wood"), 1);
        assert!(!rig.world.get::<&ProductionEngine>(rig.station).unwrap().is_running());
    }

    #[test]
    fn at_most_one_active_job() {
        let mut rig = rig();
        stock(&mut rig, "wood", 10);

        assert!(start(&mut rig, "plank", 1));
        let ends_at = rig
            .world
            .get::<&ProductionEngine>(rig.station)
            .unwrap()
            .active()
            .unwrap()
            .ends_at;

        assert!(!start(&mut rig, "plank", 1));
        let engine = rig.world.get::<&ProductionEngine>(rig.station).unwrap();
        assert_eq!(engine.active().unwrap().ends_at, ends_at);
        assert_eq!(count(&rig, rig.input, "wood"), 8); // only one admission consumed
    }

    #[test]
    fn zero_repeats_rejected() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);
        assert!(!start(&mut rig, "plank", 0));
    }

    #[test]
    fn cancel_forfeits_inputs() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);
        assert!(start(&mut rig, "plank", 1));

        tick(&mut rig, 2.0);
        cancel_job(&mut rig.world, &mut rig.scheduler, rig.station);

        assert_eq!(count(&rig, rig.input, "wood"), 0); // not refunded
        assert_eq!(count(&rig, rig.output, "plank"), 0);
        let fired = events(&mut rig);
        assert!(fired.contains(&StationEvent::JobEnded {
            recipe: RecipeId::from("plank"),
            success: false,
        }));

        // Timer disarmed: nothing fires later.
        tick(&mut rig, 10.0);
        assert_eq!(count(&rig, rig.output, "plank"), 0);
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let mut rig = rig();
        cancel_job(&mut rig.world, &mut rig.scheduler, rig.station);
        assert!(events(&mut rig).is_empty());
    }

    #[test]
    fn pause_freezes_and_resume_rearms() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);
        assert!(start(&mut rig, "plank", 1));

        tick(&mut rig, 1.0);
        pause_job(&mut rig.world, &mut rig.scheduler, rig.station);
        // Double pause is a no-op.
        pause_job(&mut rig.world, &mut rig.scheduler, rig.station);

        // Time passes while paused; nothing completes.
        tick(&mut rig, 100.0);
        assert_eq!(count(&rig, rig.output, "plank"), 0);

        resume_job(&mut rig.world, &mut rig.scheduler, rig.station);
        {
            let engine = rig.world.get::<&ProductionEngine>(rig.station).unwrap();
            let remaining = engine.remaining_seconds(&rig.scheduler).unwrap();
            assert!((remaining - 3.0).abs() < 1e-6);
        }

        tick(&mut rig, 3.1);
        assert_eq!(count(&rig, rig.output, "plank"), 1);
    }

    #[test]
    fn gate_failure_at_completion_fails_job() {
        let mut rig = rig();
        stock(&mut rig, "ore", 1);
        rig.world.insert_one(rig.station, PowerSource { active: true }).unwrap();

        let started = start_job(
            &mut rig.world,
            &mut rig.scheduler,
            &rig.catalog,
            &rig.recipes,
            &PoweredGate,
            rig.station,
            None,
            &RecipeId::from("smelt"),
            1,
        );
        assert!(started);

        // Power dies mid-flight.
        rig.world.get::<&mut PowerSource>(rig.station).unwrap().active = false;

        for handle in rig.scheduler.advance(7.0) {
            handle_timer_fired(
                &mut rig.world,
                &mut rig.scheduler,
                &rig.catalog,
                &rig.recipes,
                &PoweredGate,
                rig.station,
                handle,
            );
        }

        assert_eq!(count(&rig, rig.output, "ingot"), 0);
        assert_eq!(count(&rig, rig.input, "ore"), 0); // inputs were a bet
        let fired = events(&mut rig);
        assert!(fired.contains(&StationEvent::JobEnded {
            recipe: RecipeId::from("smelt"),
            success: false,
        }));
    }

    #[test]
    fn gate_failure_at_admission_blocks_start() {
        let mut rig = rig();
        stock(&mut rig, "ore", 1);
        rig.world.insert_one(rig.station, PowerSource { active: false }).unwrap();

        let started = start_job(
            &mut rig.world,
            &mut rig.scheduler,
            &rig.catalog,
            &rig.recipes,
            &PoweredGate,
            rig.station,
            None,
            &RecipeId::from("smelt"),
            1,
        );
        assert!(!started);
        assert_eq!(count(&rig, rig.input, "ore"), 1);
    }

    #[test]
    fn repeats_consume_per_cycle_and_finish() {
        let mut rig = rig();
        stock(&mut rig, "wood", 6);

        assert!(start(&mut rig, "plank", 3));
        assert_eq!(count(&rig, rig.input, "wood"), 4); // one repeat consumed

        tick(&mut rig, 4.1);
        assert_eq!(count(&rig, rig.output, "plank"), 1);
        assert_eq!(count(&rig, rig.input, "wood"), 2);

        tick(&mut rig, 4.1);
        tick(&mut rig, 4.1);
        assert_eq!(count(&rig, rig.output, "plank"), 3);
        assert_eq!(count(&rig, rig.input, "wood"), 0);
        assert!(!rig.world.get::<&ProductionEngine>(rig.station).unwrap().is_running());
    }

    #[test]
    fn repeat_shortfall_ends_early_with_success() {
        let mut rig = rig();
        stock(&mut rig, "wood", 6);
        assert!(start(&mut rig, "plank", 3));

        // Someone drains the buffer between repeats.
        tick(&mut rig, 4.1);
        rig.world
            .get::<&mut ResourceStore>(rig.input)
            .unwrap()
            .remove_by_id(&rig.catalog, &id("wood"), 10);

        tick(&mut rig, 4.1);
        let fired = events(&mut rig);
        assert!(fired.contains(&StationEvent::JobEnded {
            recipe: RecipeId::from("plank"),
            success: true,
        }));
        assert_eq!(count(&rig, rig.output, "plank"), 2);
    }

    #[test]
    fn full_destination_drops_output() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);
        // Jam the output store with something unmergeable.
        {
            let mut store = rig.world.get::<&mut ResourceStore>(rig.output).unwrap();
            store.resize(1).then_some(()).unwrap();
            store.add(&rig.catalog, &id("ore"), 1);
        }

        assert!(start(&mut rig, "plank", 1));
        tick(&mut rig, 4.1);

        // Job still completes; the plank is gone.
        assert_eq!(count(&rig, rig.output, "plank"), 0);
        let fired = events(&mut rig);
        assert!(fired.contains(&StationEvent::JobEnded {
            recipe: RecipeId::from("plank"),
            success: true,
        }));
    }

    #[test]
    fn speed_multiplier_scales_duration() {
        let mut rig = rig();
        stock(&mut rig, "wood", 2);
        rig.world
            .get::<&mut ProductionEngine>(rig.station)
            .unwrap()
            .config
            .speed_multiplier = 2.0;

        assert!(start(&mut rig, "plank", 1));
        tick(&mut rig, 2.1); // base 4s halved
        assert_eq!(count(&rig, rig.output, "plank"), 1);
    }
}
