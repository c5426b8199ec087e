//! Fabworks Headless Simulation Harness
//!
//! Validates the production-job simulation end to end without any host
//! integration. Runs entirely in-process — no networking, no rendering.
//!
//! Usage:
//!   cargo run -p fabworks-simtest
//!   cargo run -p fabworks-simtest -- --verbose

use fabworks_core::persistence;
use fabworks_core::prelude::*;
use fabworks_logic::access::AccessMode;
use fabworks_logic::catalog::{Catalog, ResourceDef, ResourceId};
use fabworks_logic::recipe::{Recipe, RecipeBook, RecipeId};
use serde::Deserialize;

// ── Resource catalog (same JSON a host would ship) ──────────────────────
const CATALOG_JSON: &str = include_str!("../../../data/resource_catalog.json");

#[derive(Debug, Deserialize)]
struct ResourceSpec {
    id: String,
    name: String,
    weight: f32,
    volume: f32,
    stackable: bool,
    max_stack: u32,
}

#[derive(Debug, Deserialize)]
struct AmountSpec {
    resource: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct RecipeSpec {
    id: String,
    base_seconds: f32,
    requires_power: bool,
    inputs: Vec<AmountSpec>,
    outputs: Vec<AmountSpec>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    resources: Vec<ResourceSpec>,
    recipes: Vec<RecipeSpec>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Fabworks Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Catalog & recipe manifest validation
    let (catalog, recipes) = match load_catalog(&mut results) {
        Some(pair) => pair,
        None => {
            report(&results, verbose);
            std::process::exit(1);
        }
    };

    // 2. Store mechanics
    results.extend(validate_store_mechanics(&catalog, verbose));

    // 3. Access control
    results.extend(validate_access_control(&catalog, &recipes));

    // 4. Source gathering & output selection
    results.extend(validate_locator(&catalog, &recipes));

    // 5. Production lifecycle
    results.extend(validate_production(&catalog, &recipes, verbose));

    // 6. Queue behavior
    results.extend(validate_queue(&catalog, &recipes));

    // 7. Save/load round trip
    results.extend(validate_persistence(&catalog, &recipes));

    report(&results, verbose);

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
}

fn report(results: &[TestResult], verbose: bool) {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
}

// ── 1. Catalog manifest ─────────────────────────────────────────────────

fn load_catalog(results: &mut Vec<TestResult>) -> Option<(Catalog, RecipeBook)> {
    println!("--- Resource Catalog ---");

    let file: CatalogFile = match serde_json::from_str(CATALOG_JSON) {
        Ok(f) => f,
        Err(e) => {
            results.push(TestResult {
                name: "catalog_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return None;
        }
    };

    results.push(TestResult {
        name: "catalog_not_empty".into(),
        passed: file.resources.len() >= 5 && !file.recipes.is_empty(),
        detail: format!(
            "{} resources, {} recipes loaded",
            file.resources.len(),
            file.recipes.len()
        ),
    });

    let bad_physical: Vec<_> = file
        .resources
        .iter()
        .filter(|r| r.weight < 0.0 || r.volume < 0.0)
        .collect();
    results.push(TestResult {
        name: "catalog_positive_physicals".into(),
        passed: bad_physical.is_empty(),
        detail: if bad_physical.is_empty() {
            "all resources have non-negative weight/volume".into()
        } else {
            format!("{} resources with negative weight/volume", bad_physical.len())
        },
    });

    let bad_stack: Vec<_> = file
        .resources
        .iter()
        .filter(|r| !r.stackable && r.max_stack != 1)
        .collect();
    results.push(TestResult {
        name: "catalog_unstackable_max_one".into(),
        passed: bad_stack.is_empty(),
        detail: "non-stackable resources cap at 1 per slot".into(),
    });

    let mut catalog = Catalog::new();
    for spec in &file.resources {
        let mut def = ResourceDef::new(spec.name.clone(), spec.weight, spec.volume);
        if spec.stackable {
            def = def.with_max_stack(spec.max_stack);
        } else {
            def = def.unstackable();
        }
        catalog.insert(spec.id.as_str(), def);
    }

    let mut recipes = RecipeBook::new();
    for spec in &file.recipes {
        let mut recipe = Recipe::new(spec.id.as_str(), spec.base_seconds);
        if spec.requires_power {
            recipe = recipe.powered();
        }
        for input in &spec.inputs {
            recipe = recipe.input(input.resource.as_str(), input.quantity);
        }
        for output in &spec.outputs {
            recipe = recipe.output(output.resource.as_str(), output.quantity);
        }
        recipes.insert(recipe);
    }

    // Every recipe well-formed and resolvable against the catalog
    let mut unresolved = 0;
    for recipe in recipes.iter() {
        for amount in recipe.inputs.iter().chain(recipe.outputs.iter()) {
            if catalog.resolve(&amount.resource).is_none() {
                unresolved += 1;
            }
        }
    }
    results.push(TestResult {
        name: "recipes_resolve".into(),
        passed: unresolved == 0 && recipes.iter().all(|r| r.is_well_formed()),
        detail: if unresolved == 0 {
            "all recipe inputs/outputs resolve in catalog".into()
        } else {
            format!("{} unresolved recipe resources", unresolved)
        },
    });

    Some((catalog, recipes))
}

// ── 2. Store mechanics ──────────────────────────────────────────────────

fn validate_store_mechanics(catalog: &Catalog, verbose: bool) -> Vec<TestResult> {
    println!("--- Store Mechanics ---");
    let mut results = Vec::new();

    let wood = ResourceId::from("wood");
    let anvil = ResourceId::from("anvil");

    // Merge-first add
    let mut store = ResourceStore::new(4);
    store.add(catalog, &wood, 30);
    store.add(catalog, &wood, 15);
    results.push(TestResult {
        name: "store_merge_first".into(),
        passed: store.occupied_slots() == 1 && store.count_of(&wood) == 45,
        detail: format!(
            "two adds merged into {} slot(s), {} units",
            store.occupied_slots(),
            store.count_of(&wood)
        ),
    });

    // Overflow to a second slot when the stack cap is hit
    store.add(catalog, &wood, 20); // 45+20 > 50 cap, takes a new slot
    results.push(TestResult {
        name: "store_stack_cap_overflow".into(),
        passed: store.occupied_slots() == 2 && store.count_of(&wood) == 65,
        detail: format!("{} slots after cap overflow", store.occupied_slots()),
    });

    // Non-stackable never merges
    let mut rack = ResourceStore::new(3);
    rack.add(catalog, &anvil, 1);
    rack.add(catalog, &anvil, 1);
    results.push(TestResult {
        name: "store_unstackable_separate_slots".into(),
        passed: rack.occupied_slots() == 2,
        detail: "two anvils occupy two slots".into(),
    });

    // Weight limit rejects atomically
    let mut pack = ResourceStore::new(10).with_limits(Some(10.0), None);
    pack.add(catalog, &wood, 4); // 8.0 weight
    let over = pack.add(catalog, &wood, 2); // would be 12.0
    results.push(TestResult {
        name: "store_weight_limit".into(),
        passed: !over && pack.count_of(&wood) == 4,
        detail: format!(
            "over-limit add rejected, weight {:.1}/10.0",
            pack.current_weight()
        ),
    });

    // Split then transfer conserves totals
    let mut a = ResourceStore::new(4);
    let mut b = ResourceStore::new(4);
    a.add(catalog, &wood, 40);
    a.split(0, 15);
    let before = a.total_quantity() + b.total_quantity();
    let moved = a.transfer_to(catalog, 1, &mut b, None);
    let after = a.total_quantity() + b.total_quantity();
    results.push(TestResult {
        name: "store_split_transfer_conserves".into(),
        passed: moved && before == after && b.count_of(&wood) == 15,
        detail: format!("{} units before, {} after", before, after),
    });

    // Clamped remove vs strict remove
    let mut c = ResourceStore::new(2);
    c.add(catalog, &wood, 5);
    let clamped = c.remove(catalog, 0, 99);
    let strict = {
        let mut d = ResourceStore::new(2);
        d.add(catalog, &wood, 5);
        !d.remove_exact(catalog, 0, 99) && d.count_of(&wood) == 5
    };
    results.push(TestResult {
        name: "store_remove_semantics".into(),
        passed: clamped && c.count_of(&wood) == 0 && strict,
        detail: "remove clamps, remove_exact refuses".into(),
    });

    if verbose {
        println!("  Store after merge test:");
        for (idx, slot) in store.slots().iter().enumerate() {
            match slot {
                Some(stack) => println!("    [{}] {} x{}", idx, stack.resource, stack.quantity),
                None => println!("    [{}] empty", idx),
            }
        }
    }

    results
}

// ── 3. Access control ───────────────────────────────────────────────────

fn validate_access_control(catalog: &Catalog, recipes: &RecipeBook) -> Vec<TestResult> {
    println!("--- Access Control ---");
    let mut results = Vec::new();

    let mut sim = SimWorld::new(catalog.clone(), recipes.clone());
    let owner = sim.spawn_actor("alice", Position::default(), None);
    let stranger = sim.spawn_actor("mallory", Position::default(), None);

    let chest = sim.spawn_store(
        ResourceStore::new(4)
            .with_access(AccessMode::Private)
            .with_owner("alice"),
        Position::default(),
    );
    sim.world
        .get::<&mut ResourceStore>(chest)
        .unwrap()
        .add(&sim.catalog, &ResourceId::from("wood"), 10);

    results.push(TestResult {
        name: "access_private_owner_only".into(),
        passed: sim.can_view_store(owner, chest) && !sim.can_view_store(stranger, chest),
        detail: "owner sees private chest, stranger does not".into(),
    });

    let denied = !sim.request_split(stranger, chest, 0, 3);
    let allowed = sim.request_split(owner, chest, 0, 3);
    results.push(TestResult {
        name: "access_modify_relay".into(),
        passed: denied && allowed,
        detail: "split denied for stranger, allowed for owner".into(),
    });

    // View-only: anyone sees, only the owner mutates
    let display = sim.spawn_store(
        ResourceStore::new(2)
            .with_access(AccessMode::ViewOnly)
            .with_owner("alice"),
        Position::default(),
    );
    sim.world
        .get::<&mut ResourceStore>(display)
        .unwrap()
        .add(&sim.catalog, &ResourceId::from("stone"), 4);
    results.push(TestResult {
        name: "access_view_only".into(),
        passed: sim.can_view_store(stranger, display)
            && !sim.request_split(stranger, display, 0, 1)
            && sim.request_split(owner, display, 0, 1),
        detail: "view-only store visible to all, mutable by owner".into(),
    });

    // A despawned requester resolves as "requester gone"
    sim.world.despawn(stranger).unwrap();
    results.push(TestResult {
        name: "access_stale_requester".into(),
        passed: !sim.can_view_store(stranger, chest) && sim.identity_of(stranger).is_none(),
        detail: "stale requester handle resolves to no identity".into(),
    });

    results
}

// ── 4. Locator ──────────────────────────────────────────────────────────

fn validate_locator(catalog: &Catalog, recipes: &RecipeBook) -> Vec<TestResult> {
    println!("--- Source Gathering ---");
    let mut results = Vec::new();

    let mut sim = SimWorld::new(catalog.clone(), recipes.clone());
    let wood = ResourceId::from("wood");

    // Station pulls from its own buffer, the interactor, and nearby public
    // stores, in that order.
    let input = sim.spawn_store(ResourceStore::new(4), Position::new(0.0, 0.0, 0.0));
    let nearby = sim.spawn_store(ResourceStore::new(4), Position::new(3.0, 0.0, 0.0));
    let output = sim.spawn_store(ResourceStore::new(4), Position::new(0.0, 1.0, 0.0));
    let _far = sim.spawn_store(ResourceStore::new(4), Position::new(500.0, 0.0, 0.0));

    sim.world
        .get::<&mut ResourceStore>(input)
        .unwrap()
        .add(&sim.catalog, &wood, 1);
    sim.world
        .get::<&mut ResourceStore>(nearby)
        .unwrap()
        .add(&sim.catalog, &wood, 1);

    let station = sim.spawn_station(
        StationConfig {
            input_store: Some(input),
            output_store: Some(output),
            use_nearby_public: true,
            public_search_radius: 10.0,
            ..StationConfig::default()
        },
        Position::new(0.0, 0.0, 0.0),
    );

    // 2 wood needed; 1 in the buffer, 1 in a nearby public store
    let actor = sim.spawn_actor("carol", Position::default(), None);
    let started = sim.request_start_job(actor, station, &RecipeId::from("plank"), 1);
    let drained_both = sim
        .world
        .get::<&ResourceStore>(input)
        .unwrap()
        .count_of(&wood)
        == 0
        && sim
            .world
            .get::<&ResourceStore>(nearby)
            .unwrap()
            .count_of(&wood)
            == 0;
    results.push(TestResult {
        name: "locator_multi_source_admission".into(),
        passed: started && drained_both,
        detail: "admission drew from buffer and nearby public store".into(),
    });

    results
}

// ── 5. Production lifecycle ─────────────────────────────────────────────

fn validate_production(catalog: &Catalog, recipes: &RecipeBook, verbose: bool) -> Vec<TestResult> {
    println!("--- Production Lifecycle ---");
    let mut results = Vec::new();

    let wood = ResourceId::from("wood");
    let plank = ResourceId::from("plank");

    let mut sim = SimWorld::new(catalog.clone(), recipes.clone());
    let actor = sim.spawn_actor("carol", Position::default(), None);
    let input = sim.spawn_store(ResourceStore::new(8), Position::default());
    let output = sim.spawn_store(ResourceStore::new(8), Position::default());
    sim.world
        .get::<&mut ResourceStore>(input)
        .unwrap()
        .add(&sim.catalog, &wood, 8);
    let station = sim.spawn_station(
        StationConfig {
            input_store: Some(input),
            output_store: Some(output),
            ..StationConfig::default()
        },
        Position::default(),
    );

    // Timed completion with repeats
    sim.request_enqueue(actor, station, &RecipeId::from("plank"), 3);
    let mut ticks = 0;
    while sim
        .world
        .get::<&ProductionEngine>(station)
        .unwrap()
        .is_running()
        && ticks < 400
    {
        sim.update(0.05);
        ticks += 1;
    }
    let made = sim
        .world
        .get::<&ResourceStore>(output)
        .unwrap()
        .count_of(&plank);
    results.push(TestResult {
        name: "production_repeats_complete".into(),
        passed: made == 3 && (sim.now() - 12.0).abs() < 0.2,
        detail: format!("3 repeats made {} planks in {:.2}s sim time", made, sim.now()),
    });

    // Pause stretches wall time, not work
    let mut sim2 = SimWorld::new(catalog.clone(), recipes.clone());
    let actor2 = sim2.spawn_actor("carol", Position::default(), None);
    let input2 = sim2.spawn_store(ResourceStore::new(4), Position::default());
    let output2 = sim2.spawn_store(ResourceStore::new(4), Position::default());
    sim2.world
        .get::<&mut ResourceStore>(input2)
        .unwrap()
        .add(&sim2.catalog, &wood, 2);
    let station2 = sim2.spawn_station(
        StationConfig {
            input_store: Some(input2),
            output_store: Some(output2),
            ..StationConfig::default()
        },
        Position::default(),
    );
    sim2.request_enqueue(actor2, station2, &RecipeId::from("plank"), 1);
    sim2.update(2.0);
    sim2.request_pause_job(station2);
    sim2.update(50.0);
    let still_unfinished = sim2
        .world
        .get::<&ResourceStore>(output2)
        .unwrap()
        .count_of(&plank)
        == 0;
    sim2.request_resume_job(station2);
    sim2.update(2.1);
    let finished_after_resume = sim2
        .world
        .get::<&ResourceStore>(output2)
        .unwrap()
        .count_of(&plank)
        == 1;
    results.push(TestResult {
        name: "production_pause_resume".into(),
        passed: still_unfinished && finished_after_resume,
        detail: "paused job froze, resumed job finished on remaining time".into(),
    });

    // Power gate blocks and fails jobs
    let mut sim3 = SimWorld::new(catalog.clone(), recipes.clone()).with_gate(Box::new(PoweredGate));
    let actor3 = sim3.spawn_actor("carol", Position::default(), None);
    let input3 = sim3.spawn_store(ResourceStore::new(4), Position::default());
    let output3 = sim3.spawn_store(ResourceStore::new(4), Position::default());
    {
        let mut store = sim3.world.get::<&mut ResourceStore>(input3).unwrap();
        store.add(&sim3.catalog, &ResourceId::from("iron_ore"), 4);
        store.add(&sim3.catalog, &ResourceId::from("coal"), 2);
    }
    let station3 = sim3.spawn_station(
        StationConfig {
            input_store: Some(input3),
            output_store: Some(output3),
            ..StationConfig::default()
        },
        Position::default(),
    );

    let blocked = !sim3.request_start_job(actor3, station3, &RecipeId::from("smelt_iron"), 1);
    sim3.world
        .insert_one(station3, PowerSource { active: true })
        .unwrap();
    let started = sim3.request_start_job(actor3, station3, &RecipeId::from("smelt_iron"), 1);
    // Power dies mid-flight
    sim3.world
        .get::<&mut PowerSource>(station3)
        .unwrap()
        .active = false;
    let events = sim3.update(9.0);
    let failed_midflight = events.iter().any(|e| {
        matches!(
            e,
            SimEvent::Station {
                event: StationEvent::JobEnded { success: false, .. },
                ..
            }
        )
    });
    let no_ingots = sim3
        .world
        .get::<&ResourceStore>(output3)
        .unwrap()
        .count_of(&ResourceId::from("iron_ingot"))
        == 0;
    results.push(TestResult {
        name: "production_power_gate".into(),
        passed: blocked && started && failed_midflight && no_ingots,
        detail: "unpowered start blocked; mid-flight outage failed the job".into(),
    });

    if verbose {
        println!("  Lifecycle run: {} ticks, sim time {:.2}s", ticks, sim.now());
    }

    results
}

// ── 6. Queue behavior ───────────────────────────────────────────────────

fn validate_queue(catalog: &Catalog, recipes: &RecipeBook) -> Vec<TestResult> {
    println!("--- Job Queue ---");
    let mut results = Vec::new();

    let mut sim = SimWorld::new(catalog.clone(), recipes.clone());
    let actor = sim.spawn_actor("carol", Position::default(), None);
    let input = sim.spawn_store(ResourceStore::new(8), Position::default());
    let output = sim.spawn_store(ResourceStore::new(8), Position::default());
    sim.world
        .get::<&mut ResourceStore>(input)
        .unwrap()
        .add(&sim.catalog, &ResourceId::from("wood"), 4);
    let station = sim.spawn_station(
        StationConfig {
            input_store: Some(input),
            output_store: Some(output),
            ..StationConfig::default()
        },
        Position::default(),
    );

    // An unsatisfiable entry between two good ones does not wedge the queue
    let first = sim
        .request_enqueue(actor, station, &RecipeId::from("plank"), 1)
        .unwrap();
    let starved = sim
        .request_enqueue(actor, station, &RecipeId::from("crate"), 1)
        .unwrap();
    let second = sim
        .request_enqueue(actor, station, &RecipeId::from("plank"), 1)
        .unwrap();

    for _ in 0..200 {
        sim.update(0.1);
    }

    let q = sim.world.get::<&JobQueue>(station).unwrap();
    let healed = q.entry(first).map(|e| e.state) == Some(JobState::Completed)
        && q.entry(starved).map(|e| e.state) == Some(JobState::Failed)
        && q.entry(second).map(|e| e.state) == Some(JobState::Completed);
    drop(q);
    results.push(TestResult {
        name: "queue_self_heals".into(),
        passed: healed,
        detail: "completed, failed, completed — in order".into(),
    });

    let made = sim
        .world
        .get::<&ResourceStore>(output)
        .unwrap()
        .count_of(&ResourceId::from("plank"));
    results.push(TestResult {
        name: "queue_fifo_output".into(),
        passed: made == 2,
        detail: format!("{} planks from the two viable entries", made),
    });

    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(catalog: &Catalog, recipes: &RecipeBook) -> Vec<TestResult> {
    println!("--- Save/Load ---");
    let mut results = Vec::new();

    let mut sim = SimWorld::new(catalog.clone(), recipes.clone());
    let actor = sim.spawn_actor("carol", Position::default(), None);
    let input = sim.spawn_store(ResourceStore::new(8), Position::default());
    let output = sim.spawn_store(ResourceStore::new(8), Position::default());
    sim.world
        .get::<&mut ResourceStore>(input)
        .unwrap()
        .add(&sim.catalog, &ResourceId::from("wood"), 6);
    let station = sim.spawn_station(
        StationConfig {
            input_store: Some(input),
            output_store: Some(output),
            ..StationConfig::default()
        },
        Position::default(),
    );
    sim.request_enqueue(actor, station, &RecipeId::from("plank"), 1);
    sim.request_enqueue(actor, station, &RecipeId::from("plank"), 2);

    let data = persistence::snapshot(&sim);
    let mut restored = SimWorld::new(catalog.clone(), recipes.clone());
    if let Err(e) = persistence::restore(&mut restored, &data) {
        results.push(TestResult {
            name: "persistence_restore".into(),
            passed: false,
            detail: format!("restore failed: {}", e),
        });
        return results;
    }

    // The backlog survives and runs to completion against rewired stores.
    for _ in 0..200 {
        restored.update(0.1);
    }
    let planks: u64 = restored
        .world
        .query::<&ResourceStore>()
        .iter()
        .map(|(_, s)| s.count_of(&ResourceId::from("plank")))
        .sum();
    results.push(TestResult {
        name: "persistence_backlog_resumes".into(),
        passed: planks == 2,
        detail: format!("{} planks produced from the restored backlog", planks),
    });

    results
}
