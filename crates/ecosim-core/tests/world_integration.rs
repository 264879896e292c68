use ecosim_core::{
    BrainBinding, BrainRunner, Decision, EntityView, ItemKind, ResourceKind, SensorSnapshot,
    Species, TickSummary, Vector2, WorldConfig, WorldState,
};
use std::collections::HashSet;

struct Scripted(Decision);

impl BrainRunner for Scripted {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn decide(&mut self, _sensors: &SensorSnapshot, _entity: &EntityView) -> Decision {
        self.0
    }
}

fn scenario_config(seed: u64) -> WorldConfig {
    let mut config = WorldConfig {
        world_width: 1200.0,
        world_height: 1200.0,
        dt: 0.016,
        rng_seed: Some(seed),
        ..WorldConfig::default()
    };
    config.plants.count = 100;
    config.herbivores.count = 20;
    config.herbivores.initial_energy = 110.0;
    config.herbivores.max_energy = 130.0;
    config.predators.count = 5;
    config.predators.initial_energy = 180.0;
    config.predators.max_energy = 200.0;
    config.smarts.count = 0;
    config
}

#[test]
fn thousand_tick_scenario_stays_consistent() {
    let mut world = WorldState::new(scenario_config(0x5EED)).expect("world");
    world.populate();
    let config = world.config().clone();
    let mut dead = HashSet::new();
    let mut previous: HashSet<_> = world.entities().iter_handles().collect();

    for _ in 0..1000 {
        let events = world.step();
        let alive: HashSet<_> = world.entities().iter_handles().collect();
        assert!(alive.is_disjoint(&dead), "swept creature reappeared");
        dead.extend(previous.difference(&alive).copied());
        previous = alive;

        for (_, entity) in world.entities().iter() {
            assert!(entity.is_alive(), "dead creature survived the sweep");
            let position = entity.body.position;
            assert!((0.0..=config.world_width).contains(&position.x));
            assert!((0.0..=config.world_height).contains(&position.y));
            assert!(entity.body.energy > 0.0);
            assert!(entity.body.energy <= entity.body.max_energy + 1e-3);
        }
        for (_, plant) in world.plants() {
            assert!(plant.energy >= 0.0);
            assert!(plant.energy <= plant.max_energy + 1e-3);
        }
        let summary = world.history().last().expect("summary");
        assert_eq!(summary.tick, events.tick);
        if events.extinct {
            break;
        }
    }
    assert!(world.plant_count() <= config.plants.count);
    assert!(world.history().count() <= config.history_capacity);
}

#[test]
fn seeded_worlds_advance_identically() {
    let run = |seed: u64| -> Vec<TickSummary> {
        let mut world = WorldState::new(scenario_config(seed)).expect("world");
        world.populate();
        world.run(300);
        world.history().cloned().collect()
    };
    let first = run(0xABCD);
    let second = run(0xABCD);
    assert_eq!(first.len(), 300);
    assert_eq!(first, second);
}

#[test]
fn mining_a_small_deposit_empties_it_into_the_pack() {
    let mut config = WorldConfig {
        rng_seed: Some(77),
        ..WorldConfig::default()
    };
    config.plants.respawn_interval = 0.0;
    let mut world = WorldState::new(config).expect("world");
    let node = world.spawn_resource(ResourceKind::Tree, Vector2::new(505.0, 500.0), 10.0);
    let miner = world.spawn_entity(Species::Smart, Vector2::new(500.0, 500.0));
    {
        let entity = world.entity_mut(miner).expect("miner");
        entity.reproduction.threshold = f32::INFINITY;
        entity.brain = BrainBinding::with_runner(Box::new(Scripted(Decision::Gather {
            resource: node,
            direction: Vector2::new(1.0, 0.0),
        })));
    }

    // 100 effort at 5 per second, plus slack.
    let ticks = (20.0 / world.config().dt).ceil() as u64 + 100;
    world.run(ticks);

    assert!(world.resource(node).is_none(), "deposit should be exhausted");
    let wood = world
        .entity(miner)
        .and_then(|entity| entity.smart())
        .map(|state| state.inventory.count(ItemKind::Wood))
        .expect("miner state");
    assert!((9..=10).contains(&wood), "collected {wood} wood");
}

#[test]
fn reproduction_never_creates_energy() {
    let mut config = WorldConfig {
        rng_seed: Some(4),
        ..WorldConfig::default()
    };
    config.plants.respawn_interval = 0.0;
    let mut world = WorldState::new(config).expect("world");
    let parent = world.spawn_entity(Species::Herbivore, Vector2::new(600.0, 600.0));
    let before = world.entity(parent).expect("parent").body.energy;

    let events = world.step();
    assert_eq!(events.births, 1);
    let total: f32 = world
        .entities()
        .iter()
        .map(|(_, entity)| entity.body.energy)
        .sum();
    assert!(total <= before + 1e-3, "{total} > {before}");

    let child = world
        .entities()
        .iter_handles()
        .find(|id| *id != parent)
        .expect("offspring");
    let expected = 0.8 * 0.4 * world.config().herbivores.max_energy;
    let child_energy = world.entity(child).expect("child").body.energy;
    assert!((child_energy - expected).abs() < 1e-3);
    assert!(world.entity(parent).expect("parent").reproduction.cooldown > 0.0);
}

#[test]
fn starving_world_only_loses_energy() {
    let mut config = WorldConfig {
        rng_seed: Some(12),
        ..WorldConfig::default()
    };
    config.plants.count = 0;
    config.plants.respawn_interval = 0.0;
    config.herbivores.count = 10;
    config.herbivores.reproduction_threshold = 1.0e9;
    config.predators.count = 0;
    config.smarts.count = 0;
    config.resources.trees = 0;
    config.resources.stones = 0;
    config.resources.copper = 0;
    config.resources.iron = 0;
    let mut world = WorldState::new(config).expect("world");
    world.populate();

    let energies = |world: &WorldState| -> Vec<(ecosim_core::EntityId, f32)> {
        world
            .entities()
            .iter()
            .map(|(id, entity)| (id, entity.body.energy))
            .collect()
    };
    let mut previous = energies(&world);
    for _ in 0..200 {
        world.step();
        for (id, energy) in energies(&world) {
            let before = previous
                .iter()
                .find(|(other, _)| *other == id)
                .map(|(_, energy)| *energy)
                .expect("no births in a starving world");
            assert!(energy <= before, "energy rose from {before} to {energy}");
        }
        previous = energies(&world);
    }
}
