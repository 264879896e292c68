use super::{
    EAT_REACH, consult_brain, head, nearest, start_eating, steer, stop, stop_eating, strike,
    wander,
};
use crate::{
    Activity, BuildingKind, Decision, EntityId, EquipmentSlot, ItemKind, SensorSnapshot, Species,
    Station, Vector2, WorldState,
};
use rand::Rng;
use tracing::debug;

/// Meat handed from parent to offspring at birth.
pub(super) const OFFSPRING_MEAT: u32 = 2;
/// Energy gained per point of damage dealt.
const FEED_RATIO: f32 = 0.5;
/// Distance from any border at which a creature turns back toward the centre.
const EDGE_MARGIN: f32 = 50.0;
const CENTRE_SPEED: f32 = 50.0;
const EAT_DISTANCE: f32 = 12.0;
const FORAGE_SPEED: f32 = 55.0;
const FLEE_DISTANCE: f32 = 25.0;
const FLEE_MIN_ENERGY: f32 = 10.0;
const FLEE_SPEED: f32 = 85.0;
const CHASE_SPEED: f32 = 80.0;
const WANDER_SPEED: f32 = 30.0;
const WANDER_INTERVAL: (f32, f32) = (2.0, 5.0);
const SHARED_FOOD: [ItemKind; 2] = [ItemKind::CookedMeat, ItemKind::Meat];

pub(super) fn behave(world: &mut WorldState, id: EntityId, dt: f32) {
    let Some(entity) = world.entities.get_mut(id) else {
        return;
    };
    if let Some(combat) = entity.combat_mut() {
        combat.timer -= dt;
    }
    let Some(sensors) = world.sense(id) else {
        return;
    };

    let ate = auto_eat(world, id, dt);
    share_with_tribe(world, id);
    if ate {
        if let Some(entity) = world.entities.get_mut(id) {
            entity.activity = Activity::Eating;
        }
    }

    if let Some(decision) = consult_brain(world, id, &sensors) {
        execute(world, id, decision, dt);
        return;
    }
    if !ate {
        heuristic(world, id, &sensors, dt);
    }
}

/// Eat from the pack when hungry: cooked meat, then raw meat, then a plant within reach.
///
/// Returns whether any energy was gained.
fn auto_eat(world: &mut WorldState, id: EntityId, dt: f32) -> bool {
    let auto_eat_ratio = world.config.tribe.auto_eat_ratio;
    let forage_radius = world.config.tribe.forage_radius;
    let Some(entity) = world.entities.get_mut(id) else {
        return false;
    };
    if entity.body.energy >= entity.body.max_energy * auto_eat_ratio {
        return false;
    }
    let before = entity.body.energy;
    let position = entity.body.position;
    let Some(state) = entity.smart_mut() else {
        return false;
    };
    let packed = [ItemKind::CookedMeat, ItemKind::Meat]
        .into_iter()
        .find(|food| state.inventory.remove(*food, 1));
    if let Some(food) = packed {
        let stats = food.stats();
        entity.body.gain_energy(stats.energy_gain);
        entity.body.heal(stats.heal_amount);
        return entity.body.energy > before;
    }

    let Some(plant_id) = world
        .plants_in_radius(position, forage_radius)
        .first()
        .map(|(plant_id, _)| *plant_id)
    else {
        return false;
    };
    let Some(plant) = world.plants.get_mut(plant_id) else {
        return false;
    };
    let bite = plant.bite(plant.max_energy / plant.consumption_time * dt);
    let Some(entity) = world.entities.get_mut(id) else {
        return false;
    };
    entity.body.gain_energy(bite);
    entity.body.energy > before
}

/// Hand single portions of food to starving tribemates nearby.
fn share_with_tribe(world: &mut WorldState, id: EntityId) {
    let share_below = world.config.tribe.share_below_ratio;
    let Some((position, tribe, radius)) = world.entities.get(id).and_then(|entity| {
        let state = entity.smart()?;
        Some((entity.body.position, state.tribe, state.share_radius))
    }) else {
        return;
    };
    let hungry: Vec<EntityId> = world
        .entities_in_radius(position, radius)
        .into_iter()
        .filter_map(|(other, _)| {
            let ally = world.entities.get(other)?;
            (other != id
                && ally.is_alive()
                && ally.tribe() == Some(tribe)
                && ally.body.energy_ratio() < share_below)
                .then_some(other)
        })
        .collect();
    if hungry.is_empty() {
        return;
    }

    for food in SHARED_FOOD {
        let mut remaining = world
            .entities
            .get(id)
            .and_then(|entity| entity.smart())
            .map_or(0, |state| state.inventory.count(food));
        if remaining == 0 {
            continue;
        }
        for ally in &hungry {
            let Some((giver, receiver)) = world.entities.get2_mut(id, *ally) else {
                continue;
            };
            let (Some(giver), Some(receiver)) = (giver.smart_mut(), receiver.smart_mut()) else {
                continue;
            };
            if !receiver.inventory.can_add(food, 1) || !giver.inventory.remove(food, 1) {
                continue;
            }
            receiver.inventory.add(food, 1);
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
        if remaining == 0 {
            break;
        }
    }
}

fn heuristic(world: &mut WorldState, id: EntityId, sensors: &SensorSnapshot, dt: f32) {
    let Some((position, energy, range)) = world.entities.get(id).and_then(|entity| {
        Some((entity.body.position, entity.body.energy, entity.combat()?.range))
    }) else {
        return;
    };

    let (width, height) = (world.config.world_width, world.config.world_height);
    let near_edge = position.x < EDGE_MARGIN
        || position.y < EDGE_MARGIN
        || position.x > width - EDGE_MARGIN
        || position.y > height - EDGE_MARGIN;
    if near_edge {
        stop_eating(world, id);
        let centre = Vector2::new(width * 0.5, height * 0.5);
        if let Some(entity) = world.entities.get_mut(id) {
            head(entity, centre - position, CENTRE_SPEED);
            entity.activity = Activity::Searching;
        }
        return;
    }

    if let Some(threat) = nearest(sensors, &[Species::Predator]) {
        if threat.distance < FLEE_DISTANCE && energy > FLEE_MIN_ENERGY {
            stop_eating(world, id);
            if let Some(entity) = world.entities.get_mut(id) {
                steer(entity, -threat.direction, FLEE_SPEED);
                entity.activity = Activity::Fleeing;
            }
            return;
        }
    }

    if let Some(prey) = sensors.nearby_herbivores.first() {
        stop_eating(world, id);
        if prey.distance < range {
            attack(world, id, prey.id);
        } else if let Some(entity) = world.entities.get_mut(id) {
            head(entity, prey.direction, CHASE_SPEED);
            entity.activity = Activity::Hunting;
        }
        return;
    }

    if let Some(plant) = sensors.nearby_plants.first() {
        if plant.distance < EAT_DISTANCE {
            if start_eating(world, id, plant.id, EAT_REACH) {
                return;
            }
        } else {
            stop_eating(world, id);
            if let Some(entity) = world.entities.get_mut(id) {
                head(entity, plant.direction, FORAGE_SPEED);
                entity.activity = Activity::Searching;
            }
            return;
        }
    }

    wander(world, id, WANDER_SPEED, WANDER_INTERVAL, dt);
}

fn execute(world: &mut WorldState, id: EntityId, decision: Decision, dt: f32) {
    match decision {
        Decision::Move { direction, speed } | Decision::Flee { direction, speed } => {
            stop_eating(world, id);
            if let Some(entity) = world.entities.get_mut(id) {
                steer(entity, direction, speed);
                entity.activity = if matches!(decision, Decision::Flee { .. }) {
                    Activity::Fleeing
                } else {
                    Activity::Hunting
                };
            }
        }
        Decision::Eat { plant, .. } => {
            start_eating(world, id, plant, EAT_REACH);
        }
        Decision::Attack { target, .. } => {
            halt(world, id);
            attack(world, id, target);
        }
        Decision::Gather { resource, .. } => {
            halt(world, id);
            gather(world, id, resource);
        }
        Decision::Craft { item } => {
            if craft(world, id, item) {
                set_activity(world, id, Activity::Crafting);
            }
        }
        Decision::Build { kind } => {
            if build(world, id, kind) {
                set_activity(world, id, Activity::Building);
            }
        }
        Decision::Equip { item } => {
            if equip(world, id, item) {
                set_activity(world, id, Activity::Equipping);
            }
        }
        Decision::Wander { speed } => {
            stop_eating(world, id);
            wander(world, id, speed.max(WANDER_SPEED), WANDER_INTERVAL, dt);
        }
        Decision::Idle => {
            stop_eating(world, id);
            if let Some(entity) = world.entities.get_mut(id) {
                stop(entity);
                entity.activity = Activity::Idle;
            }
        }
    }
}

fn halt(world: &mut WorldState, id: EntityId) {
    if let Some(entity) = world.entities.get_mut(id) {
        stop(entity);
    }
}

fn set_activity(world: &mut WorldState, id: EntityId, activity: Activity) {
    if let Some(entity) = world.entities.get_mut(id) {
        entity.activity = activity;
    }
}

/// Strike `target` and collect loot if it dies.
fn attack(world: &mut WorldState, id: EntityId, target: EntityId) {
    let Some(outcome) = strike(world, id, target, FEED_RATIO) else {
        return;
    };
    if !outcome.killed {
        return;
    }
    let (meat, leather) = match outcome.prey {
        Species::Predator => (world.rng.random_range(2..=4), world.rng.random_range(1..=2)),
        Species::Herbivore => (world.rng.random_range(1..=3), world.rng.random_range(1..=2)),
        Species::Smart => (1, 0),
    };
    if let Some(state) = world
        .entities
        .get_mut(id)
        .and_then(|entity| entity.smart_mut())
    {
        state.inventory.add(ItemKind::Meat, meat);
        state.inventory.add(ItemKind::Leather, leather);
    }
}

/// Join the miners of a live node within gather range.
fn gather(world: &mut WorldState, id: EntityId, resource: crate::ResourceId) -> bool {
    let gather_range = world.config.tribe.gather_range;
    let Some((position, efficiency)) = world.entities.get(id).and_then(|entity| {
        Some((
            entity.body.position,
            entity.smart()?.equipment.tool_efficiency(),
        ))
    }) else {
        return false;
    };
    let Some(node) = world
        .resources
        .get_mut(resource)
        .filter(|node| node.alive && node.position.distance_to(position) <= gather_range)
    else {
        return false;
    };
    node.add_miner(id, efficiency);
    set_activity(world, id, Activity::Gathering);
    true
}

/// Stations offered by intact buildings whose radius covers `position`.
fn stations_near(world: &WorldState, position: Vector2) -> Vec<Station> {
    let mut stations = Vec::new();
    for building in world.buildings.values() {
        if building.is_destroyed() || building.position.distance_to(position) > building.radius {
            continue;
        }
        for station in building.kind.stations() {
            if !stations.contains(station) {
                stations.push(*station);
            }
        }
    }
    stations
}

fn craft(world: &mut WorldState, id: EntityId, item: ItemKind) -> bool {
    let Some(position) = world.entities.get(id).map(|entity| entity.body.position) else {
        return false;
    };
    let stations = stations_near(world, position);
    let recipes = world.recipes;
    let Some(state) = world
        .entities
        .get_mut(id)
        .and_then(|entity| entity.smart_mut())
    else {
        return false;
    };
    match recipes.craft_item(item, &mut state.inventory, &stations) {
        Ok(_) => true,
        Err(error) => {
            debug!(entity = ?id, item = item.label(), %error, "craft refused");
            false
        }
    }
}

/// Place a building at the creature's position, paying the cost only on success.
fn build(world: &mut WorldState, id: EntityId, kind: BuildingKind) -> bool {
    let cost = kind.stats().cost;
    let Some(position) = world.entities.get(id).and_then(|entity| {
        let state = entity.smart()?;
        cost.iter()
            .all(|(item, count)| state.inventory.has(*item, *count))
            .then_some(entity.body.position)
    }) else {
        return false;
    };
    if world.place_building(kind, position, Some(id)).is_none() {
        return false;
    }
    if let Some(state) = world
        .entities
        .get_mut(id)
        .and_then(|entity| entity.smart_mut())
    {
        for (item, count) in cost {
            state.inventory.remove(*item, *count);
        }
    }
    true
}

/// Move `item` from the pack into its slot, returning the previous occupant to the pack.
fn equip(world: &mut WorldState, id: EntityId, item: ItemKind) -> bool {
    let Some(slot) = EquipmentSlot::for_item(item) else {
        return false;
    };
    let Some(state) = world
        .entities
        .get_mut(id)
        .and_then(|entity| entity.smart_mut())
    else {
        return false;
    };
    if !state.inventory.remove(item, 1) {
        return false;
    }
    if let Some(previous) = state.equipment.slot(slot) {
        if state.inventory.add(previous, 1) == 0 {
            state.inventory.add(item, 1);
            return false;
        }
    }
    *state.equipment.slot_mut(slot) = Some(item);
    if slot == EquipmentSlot::Bag {
        state
            .inventory
            .set_capacity_modifier(item.stats().carry_bonus);
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::{
        Activity, BrainBinding, BrainRunner, BuildingKind, Decision, EntityView, ItemKind,
        ResourceKind, SensorSnapshot, Species, Vector2, WorldConfig, WorldState,
    };

    struct Scripted(Decision);

    impl BrainRunner for Scripted {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        fn decide(&mut self, _sensors: &SensorSnapshot, _entity: &EntityView) -> Decision {
            self.0
        }
    }

    fn world() -> WorldState {
        WorldState::new(WorldConfig {
            rng_seed: Some(21),
            ..WorldConfig::default()
        })
        .expect("world")
    }

    /// A smart creature that never breeds, so tests see a single body.
    fn spawn_smart(world: &mut WorldState, position: Vector2) -> crate::EntityId {
        let id = world.spawn_entity(Species::Smart, position);
        world.entity_mut(id).expect("smart").reproduction.threshold = f32::INFINITY;
        id
    }

    fn give(world: &mut WorldState, id: crate::EntityId, item: ItemKind, count: u32) {
        world
            .entity_mut(id)
            .and_then(|entity| entity.smart_mut())
            .expect("smart")
            .inventory
            .add(item, count);
    }

    fn script(world: &mut WorldState, id: crate::EntityId, decision: Decision) {
        world.entity_mut(id).expect("smart").brain =
            BrainBinding::with_runner(Box::new(Scripted(decision)));
    }

    #[test]
    fn hungry_smart_eats_cooked_meat_first() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(200.0, 200.0));
        give(&mut world, smart, ItemKind::CookedMeat, 1);
        give(&mut world, smart, ItemKind::Meat, 1);
        world.entity_mut(smart).expect("smart").body.energy = 20.0;
        world.entity_mut(smart).expect("smart").body.health = 50.0;
        world.step();

        let entity = world.entity(smart).expect("smart");
        let state = entity.smart().expect("smart state");
        assert_eq!(state.inventory.count(ItemKind::CookedMeat), 0);
        assert_eq!(state.inventory.count(ItemKind::Meat), 1);
        assert!(entity.body.energy > 79.0);
        assert_eq!(entity.body.health, 60.0);
        assert_eq!(entity.activity, Activity::Eating);
    }

    #[test]
    fn shares_food_with_starving_tribemate() {
        let mut world = world();
        let giver = spawn_smart(&mut world, Vector2::new(200.0, 200.0));
        let ally = spawn_smart(&mut world, Vector2::new(220.0, 200.0));
        give(&mut world, giver, ItemKind::Meat, 3);
        world.entity_mut(ally).expect("ally").body.energy = 20.0;
        script(&mut world, giver, Decision::Idle);
        script(&mut world, ally, Decision::Idle);
        world.step();

        let giver_meat = world
            .entity(giver)
            .and_then(|entity| entity.smart())
            .map(|state| state.inventory.count(ItemKind::Meat));
        assert_eq!(giver_meat, Some(2));
        // The ally receives one portion and eats it in its own turn.
        let ally_entity = world.entity(ally).expect("ally");
        assert!(ally_entity.body.energy > 40.0);
    }

    #[test]
    fn gathering_fills_the_pack() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(600.0, 600.0));
        let node = world.spawn_resource(ResourceKind::Tree, Vector2::new(610.0, 600.0), 120.0);
        script(
            &mut world,
            smart,
            Decision::Gather {
                resource: node,
                direction: Vector2::new(1.0, 0.0),
            },
        );
        for _ in 0..200 {
            world.step();
        }
        let wood = world
            .entity(smart)
            .and_then(|entity| entity.smart())
            .map_or(0, |state| state.inventory.count(ItemKind::Wood));
        // 199 mining ticks at 5 effort/s × 0.016 s yield 15.92 effort.
        assert_eq!(wood, 1);
        assert!(world.resource(node).expect("node").amount < 120.0);
    }

    #[test]
    fn build_pays_only_on_successful_placement() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(500.0, 500.0));
        give(&mut world, smart, ItemKind::Wood, 10);
        give(&mut world, smart, ItemKind::Stone, 4);
        world
            .place_building(BuildingKind::House, Vector2::new(505.0, 500.0), None)
            .expect("house");
        script(
            &mut world,
            smart,
            Decision::Build {
                kind: BuildingKind::Campfire,
            },
        );
        world.step();
        let wood = world
            .entity(smart)
            .and_then(|entity| entity.smart())
            .map_or(0, |state| state.inventory.count(ItemKind::Wood));
        assert_eq!(wood, 10);
        assert_eq!(world.buildings().count(), 1);
    }

    #[test]
    fn craft_and_equip_a_spear() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(500.0, 500.0));
        give(&mut world, smart, ItemKind::Wood, 3);
        give(&mut world, smart, ItemKind::Stone, 1);
        script(
            &mut world,
            smart,
            Decision::Craft {
                item: ItemKind::StoneSpear,
            },
        );
        world.step();
        assert_eq!(
            world.entity(smart).expect("smart").activity,
            Activity::Crafting
        );

        script(
            &mut world,
            smart,
            Decision::Equip {
                item: ItemKind::StoneSpear,
            },
        );
        world.step();
        let state = world
            .entity(smart)
            .and_then(|entity| entity.smart())
            .expect("smart state");
        assert_eq!(state.equipment.weapon, Some(ItemKind::StoneSpear));
        assert_eq!(state.inventory.count(ItemKind::StoneSpear), 0);
    }

    #[test]
    fn equipping_a_bag_extends_capacity() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(500.0, 500.0));
        give(&mut world, smart, ItemKind::LeatherBag, 1);
        script(
            &mut world,
            smart,
            Decision::Equip {
                item: ItemKind::LeatherBag,
            },
        );
        world.step();
        let state = world
            .entity(smart)
            .and_then(|entity| entity.smart())
            .expect("smart state");
        assert_eq!(state.inventory.max_capacity(), 85.0);
    }

    #[test]
    fn unbound_smart_eats_an_adjacent_plant() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(600.0, 600.0));
        let plant = world.spawn_plant(Vector2::new(605.0, 600.0), 100.0);
        world.step();
        let entity = world.entity(smart).expect("smart");
        assert_eq!(entity.eating, Some(plant));
        assert_eq!(entity.activity, Activity::Eating);
        assert!(world.plant(plant).expect("plant").has_consumer(smart));
    }

    #[test]
    fn unbound_smart_walks_to_a_distant_plant() {
        let mut world = world();
        let smart = spawn_smart(&mut world, Vector2::new(600.0, 600.0));
        world.spawn_plant(Vector2::new(640.0, 600.0), 100.0);
        world.step();
        let entity = world.entity(smart).expect("smart");
        assert_eq!(entity.activity, Activity::Searching);
        assert!((entity.body.velocity.x - 55.0).abs() < 1e-3);
        assert!(entity.body.velocity.y.abs() < 1e-3);
    }

    #[test]
    fn unbound_smart_turns_back_from_the_border() {
        let mut world = world();
        let west = spawn_smart(&mut world, Vector2::new(5.0, 600.0));
        let south = spawn_smart(&mut world, Vector2::new(600.0, 1190.0));
        // Edge escape outranks food right next to the creature.
        world.spawn_plant(Vector2::new(9.0, 600.0), 100.0);
        world.step();

        let west = world.entity(west).expect("west");
        assert!(west.eating.is_none());
        assert_eq!(west.activity, Activity::Searching);
        assert!(west.body.velocity.x > 49.0);
        assert!(west.body.velocity.y.abs() < 1e-3);

        let south = world.entity(south).expect("south");
        assert!(south.body.velocity.y < -49.0);
    }
}
