//! Per-species controllers run once per creature per tick.
//!
//! A controller senses, asks the bound brain (or the built-in heuristic) for a [`Decision`],
//! and applies it to the world. Decisions that reference missing, dead or out-of-range targets
//! are dropped without side effects.

mod herbivore;
mod predator;
mod smart;

use crate::{
    Activity, Decision, Entity, EntityId, PlantId, SensorSnapshot, Species, Vector2, WorldState,
};
use rand::Rng;
use tracing::trace;

/// Velocity blend applied when a brain asks to move.
const STEER_FACTOR: f32 = 0.3;
/// Furthest a creature may be from a plant it starts eating.
pub(crate) const EAT_REACH: f32 = 16.0;

/// Run the controller for `id`. Dead or missing creatures are skipped.
pub(crate) fn behave(world: &mut WorldState, id: EntityId, dt: f32) {
    let Some(species) = world
        .entities
        .get(id)
        .filter(|entity| entity.is_alive())
        .map(|entity| entity.species)
    else {
        return;
    };
    match species {
        Species::Herbivore => herbivore::behave(world, id, dt),
        Species::Predator => predator::behave(world, id, dt),
        Species::Smart => smart::behave(world, id, dt),
    }
}

/// Ask the bound brain for a decision. `None` when the creature has no brain.
fn consult_brain(world: &mut WorldState, id: EntityId, sensors: &SensorSnapshot) -> Option<Decision> {
    if !world.entities.get(id)?.brain.is_bound() {
        return None;
    }
    let view = world.entity_view(id)?;
    world.entities.get_mut(id)?.brain.decide(sensors, &view)
}

/// Nearest sighting across several species lists.
fn nearest<'a>(
    sensors: &'a SensorSnapshot,
    species: &[Species],
) -> Option<&'a crate::EntitySighting> {
    species
        .iter()
        .filter_map(|kind| sensors.creatures(*kind).first())
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Head straight along `direction` at `speed`.
fn head(entity: &mut Entity, direction: Vector2, speed: f32) {
    entity.body.velocity = direction.normalize() * speed;
}

/// Blend the current velocity toward `direction × speed`.
fn steer(entity: &mut Entity, direction: Vector2, speed: f32) {
    let target = direction.normalize() * speed;
    entity.body.velocity = entity.body.velocity.lerp(target, STEER_FACTOR);
}

fn stop(entity: &mut Entity) {
    entity.body.velocity = Vector2::ZERO;
}

/// Count down the wander timer and roll a fresh heading when it expires.
fn wander(world: &mut WorldState, id: EntityId, speed: f32, interval: (f32, f32), dt: f32) {
    let Some(entity) = world.entities.get_mut(id) else {
        return;
    };
    entity.wander_timer -= dt;
    if entity.wander_timer <= 0.0 {
        let rng = &mut world.rng;
        let heading = Vector2::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0));
        entity.body.velocity = heading.normalize() * speed;
        entity.wander_timer = rng.random_range(interval.0..=interval.1);
    }
    entity.activity = Activity::Idle;
}

/// Leave the plant this creature is feeding on, if any.
fn stop_eating(world: &mut WorldState, id: EntityId) {
    let Some(plant_id) = world
        .entities
        .get_mut(id)
        .and_then(|entity| entity.eating.take())
    else {
        return;
    };
    if let Some(plant) = world.plants.get_mut(plant_id) {
        plant.remove_consumer(id);
    }
}

/// Register as a consumer of `plant_id` if it is alive and within `reach`.
///
/// Switching plants leaves the previous one. Returns whether the creature is now feeding.
fn start_eating(world: &mut WorldState, id: EntityId, plant_id: PlantId, reach: f32) -> bool {
    let Some(position) = world.entities.get(id).map(|entity| entity.body.position) else {
        return false;
    };
    let reachable = world
        .plants
        .get(plant_id)
        .is_some_and(|plant| plant.alive && plant.position.distance_to(position) <= reach);
    if !reachable {
        return false;
    }
    let current = world.entities.get(id).and_then(|entity| entity.eating);
    if current != Some(plant_id) {
        stop_eating(world, id);
        if let Some(plant) = world.plants.get_mut(plant_id) {
            plant.add_consumer(id);
        }
    }
    if let Some(entity) = world.entities.get_mut(id) {
        entity.eating = Some(plant_id);
        stop(entity);
        entity.activity = Activity::Eating;
    }
    true
}

/// Result of a landed hit.
#[derive(Debug, Clone, Copy)]
struct Strike {
    killed: bool,
    prey: Species,
}

/// Hit `target` if it is alive, within attack range and the attacker's cooldown has elapsed.
///
/// The attacker gains `gain × damage` energy and its cooldown restarts.
fn strike(world: &mut WorldState, attacker: EntityId, target: EntityId, gain: f32) -> Option<Strike> {
    let (hunter, prey) = world.entities.get2_mut(attacker, target)?;
    let combat = hunter.combat()?;
    if !hunter.is_alive() || !prey.is_alive() || !combat.ready() {
        return None;
    }
    if hunter.body.position.distance_to(prey.body.position) >= combat.range {
        return None;
    }
    let damage = hunter.attack_damage();
    prey.receive_damage(damage);
    hunter.body.gain_energy(damage * gain);
    if let Some(combat) = hunter.combat_mut() {
        combat.timer = combat.cooldown;
    }
    hunter.activity = Activity::Attacking;
    let killed = !prey.is_alive();
    if killed {
        trace!(
            attacker = ?attacker,
            target = ?target,
            hunter = %hunter.species,
            prey = %prey.species,
            damage,
            "kill"
        );
    }
    Some(Strike {
        killed,
        prey: prey.species,
    })
}

/// Breed if eligible, queueing the offspring for the end of the entity pass.
pub(crate) fn try_reproduce(world: &mut WorldState, id: EntityId) {
    let Some(parent) = world.entities.get_mut(id) else {
        return;
    };
    if !parent.can_reproduce() {
        return;
    }
    let tuning = world.config.species(parent.species);
    let cost = parent.body.max_energy * tuning.reproduction_cost_fraction;
    parent.body.spend_energy(cost);
    parent.reproduction.cooldown = tuning.reproduction_cooldown;

    let jitter = tuning.offspring_jitter;
    let offset = Vector2::new(
        world.rng.random_range(-jitter..=jitter),
        world.rng.random_range(-jitter..=jitter),
    );
    let position = world.config.clamp(parent.body.position + offset);
    let mut child = Entity::new(parent.species, position, &world.config);
    child.body.energy = (cost * tuning.offspring_energy_fraction).min(child.body.max_energy);
    child.body.alive = child.body.energy > 0.0;
    child.reproduction.threshold = parent.reproduction.threshold;
    child.brain = parent.brain.offspring(&world.brain_registry, &mut world.rng);

    if let (Some(parent_state), Some(child_state)) = (parent.smart_mut(), child.smart_mut()) {
        child_state.tribe = parent_state.tribe;
        if parent_state.inventory.remove(crate::ItemKind::Meat, smart::OFFSPRING_MEAT) {
            child_state
                .inventory
                .add(crate::ItemKind::Meat, smart::OFFSPRING_MEAT);
        }
    }
    world.pending_spawns.push(child);
}
