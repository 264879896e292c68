use super::{consult_brain, head, nearest, steer, stop, strike, wander};
use crate::{Activity, Decision, EntityId, SensorSnapshot, Species, WorldState};

/// Energy gained per point of damage dealt.
const FEED_RATIO: f32 = 1.5;
const CHASE_SPEED: f32 = 85.0;
const RETREAT_SPEED: f32 = 75.0;
/// Rivals with this much more energy are avoided.
const RIVAL_MARGIN: f32 = 1.2;
const WANDER_SPEED: f32 = 35.0;
const WANDER_INTERVAL: (f32, f32) = (3.0, 8.0);
const PREY: [Species; 2] = [Species::Herbivore, Species::Smart];

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
    if let Some(decision) = consult_brain(world, id, &sensors) {
        execute(world, id, decision, dt);
        return;
    }
    heuristic(world, id, &sensors, dt);
}

fn heuristic(world: &mut WorldState, id: EntityId, sensors: &SensorSnapshot, dt: f32) {
    let Some((energy, range)) = world
        .entities
        .get(id)
        .and_then(|entity| Some((entity.body.energy, entity.combat()?.range)))
    else {
        return;
    };

    if let Some(prey) = nearest(sensors, &PREY) {
        if prey.distance < range {
            strike(world, id, prey.id, FEED_RATIO);
        } else if let Some(entity) = world.entities.get_mut(id) {
            head(entity, prey.direction, CHASE_SPEED);
            entity.activity = Activity::Hunting;
        }
        return;
    }

    let rival = sensors
        .nearby_predators
        .iter()
        .find(|rival| rival.energy > energy * RIVAL_MARGIN);
    if let Some(rival) = rival {
        if let Some(entity) = world.entities.get_mut(id) {
            head(entity, -rival.direction, RETREAT_SPEED);
            entity.activity = Activity::Fleeing;
        }
        return;
    }

    wander(world, id, WANDER_SPEED, WANDER_INTERVAL, dt);
}

fn execute(world: &mut WorldState, id: EntityId, decision: Decision, dt: f32) {
    match decision {
        Decision::Attack { target, .. } => {
            strike(world, id, target, FEED_RATIO);
        }
        Decision::Flee { direction, speed } => {
            if let Some(entity) = world.entities.get_mut(id) {
                entity.body.velocity = direction * speed;
                entity.activity = Activity::Fleeing;
            }
        }
        Decision::Move { direction, speed } => {
            let Some(entity) = world.entities.get_mut(id) else {
                return;
            };
            steer(entity, direction, speed);
            entity.activity = Activity::Hunting;
            let Some(combat) = entity.combat().copied().filter(|combat| combat.ready()) else {
                return;
            };
            let origin = entity.body.position;
            let target = world
                .entities_in_radius(origin, combat.range)
                .into_iter()
                .find(|(other, distance)| {
                    *other != id
                        && *distance < combat.range
                        && world
                            .entities
                            .get(*other)
                            .is_some_and(|prey| prey.is_alive() && PREY.contains(&prey.species))
                })
                .map(|(other, _)| other);
            if let Some(target) = target {
                strike(world, id, target, FEED_RATIO);
            }
        }
        Decision::Wander { speed } => wander(world, id, speed, WANDER_INTERVAL, dt),
        Decision::Idle => {
            if let Some(entity) = world.entities.get_mut(id) {
                stop(entity);
                entity.activity = Activity::Idle;
            }
        }
        Decision::Eat { .. }
        | Decision::Gather { .. }
        | Decision::Craft { .. }
        | Decision::Build { .. }
        | Decision::Equip { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Activity, BrainBinding, BrainRunner, Decision, EntityView, SensorSnapshot, Species,
        Vector2, WorldConfig, WorldState,
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
            rng_seed: Some(9),
            ..WorldConfig::default()
        })
        .expect("world")
    }

    #[test]
    fn strikes_prey_in_range_and_feeds() {
        let mut world = world();
        let hunter = world.spawn_entity(Species::Predator, Vector2::new(400.0, 400.0));
        let prey = world.spawn_entity(Species::Herbivore, Vector2::new(405.0, 400.0));
        world.entity_mut(hunter).expect("hunter").body.energy = 100.0;
        world.step();

        let hunter_state = world.entity(hunter).expect("hunter");
        assert_eq!(hunter_state.activity, Activity::Attacking);
        assert!(hunter_state.body.energy > 100.0);
        let prey_health = world
            .entity(prey)
            .map_or(0.0, |entity| entity.body.health);
        assert!(prey_health < 100.0);
    }

    #[test]
    fn chases_distant_prey() {
        let mut world = world();
        let hunter = world.spawn_entity(Species::Predator, Vector2::new(400.0, 400.0));
        world.spawn_entity(Species::Herbivore, Vector2::new(400.0, 500.0));
        world.step();
        let entity = world.entity(hunter).expect("hunter");
        assert_eq!(entity.activity, Activity::Hunting);
        assert!(entity.body.velocity.y > 0.0);
    }

    #[test]
    fn brain_move_auto_attacks_adjacent_prey() {
        let mut world = world();
        let hunter = world.spawn_entity(Species::Predator, Vector2::new(400.0, 400.0));
        let prey = world.spawn_entity(Species::Herbivore, Vector2::new(400.0, 406.0));
        world
            .entity_mut(hunter)
            .expect("hunter")
            .brain = BrainBinding::with_runner(Box::new(Scripted(Decision::Move {
            direction: Vector2::new(1.0, 0.0),
            speed: 50.0,
        })));
        world.step();
        let prey_health = world
            .entity(prey)
            .map_or(0.0, |entity| entity.body.health);
        assert!(prey_health < 100.0);
        assert_eq!(
            world.entity(hunter).expect("hunter").activity,
            Activity::Attacking
        );
    }

    #[test]
    fn brain_attack_out_of_range_is_a_no_op() {
        let mut world = world();
        let hunter = world.spawn_entity(Species::Predator, Vector2::new(400.0, 400.0));
        let prey = world.spawn_entity(Species::Herbivore, Vector2::new(400.0, 460.0));
        world
            .entity_mut(hunter)
            .expect("hunter")
            .brain = BrainBinding::with_runner(Box::new(Scripted(Decision::Attack {
            target: prey,
            direction: Vector2::new(0.0, 1.0),
        })));
        world.step();
        assert_eq!(world.entity(prey).expect("prey").body.health, 100.0);
    }
}
