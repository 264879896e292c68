use super::{EAT_REACH, consult_brain, head, nearest, start_eating, steer, stop, stop_eating, wander};
use crate::{Activity, Decision, EntityId, SensorSnapshot, Species, WorldState};

/// An ongoing panic is held at least this long while a threat lingers inside the exit distance.
const PANIC_HOLD: f32 = 0.5;
const EAT_DISTANCE: f32 = 12.0;
const FORAGE_SPEED: f32 = 50.0;
const WANDER_SPEED: f32 = 25.0;
const WANDER_INTERVAL: (f32, f32) = (2.0, 5.0);
const THREATS: [Species; 2] = [Species::Predator, Species::Smart];

pub(super) fn behave(world: &mut WorldState, id: EntityId, dt: f32) {
    let Some(sensors) = world.sense(id) else {
        return;
    };
    let threat = nearest(&sensors, &THREATS).copied();
    let panic = world.config.panic.clone();

    let Some(entity) = world.entities.get_mut(id) else {
        return;
    };
    let energy = entity.body.energy;
    let Some(state) = entity.herbivore_mut() else {
        return;
    };
    state.no_eat_timer = (state.no_eat_timer - dt).max(0.0);
    let alert = energy > panic.min_energy;
    match threat {
        Some(threat) if alert && threat.distance <= state.panic_enter_distance => {
            state.panic_timer = state.panic_min_duration;
        }
        Some(threat)
            if alert
                && state.panic_timer > 0.0
                && threat.distance <= state.panic_exit_distance =>
        {
            state.panic_timer = state.panic_timer.max(PANIC_HOLD);
        }
        _ => state.panic_timer = (state.panic_timer - dt).max(0.0),
    }
    let panicking = state.panic_timer > 0.0 && alert;
    let flee = threat.filter(|_| panicking).map(|threat| Decision::Flee {
        direction: -threat.direction,
        speed: panic.flee_speed,
    });

    if entity.brain.is_bound() {
        let decision = match flee {
            Some(decision) => decision,
            None => consult_brain(world, id, &sensors).unwrap_or_default(),
        };
        execute(world, id, decision, dt);
        return;
    }

    heuristic(world, id, &sensors, flee, dt);
}

fn heuristic(
    world: &mut WorldState,
    id: EntityId,
    sensors: &SensorSnapshot,
    flee: Option<Decision>,
    dt: f32,
) {
    if let Some(Decision::Flee { direction, speed }) = flee {
        stop_eating(world, id);
        if let Some(entity) = world.entities.get_mut(id) {
            head(entity, direction, speed);
            entity.activity = Activity::Fleeing;
        }
        return;
    }

    if let Some(plant) = sensors.nearby_plants.first() {
        if plant.distance < EAT_DISTANCE {
            if start_eating(world, id, plant.id, EAT_DISTANCE) {
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
    let no_eat_after_flee = world.config.panic.no_eat_after_flee;
    match decision {
        Decision::Flee { direction, speed } => {
            stop_eating(world, id);
            let Some(entity) = world.entities.get_mut(id) else {
                return;
            };
            entity.body.velocity = direction * speed;
            entity.activity = Activity::Fleeing;
            if let Some(state) = entity.herbivore_mut() {
                state.no_eat_timer = state.no_eat_timer.max(no_eat_after_flee);
            }
        }
        Decision::Eat { plant, .. } => {
            let locked_out = world
                .entities
                .get(id)
                .and_then(|entity| match &entity.state {
                    crate::SpeciesState::Herbivore(state) => Some(state.no_eat_timer > 0.0),
                    _ => None,
                })
                .unwrap_or(true);
            if !locked_out {
                start_eating(world, id, plant, EAT_REACH);
            }
        }
        Decision::Move { direction, speed } => {
            stop_eating(world, id);
            if let Some(entity) = world.entities.get_mut(id) {
                steer(entity, direction, speed);
                entity.activity = Activity::Searching;
            }
        }
        Decision::Wander { speed } => {
            stop_eating(world, id);
            wander(world, id, speed, WANDER_INTERVAL, dt);
        }
        Decision::Idle => {
            if let Some(entity) = world.entities.get_mut(id) {
                stop(entity);
                if entity.eating.is_none() {
                    entity.activity = Activity::Idle;
                }
            }
        }
        Decision::Attack { .. }
        | Decision::Gather { .. }
        | Decision::Craft { .. }
        | Decision::Build { .. }
        | Decision::Equip { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Activity, BrainBinding, BrainRunner, Decision, EntityId, EntityView, SensorSnapshot,
        Species, Vector2, WorldConfig, WorldState,
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
            rng_seed: Some(5),
            ..WorldConfig::default()
        })
        .expect("world")
    }

    #[test]
    fn grazes_on_nearby_plant() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        let plant = world.spawn_plant(Vector2::new(305.0, 300.0), 100.0);
        world.step();
        let entity = world.entity(grazer).expect("grazer");
        assert_eq!(entity.eating, Some(plant));
        assert_eq!(entity.activity, Activity::Eating);
        assert!(world.plant(plant).expect("plant").has_consumer(grazer));
    }

    #[test]
    fn panics_when_a_predator_closes_in() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        world.spawn_entity(Species::Predator, Vector2::new(330.0, 300.0));
        world.step();
        let entity = world.entity(grazer).expect("grazer");
        assert_eq!(entity.activity, Activity::Fleeing);
        assert!(entity.body.velocity.x < 0.0);
    }

    fn panic_timer(world: &WorldState, id: EntityId) -> f32 {
        world
            .entity(id)
            .and_then(|entity| entity.herbivore())
            .expect("herbivore")
            .panic_timer
    }

    fn set_panic_timer(world: &mut WorldState, id: EntityId, timer: f32) {
        world
            .entity_mut(id)
            .and_then(|entity| entity.herbivore_mut())
            .expect("herbivore")
            .panic_timer = timer;
    }

    #[test]
    fn calm_grazer_ignores_a_threat_outside_the_enter_distance() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        world.spawn_entity(Species::Predator, Vector2::new(345.0, 300.0));
        world.step();
        let entity = world.entity(grazer).expect("grazer");
        assert_ne!(entity.activity, Activity::Fleeing);
        assert_eq!(panic_timer(&world, grazer), 0.0);
    }

    #[test]
    fn ongoing_panic_is_held_between_enter_and_exit_distance() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        world.spawn_entity(Species::Predator, Vector2::new(345.0, 300.0));
        set_panic_timer(&mut world, grazer, 0.01);
        world.step();
        let entity = world.entity(grazer).expect("grazer");
        assert_eq!(entity.activity, Activity::Fleeing);
        assert!(entity.body.velocity.x < 0.0);
        assert_eq!(panic_timer(&world, grazer), super::PANIC_HOLD);
    }

    #[test]
    fn panic_ends_once_the_threat_is_past_the_exit_distance() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        world.spawn_entity(Species::Predator, Vector2::new(356.0, 300.0));
        set_panic_timer(&mut world, grazer, 0.01);
        world.step();
        assert_eq!(panic_timer(&world, grazer), 0.0);
        assert_ne!(world.entity(grazer).expect("grazer").activity, Activity::Fleeing);
    }

    #[test]
    fn brain_eat_is_refused_after_fleeing() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        let plant = world.spawn_plant(Vector2::new(305.0, 300.0), 100.0);
        world
            .entity_mut(grazer)
            .expect("grazer")
            .brain = BrainBinding::with_runner(Box::new(Scripted(Decision::Flee {
            direction: Vector2::new(0.0, 1.0),
            speed: 10.0,
        })));
        world.step();
        world
            .entity_mut(grazer)
            .expect("grazer")
            .brain = BrainBinding::with_runner(Box::new(Scripted(Decision::Eat {
            plant,
            direction: Vector2::new(1.0, 0.0),
        })));
        world.step();
        assert!(world.entity(grazer).expect("grazer").eating.is_none());
    }

    #[test]
    fn brain_eat_out_of_reach_is_ignored() {
        let mut world = world();
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(300.0, 300.0));
        let plant = world.spawn_plant(Vector2::new(340.0, 300.0), 100.0);
        world
            .entity_mut(grazer)
            .expect("grazer")
            .brain = BrainBinding::with_runner(Box::new(Scripted(Decision::Eat {
            plant,
            direction: Vector2::new(1.0, 0.0),
        })));
        world.step();
        assert!(world.entity(grazer).expect("grazer").eating.is_none());
        assert_eq!(world.plant(plant).expect("plant").consumer_count(), 0);
    }
}
