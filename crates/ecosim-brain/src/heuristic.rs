//! Rule-based brains mirroring the built-in species behaviour.

use crate::{Brain, BrainKind, into_runner};
use ecosim_core::{
    BrainRunner, Decision, EntitySighting, EntityView, PlantSighting, SensorSnapshot, Species,
    Vector2, WorldState,
};

/// Plants closer than this are eaten rather than approached.
const EAT_DISTANCE: f32 = 12.0;
/// Below this energy a creature is too tired to run.
const FLEE_MIN_ENERGY: f32 = 20.0;

fn nearest_of<'a>(lists: &[&'a [EntitySighting]]) -> Option<&'a EntitySighting> {
    lists
        .iter()
        .flat_map(|list| list.iter())
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn nearest_plant(sensors: &SensorSnapshot) -> Option<&PlantSighting> {
    sensors
        .nearby_plants
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn away_from(sighting: &EntitySighting) -> Vector2 {
    (-sighting.direction).normalize()
}

fn forage(sensors: &SensorSnapshot, approach_speed: f32) -> Option<Decision> {
    let plant = nearest_plant(sensors)?;
    Some(if plant.distance < EAT_DISTANCE {
        Decision::Eat {
            plant: plant.id,
            direction: plant.direction,
        }
    } else {
        Decision::Move {
            direction: plant.direction,
            speed: approach_speed,
        }
    })
}

/// Flee threats, graze, wander.
#[derive(Debug, Clone, Copy, Default)]
pub struct HerbivoreHeuristic;

impl HerbivoreHeuristic {
    pub const KIND: BrainKind = BrainKind::new("heuristic.herbivore");

    #[must_use]
    pub fn runner() -> Box<dyn BrainRunner> {
        into_runner(Self)
    }
}

impl Brain for HerbivoreHeuristic {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision {
        let reach = if entity.panic_enter_distance > 0.0 {
            entity.panic_enter_distance
        } else {
            f32::INFINITY
        };
        if let Some(threat) = nearest_of(&[&sensors.nearby_predators, &sensors.nearby_smarts]) {
            if threat.distance <= reach && entity.energy > FLEE_MIN_ENERGY {
                return Decision::Flee {
                    direction: away_from(threat),
                    speed: 65.0,
                };
            }
        }
        forage(sensors, 50.0).unwrap_or(Decision::Wander { speed: 25.0 })
    }

    fn offspring(&self) -> Option<Self> {
        Some(Self)
    }
}

/// Hunt herbivores and smarts, avoid stronger rivals, wander.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredatorHeuristic;

impl PredatorHeuristic {
    pub const KIND: BrainKind = BrainKind::new("heuristic.predator");
    /// Rivals this much stronger are avoided.
    const RIVAL_MARGIN: f32 = 1.2;

    #[must_use]
    pub fn runner() -> Box<dyn BrainRunner> {
        into_runner(Self)
    }
}

impl Brain for PredatorHeuristic {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision {
        if let Some(prey) = nearest_of(&[&sensors.nearby_herbivores, &sensors.nearby_smarts]) {
            // Cooldown is left to the controller.
            if prey.distance < entity.attack_range {
                return Decision::Attack {
                    target: prey.id,
                    direction: prey.direction,
                };
            }
            return Decision::Move {
                direction: prey.direction,
                speed: 85.0,
            };
        }
        let rival = sensors
            .nearby_predators
            .iter()
            .filter(|other| other.energy > entity.energy * Self::RIVAL_MARGIN)
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        match rival {
            Some(rival) => Decision::Flee {
                direction: away_from(rival),
                speed: 75.0,
            },
            None => Decision::Wander { speed: 35.0 },
        }
    }

    fn offspring(&self) -> Option<Self> {
        Some(Self)
    }
}

/// Stay inside the map, dodge close predators, hunt, graze, wander.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartHeuristic;

impl SmartHeuristic {
    pub const KIND: BrainKind = BrainKind::new("heuristic.smart");
    const EDGE_MARGIN: f32 = 50.0;
    const DANGER_DISTANCE: f32 = 22.0;

    #[must_use]
    pub fn runner() -> Box<dyn BrainRunner> {
        into_runner(Self)
    }
}

impl Brain for SmartHeuristic {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision {
        let (width, height) = (sensors.world_width, sensors.world_height);
        let position = entity.position;
        let margin = Self::EDGE_MARGIN;
        if position.x < margin
            || position.x > width - margin
            || position.y < margin
            || position.y > height - margin
        {
            let centre = Vector2::new(width / 2.0, height / 2.0);
            return Decision::Move {
                direction: (centre - position).normalize(),
                speed: 50.0,
            };
        }

        if let Some(predator) = nearest_of(&[&sensors.nearby_predators]) {
            if predator.distance < Self::DANGER_DISTANCE && entity.energy > FLEE_MIN_ENERGY {
                return Decision::Flee {
                    direction: away_from(predator),
                    speed: 80.0,
                };
            }
        }

        if let Some(prey) = nearest_of(&[&sensors.nearby_herbivores]) {
            if prey.distance < entity.attack_range {
                return Decision::Attack {
                    target: prey.id,
                    direction: prey.direction,
                };
            }
            return Decision::Move {
                direction: prey.direction,
                speed: 78.0,
            };
        }

        forage(sensors, 55.0).unwrap_or(Decision::Wander { speed: 30.0 })
    }

    fn offspring(&self) -> Option<Self> {
        Some(Self)
    }
}

/// Register the heuristic for `species` and return its registry key.
pub fn register_heuristic(world: &mut WorldState, species: Species) -> u64 {
    let registry = world.brain_registry_mut();
    match species {
        Species::Herbivore => registry.register(HerbivoreHeuristic::KIND.as_str(), |_rng| {
            HerbivoreHeuristic::runner()
        }),
        Species::Predator => registry.register(PredatorHeuristic::KIND.as_str(), |_rng| {
            PredatorHeuristic::runner()
        }),
        Species::Smart => {
            registry.register(SmartHeuristic::KIND.as_str(), |_rng| SmartHeuristic::runner())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sighting, view};
    use ecosim_core::{EntityId, PlantId, WorldConfig};
    use slotmap::SlotMap;

    fn ids<K: slotmap::Key>(count: usize) -> Vec<K> {
        let mut map = SlotMap::<K, ()>::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    fn plant(id: PlantId, distance: f32, direction: Vector2) -> PlantSighting {
        PlantSighting {
            id,
            distance,
            direction,
            energy: 60.0,
        }
    }

    #[test]
    fn herbivore_flees_a_close_predator() {
        let id = ids::<EntityId>(1)[0];
        let sensors = SensorSnapshot {
            nearby_predators: vec![sighting(
                id,
                Species::Predator,
                10.0,
                Vector2::new(1.0, 0.0),
                50.0,
            )],
            ..SensorSnapshot::default()
        };
        let decision = HerbivoreHeuristic.decide(&sensors, &view(Species::Herbivore));
        assert_eq!(
            decision,
            Decision::Flee {
                direction: Vector2::new(-1.0, 0.0),
                speed: 65.0,
            }
        );
    }

    #[test]
    fn exhausted_herbivore_keeps_grazing() {
        let entity_ids = ids::<EntityId>(1);
        let plant_ids = ids::<PlantId>(1);
        let sensors = SensorSnapshot {
            nearby_smarts: vec![sighting(
                entity_ids[0],
                Species::Smart,
                5.0,
                Vector2::new(0.0, 1.0),
                80.0,
            )],
            nearby_plants: vec![plant(plant_ids[0], 8.0, Vector2::new(1.0, 0.0))],
            ..SensorSnapshot::default()
        };
        let mut tired = view(Species::Herbivore);
        tired.energy = 15.0;
        let decision = HerbivoreHeuristic.decide(&sensors, &tired);
        assert_eq!(
            decision,
            Decision::Eat {
                plant: plant_ids[0],
                direction: Vector2::new(1.0, 0.0),
            }
        );
    }

    #[test]
    fn herbivore_ignores_threats_beyond_panic_range() {
        let entity_ids = ids::<EntityId>(1);
        let plant_ids = ids::<PlantId>(1);
        let sensors = SensorSnapshot {
            nearby_predators: vec![sighting(
                entity_ids[0],
                Species::Predator,
                50.0,
                Vector2::new(1.0, 0.0),
                90.0,
            )],
            nearby_plants: vec![plant(plant_ids[0], 40.0, Vector2::new(0.0, -1.0))],
            ..SensorSnapshot::default()
        };
        let decision = HerbivoreHeuristic.decide(&sensors, &view(Species::Herbivore));
        assert_eq!(decision.speed(), 50.0);
        assert_eq!(decision.direction(), Some(Vector2::new(0.0, -1.0)));
        let idle = HerbivoreHeuristic.decide(&SensorSnapshot::default(), &view(Species::Herbivore));
        assert_eq!(idle, Decision::Wander { speed: 25.0 });
    }

    #[test]
    fn predator_attacks_in_range_and_chases_otherwise() {
        let entity_ids = ids::<EntityId>(2);
        let mut sensors = SensorSnapshot {
            nearby_herbivores: vec![sighting(
                entity_ids[0],
                Species::Herbivore,
                30.0,
                Vector2::new(0.0, 1.0),
                40.0,
            )],
            nearby_smarts: vec![sighting(
                entity_ids[1],
                Species::Smart,
                8.0,
                Vector2::new(1.0, 0.0),
                40.0,
            )],
            ..SensorSnapshot::default()
        };
        let hunter = view(Species::Predator);
        assert_eq!(
            PredatorHeuristic.decide(&sensors, &hunter),
            Decision::Attack {
                target: entity_ids[1],
                direction: Vector2::new(1.0, 0.0),
            }
        );
        sensors.nearby_smarts.clear();
        assert_eq!(
            PredatorHeuristic.decide(&sensors, &hunter),
            Decision::Move {
                direction: Vector2::new(0.0, 1.0),
                speed: 85.0,
            }
        );
    }

    #[test]
    fn predator_avoids_only_stronger_rivals() {
        let entity_ids = ids::<EntityId>(2);
        let hunter = view(Species::Predator);
        let weak = SensorSnapshot {
            nearby_predators: vec![sighting(
                entity_ids[0],
                Species::Predator,
                20.0,
                Vector2::new(0.0, 1.0),
                55.0,
            )],
            ..SensorSnapshot::default()
        };
        assert_eq!(
            PredatorHeuristic.decide(&weak, &hunter),
            Decision::Wander { speed: 35.0 }
        );
        let strong = SensorSnapshot {
            nearby_predators: vec![sighting(
                entity_ids[1],
                Species::Predator,
                20.0,
                Vector2::new(0.0, 1.0),
                61.0,
            )],
            ..SensorSnapshot::default()
        };
        assert_eq!(
            PredatorHeuristic.decide(&strong, &hunter),
            Decision::Flee {
                direction: Vector2::new(0.0, -1.0),
                speed: 75.0,
            }
        );
    }

    #[test]
    fn smart_heads_back_from_the_edge() {
        let sensors = SensorSnapshot {
            world_width: 1000.0,
            world_height: 1000.0,
            ..SensorSnapshot::default()
        };
        let mut entity = view(Species::Smart);
        entity.position = Vector2::new(20.0, 500.0);
        assert_eq!(
            SmartHeuristic.decide(&sensors, &entity),
            Decision::Move {
                direction: Vector2::new(1.0, 0.0),
                speed: 50.0,
            }
        );
    }

    #[test]
    fn smart_priorities() {
        let entity_ids = ids::<EntityId>(2);
        let plant_ids = ids::<PlantId>(1);
        let mut entity = view(Species::Smart);
        entity.attack_range = 10.0;
        let mut sensors = SensorSnapshot {
            world_width: 1000.0,
            world_height: 1000.0,
            nearby_predators: vec![sighting(
                entity_ids[0],
                Species::Predator,
                15.0,
                Vector2::new(1.0, 0.0),
                100.0,
            )],
            nearby_herbivores: vec![sighting(
                entity_ids[1],
                Species::Herbivore,
                40.0,
                Vector2::new(0.0, 1.0),
                30.0,
            )],
            nearby_plants: vec![plant(plant_ids[0], 20.0, Vector2::new(0.0, -1.0))],
            ..SensorSnapshot::default()
        };
        assert_eq!(SmartHeuristic.decide(&sensors, &entity).speed(), 80.0);

        sensors.nearby_predators.clear();
        assert_eq!(
            SmartHeuristic.decide(&sensors, &entity),
            Decision::Move {
                direction: Vector2::new(0.0, 1.0),
                speed: 78.0,
            }
        );

        sensors.nearby_herbivores.clear();
        assert_eq!(SmartHeuristic.decide(&sensors, &entity).speed(), 55.0);
        sensors.nearby_plants.clear();
        assert_eq!(
            SmartHeuristic.decide(&sensors, &entity),
            Decision::Wander { speed: 30.0 }
        );
    }

    #[test]
    fn registered_heuristics_bind_to_their_species() {
        let config = WorldConfig {
            rng_seed: Some(3),
            ..WorldConfig::default()
        };
        let mut world = WorldState::new(config).expect("world");
        world.spawn_entity(Species::Predator, Vector2::new(100.0, 100.0));
        world.spawn_entity(Species::Herbivore, Vector2::new(800.0, 800.0));
        let key = register_heuristic(&mut world, Species::Predator);
        assert_eq!(
            world.brain_registry().kind(key),
            Some(PredatorHeuristic::KIND.as_str())
        );
        assert_eq!(world.bind_species_brain(Species::Predator, key), 1);
    }
}
