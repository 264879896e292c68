//! Read-only sensory snapshots handed to brains.

use crate::{
    BuildingId, BuildingKind, EntityId, Equipment, ItemKind, PlantId, ResourceId, ResourceKind,
    Species, Vector2, WorldState,
};
use serde::{Deserialize, Serialize};

// Objects closer than this get a zero heading.
const MIN_HEADING_DISTANCE: f32 = 1e-3;

fn heading(from: Vector2, to: Vector2, distance: f32) -> Vector2 {
    if distance > MIN_HEADING_DISTANCE {
        (to - from) / distance
    } else {
        Vector2::ZERO
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlantSighting {
    pub id: PlantId,
    pub distance: f32,
    pub direction: Vector2,
    pub energy: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EntitySighting {
    pub id: EntityId,
    pub distance: f32,
    pub direction: Vector2,
    pub velocity: Vector2,
    pub energy: f32,
    pub species: Species,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourceSighting {
    pub id: ResourceId,
    pub distance: f32,
    pub direction: Vector2,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BuildingSighting {
    pub id: BuildingId,
    pub distance: f32,
    pub direction: Vector2,
    pub kind: BuildingKind,
    pub owner: Option<EntityId>,
    pub health_ratio: f32,
}

/// Everything a creature perceives this tick, each list nearest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorSnapshot {
    pub nearby_plants: Vec<PlantSighting>,
    pub nearby_herbivores: Vec<EntitySighting>,
    pub nearby_predators: Vec<EntitySighting>,
    pub nearby_smarts: Vec<EntitySighting>,
    pub nearby_resources: Vec<ResourceSighting>,
    pub nearby_buildings: Vec<BuildingSighting>,
    pub world_width: f32,
    pub world_height: f32,
    pub self_energy: f32,
}

impl SensorSnapshot {
    /// Sightings of one species.
    #[must_use]
    pub fn creatures(&self, species: Species) -> &[EntitySighting] {
        match species {
            Species::Herbivore => &self.nearby_herbivores,
            Species::Predator => &self.nearby_predators,
            Species::Smart => &self.nearby_smarts,
        }
    }
}

/// Read-only projection of the deciding creature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub species: Species,
    pub position: Vector2,
    pub velocity: Vector2,
    /// Top speed at the current energy level.
    pub max_speed: f32,
    pub base_max_speed: f32,
    pub energy: f32,
    pub max_energy: f32,
    pub health: f32,
    pub max_health: f32,
    pub age: f32,
    pub vision_range: f32,
    pub attack_range: f32,
    pub attack_ready: bool,
    pub panic_enter_distance: f32,
    pub panic_exit_distance: f32,
    pub tribe: Option<u32>,
    pub inventory: Vec<(ItemKind, u32)>,
    pub equipment: Equipment,
}

impl EntityView {
    #[must_use]
    pub fn energy_ratio(&self) -> f32 {
        if self.max_energy <= 0.0 {
            0.0
        } else {
            self.energy / self.max_energy
        }
    }

    #[must_use]
    pub fn item_count(&self, kind: ItemKind) -> u32 {
        self.inventory
            .iter()
            .find(|(item, _)| *item == kind)
            .map_or(0, |(_, count)| *count)
    }
}

impl WorldState {
    /// Brain-facing projection of a creature.
    #[must_use]
    pub fn entity_view(&self, id: EntityId) -> Option<EntityView> {
        let entity = self.entities.get(id)?;
        let body = &entity.body;
        let (panic_enter_distance, panic_exit_distance) = match &entity.state {
            crate::SpeciesState::Herbivore(state) => {
                (state.panic_enter_distance, state.panic_exit_distance)
            }
            _ => (0.0, 0.0),
        };
        let (inventory, equipment) = entity.smart().map_or_else(
            || (Vec::new(), Equipment::default()),
            |smart| (smart.inventory.contents().collect(), smart.equipment),
        );
        Some(EntityView {
            id,
            species: entity.species,
            position: body.position,
            velocity: body.velocity,
            max_speed: body.effective_max_speed(),
            base_max_speed: body.base_max_speed,
            energy: body.energy,
            max_energy: body.max_energy,
            health: body.health,
            max_health: body.max_health,
            age: body.age,
            vision_range: body.vision_range,
            attack_range: entity.combat().map_or(0.0, |combat| combat.range),
            attack_ready: entity.combat().is_some_and(|combat| combat.ready()),
            panic_enter_distance,
            panic_exit_distance,
            tribe: entity.tribe(),
            inventory,
            equipment,
        })
    }

    /// Collect everything strictly inside the creature's vision range.
    ///
    /// Returns `None` for unknown ids. Dead creatures and exhausted plants or nodes are skipped.
    #[must_use]
    pub fn sense(&self, id: EntityId) -> Option<SensorSnapshot> {
        let entity = self.entities.get(id)?;
        let origin = entity.body.position;
        let range = entity.body.vision_range;
        let mut snapshot = SensorSnapshot {
            world_width: self.config.world_width,
            world_height: self.config.world_height,
            self_energy: entity.body.energy,
            ..SensorSnapshot::default()
        };

        for (plant_id, distance) in self.plant_grid.query_radius(origin.as_tuple(), range) {
            if distance >= range {
                continue;
            }
            let Some(plant) = self.plants.get(plant_id).filter(|plant| plant.alive) else {
                continue;
            };
            snapshot.nearby_plants.push(PlantSighting {
                id: plant_id,
                distance,
                direction: heading(origin, plant.position, distance),
                energy: plant.energy,
            });
        }

        for (other_id, distance) in self.entity_grid.query_radius(origin.as_tuple(), range) {
            if other_id == id || distance >= range {
                continue;
            }
            let Some(other) = self.entities.get(other_id).filter(|other| other.is_alive()) else {
                continue;
            };
            let sighting = EntitySighting {
                id: other_id,
                distance,
                direction: heading(origin, other.body.position, distance),
                velocity: other.body.velocity,
                energy: other.body.energy,
                species: other.species,
            };
            match other.species {
                Species::Herbivore => snapshot.nearby_herbivores.push(sighting),
                Species::Predator => snapshot.nearby_predators.push(sighting),
                Species::Smart => snapshot.nearby_smarts.push(sighting),
            }
        }

        for (resource_id, distance) in self.resource_grid.query_radius(origin.as_tuple(), range) {
            if distance >= range {
                continue;
            }
            let Some(node) = self.resources.get(resource_id).filter(|node| node.alive) else {
                continue;
            };
            snapshot.nearby_resources.push(ResourceSighting {
                id: resource_id,
                distance,
                direction: heading(origin, node.position, distance),
                kind: node.kind,
            });
        }

        let range_sq = range * range;
        for (building_id, building) in &self.buildings {
            if building.is_destroyed() {
                continue;
            }
            let distance_sq = origin.distance_squared_to(building.position);
            if distance_sq >= range_sq {
                continue;
            }
            let distance = distance_sq.sqrt();
            snapshot.nearby_buildings.push(BuildingSighting {
                id: building_id,
                distance,
                direction: heading(origin, building.position, distance),
                kind: building.kind,
                owner: building.owner,
                health_ratio: building.health_ratio(),
            });
        }
        snapshot
            .nearby_buildings
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Some(snapshot)
    }
}
