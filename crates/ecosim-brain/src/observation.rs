//! Fixed-width observation vectors for neural policies.
//!
//! Layout (all values clipped to `[-1, 1]`, missing slots left at zero):
//!
//! | offset | width | content |
//! |---|---|---|
//! | 0 | 5 | energy ratio, velocity / max speed, position mapped to `[-1, 1]` |
//! | 5 | 5 × 4 | plants: distance, heading x, heading y, energy |
//! | 25 | 3 × 6 | prey: distance, heading, energy, velocity |
//! | 43 | 3 × 6 | threats: same as prey |
//! | 61 | 8 | smart only: carried item levels |
//! | 69 | 3 | smart only: weapon, tool and armor tier |
//! | 72 | 5 × 4 | smart only: deposits with type code |
//! | 92 | 3 × 6 | smart only: buildings with type code, ownership and health |

use ecosim_core::{
    EntitySighting, EntityView, Equipment, ItemKind, SensorSnapshot, Species,
};

pub const MAX_PLANTS: usize = 5;
pub const MAX_PREY: usize = 3;
pub const MAX_THREATS: usize = 3;
pub const MAX_RESOURCES: usize = 5;
pub const MAX_BUILDINGS: usize = 3;

const SELF_WIDTH: usize = 5;
const PLANT_WIDTH: usize = 4;
const CREATURE_WIDTH: usize = 6;
const RESOURCE_WIDTH: usize = 4;
const BUILDING_WIDTH: usize = 6;

const DISTANCE_SCALE: f32 = 200.0;
const ENERGY_SCALE: f32 = 200.0;
const VELOCITY_SCALE: f32 = 100.0;
const STACK_SCALE: f32 = 20.0;

/// Carried items reported to smart policies, in slot order.
pub const INVENTORY_ITEMS: [ItemKind; 8] = [
    ItemKind::Wood,
    ItemKind::Stone,
    ItemKind::CopperOre,
    ItemKind::IronOre,
    ItemKind::Meat,
    ItemKind::Leather,
    ItemKind::CopperIngot,
    ItemKind::IronIngot,
];

pub const BASE_OBSERVATION_SIZE: usize = SELF_WIDTH
    + MAX_PLANTS * PLANT_WIDTH
    + MAX_PREY * CREATURE_WIDTH
    + MAX_THREATS * CREATURE_WIDTH;

pub const SMART_OBSERVATION_SIZE: usize = BASE_OBSERVATION_SIZE
    + INVENTORY_ITEMS.len()
    + 3
    + MAX_RESOURCES * RESOURCE_WIDTH
    + MAX_BUILDINGS * BUILDING_WIDTH;

#[must_use]
pub const fn observation_size(species: Species) -> usize {
    match species {
        Species::Smart => SMART_OBSERVATION_SIZE,
        Species::Herbivore | Species::Predator => BASE_OBSERVATION_SIZE,
    }
}

fn scaled(value: f32, scale: f32) -> f32 {
    (value / scale).min(1.0)
}

/// Merge sighting lists and keep the `limit` nearest.
fn closest<'a>(lists: &[&'a [EntitySighting]], limit: usize) -> Vec<&'a EntitySighting> {
    let mut merged: Vec<&EntitySighting> = lists.iter().flat_map(|list| list.iter()).collect();
    merged.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    merged.truncate(limit);
    merged
}

fn push_creatures(out: &mut Vec<f32>, sightings: &[&EntitySighting], slots: usize) {
    for slot in 0..slots {
        match sightings.get(slot) {
            Some(sighting) => out.extend([
                scaled(sighting.distance, DISTANCE_SCALE),
                sighting.direction.x,
                sighting.direction.y,
                scaled(sighting.energy, ENERGY_SCALE),
                sighting.velocity.x / VELOCITY_SCALE,
                sighting.velocity.y / VELOCITY_SCALE,
            ]),
            None => out.extend([0.0; CREATURE_WIDTH]),
        }
    }
}

fn equipment_levels(equipment: &Equipment) -> [f32; 3] {
    let level = |item: Option<ItemKind>| item.map_or(0.0, ItemKind::tier);
    [
        level(equipment.weapon),
        level(equipment.tool),
        level(equipment.armor),
    ]
}

/// Build the observation vector a `species` policy expects.
#[must_use]
pub fn encode(species: Species, sensors: &SensorSnapshot, entity: &EntityView) -> Vec<f32> {
    let mut out = Vec::with_capacity(observation_size(species));

    let speed_norm = entity.max_speed.max(1.0);
    let width = sensors.world_width.max(1.0);
    let height = sensors.world_height.max(1.0);
    out.extend([
        entity.energy_ratio(),
        entity.velocity.x / speed_norm,
        entity.velocity.y / speed_norm,
        entity.position.x / width * 2.0 - 1.0,
        entity.position.y / height * 2.0 - 1.0,
    ]);

    let mut plants: Vec<_> = sensors.nearby_plants.iter().collect();
    plants.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    for slot in 0..MAX_PLANTS {
        match plants.get(slot) {
            Some(plant) => out.extend([
                scaled(plant.distance, DISTANCE_SCALE),
                plant.direction.x,
                plant.direction.y,
                scaled(plant.energy, ENERGY_SCALE),
            ]),
            None => out.extend([0.0; PLANT_WIDTH]),
        }
    }

    let (prey, threats) = match species {
        Species::Herbivore => (
            closest(&[&sensors.nearby_herbivores], MAX_PREY),
            closest(&[&sensors.nearby_predators, &sensors.nearby_smarts], MAX_THREATS),
        ),
        Species::Predator => (
            closest(&[&sensors.nearby_herbivores, &sensors.nearby_smarts], MAX_PREY),
            closest(&[&sensors.nearby_predators], MAX_THREATS),
        ),
        Species::Smart => (
            closest(&[&sensors.nearby_herbivores], MAX_PREY),
            closest(&[&sensors.nearby_predators], MAX_THREATS),
        ),
    };
    push_creatures(&mut out, &prey, MAX_PREY);
    push_creatures(&mut out, &threats, MAX_THREATS);

    if species == Species::Smart {
        out.extend(
            INVENTORY_ITEMS
                .iter()
                .map(|item| scaled(entity.item_count(*item) as f32, STACK_SCALE)),
        );
        out.extend(equipment_levels(&entity.equipment));

        for slot in 0..MAX_RESOURCES {
            match sensors.nearby_resources.get(slot) {
                Some(node) => out.extend([
                    scaled(node.distance, DISTANCE_SCALE),
                    node.direction.x,
                    node.direction.y,
                    node.kind.code(),
                ]),
                None => out.extend([0.0; RESOURCE_WIDTH]),
            }
        }
        for slot in 0..MAX_BUILDINGS {
            match sensors.nearby_buildings.get(slot) {
                Some(building) => out.extend([
                    scaled(building.distance, DISTANCE_SCALE),
                    building.direction.x,
                    building.direction.y,
                    building.kind.code(),
                    if building.owner == Some(entity.id) { 1.0 } else { 0.0 },
                    building.health_ratio,
                ]),
                None => out.extend([0.0; BUILDING_WIDTH]),
            }
        }
    }

    for value in &mut out {
        *value = value.clamp(-1.0, 1.0);
    }
    out
}
