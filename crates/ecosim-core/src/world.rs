//! The world and its tick pipeline.

use crate::config::{WorldConfig, WorldStateError};
use crate::species;
use crate::stats::WorldStats;
use crate::{
    BrainBinding, BrainRegistry, Building, BuildingId, BuildingKind, Entity, EntityArena, EntityId,
    Plant, PlantId, RecipeBook, ResourceId, ResourceKind, ResourceNode, Species, Vector2,
};
use ecosim_index::{IndexError, NeighborhoodIndex, UniformGridIndex};
use rand::{Rng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{debug, info};

/// Health restored to a house owner per interval.
const HOUSE_HEAL: f32 = 5.0;
const HOUSE_HEAL_INTERVAL: f32 = 1.0;
const FARM_INTERVAL: f32 = 10.0;
/// Closest a farm will sow to its own centre.
const FARM_MIN_DISTANCE: f32 = 2.0;

/// Simulation clock (ticks processed since creation).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(pub u64);

impl Tick {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events emitted after processing a world tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TickEvents {
    pub tick: Tick,
    pub births: usize,
    pub deaths: usize,
    /// Plants added by the respawn timer this tick.
    pub plants_respawned: usize,
    /// No herbivores, predators or smarts remain.
    pub extinct: bool,
}

/// Summary emitted to persistence hooks each tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickSummary {
    pub tick: Tick,
    /// Simulated seconds.
    pub time: f64,
    pub births: usize,
    pub deaths: usize,
    pub stats: WorldStats,
}

/// Persistence sink invoked after each tick.
pub trait WorldPersistence: Send {
    fn on_tick(&mut self, summary: &TickSummary);
}

/// No-op persistence sink.
#[derive(Debug, Default)]
pub struct NullPersistence;

impl WorldPersistence for NullPersistence {
    fn on_tick(&mut self, _summary: &TickSummary) {}
}

/// Aggregate world state: creatures, plants, deposits, buildings and their indices.
pub struct WorldState {
    pub(crate) config: WorldConfig,
    tick: Tick,
    time: f64,
    pub(crate) rng: SmallRng,
    pub(crate) entities: EntityArena,
    pub(crate) plants: SlotMap<PlantId, Plant>,
    pub(crate) resources: SlotMap<ResourceId, ResourceNode>,
    pub(crate) buildings: SlotMap<BuildingId, Building>,
    pub(crate) entity_grid: UniformGridIndex<EntityId>,
    pub(crate) plant_grid: UniformGridIndex<PlantId>,
    pub(crate) resource_grid: UniformGridIndex<ResourceId>,
    pub(crate) brain_registry: BrainRegistry,
    pub(crate) recipes: RecipeBook,
    plant_target: usize,
    plant_respawn_timer: f32,
    pub(crate) pending_spawns: Vec<Entity>,
    pending_deaths: Vec<EntityId>,
    persistence: Box<dyn WorldPersistence>,
    last_births: usize,
    last_deaths: usize,
    last_stats: WorldStats,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("time", &self.time)
            .field("entity_count", &self.entities.len())
            .field("plant_count", &self.plants.len())
            .field("resource_count", &self.resources.len())
            .field("building_count", &self.buildings.len())
            .finish()
    }
}

fn grid<K>(config: &WorldConfig) -> Result<UniformGridIndex<K>, WorldStateError>
where
    K: Copy + Eq + std::hash::Hash,
{
    UniformGridIndex::new(config.grid_cell_size, config.world_width, config.world_height).map_err(
        |error| match error {
            IndexError::InvalidConfig(reason) => WorldStateError::InvalidConfig(reason),
        },
    )
}

impl WorldState {
    /// Instantiate an empty world using the supplied configuration.
    pub fn new(config: WorldConfig) -> Result<Self, WorldStateError> {
        Self::with_persistence(config, Box::new(NullPersistence))
    }

    /// Instantiate an empty world using the supplied configuration and persistence sink.
    pub fn with_persistence(
        config: WorldConfig,
        persistence: Box<dyn WorldPersistence>,
    ) -> Result<Self, WorldStateError> {
        config.validate()?;
        let entity_grid = grid(&config)?;
        let plant_grid = grid(&config)?;
        let resource_grid = grid(&config)?;
        let rng = config.seeded_rng();
        let history_capacity = config.history_capacity;
        let plant_target = config.plants.count;
        Ok(Self {
            config,
            tick: Tick::zero(),
            time: 0.0,
            rng,
            entities: EntityArena::new(),
            plants: SlotMap::with_key(),
            resources: SlotMap::with_key(),
            buildings: SlotMap::with_key(),
            entity_grid,
            plant_grid,
            resource_grid,
            brain_registry: BrainRegistry::new(),
            recipes: RecipeBook::default(),
            plant_target,
            plant_respawn_timer: 0.0,
            pending_spawns: Vec::new(),
            pending_deaths: Vec::new(),
            persistence,
            last_births: 0,
            last_deaths: 0,
            last_stats: WorldStats::default(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Seed the configured plants, deposits and creatures at random positions.
    pub fn populate(&mut self) {
        let plant_energy = self.config.plants.energy;
        for _ in 0..self.config.plants.count {
            let position = self.random_position();
            self.spawn_plant(position, plant_energy);
        }

        let deposits = &self.config.resources;
        let counts = [
            (ResourceKind::Tree, deposits.trees),
            (ResourceKind::Stone, deposits.stones),
            (ResourceKind::Copper, deposits.copper),
            (ResourceKind::Iron, deposits.iron),
        ];
        for (kind, count) in counts {
            for _ in 0..count {
                let position = self.random_position();
                self.spawn_resource(kind, position, kind.default_amount());
            }
        }

        for species in Species::ALL {
            for _ in 0..self.config.species(species).count {
                let position = self.random_position();
                self.spawn_entity(species, position);
            }
        }

        self.plant_target = self.config.plants.count;
        self.plant_respawn_timer = 0.0;
        self.last_stats = WorldStats::collect(self);
        info!(
            herbivores = self.last_stats.herbivores,
            predators = self.last_stats.predators,
            smarts = self.last_stats.smarts,
            plants = self.plants.len(),
            resources = self.resources.len(),
            width = self.config.world_width,
            height = self.config.world_height,
            "world populated"
        );
    }

    fn random_position(&mut self) -> Vector2 {
        Vector2::new(
            self.rng.random_range(0.0..=self.config.world_width),
            self.rng.random_range(0.0..=self.config.world_height),
        )
    }

    /// Clamp a point into the world rectangle.
    #[must_use]
    pub fn clamp_position(&self, position: Vector2) -> Vector2 {
        self.config.clamp(position)
    }

    /// Add a creature with species defaults at `position` (clamped into the world).
    pub fn spawn_entity(&mut self, species: Species, position: Vector2) -> EntityId {
        let position = self.config.clamp(position);
        let entity = Entity::new(species, position, &self.config);
        let id = self.entities.insert(entity);
        self.entity_grid.insert(id, position.as_tuple());
        id
    }

    /// Add a plant holding `energy` at `position` (clamped into the world).
    pub fn spawn_plant(&mut self, position: Vector2, energy: f32) -> PlantId {
        let position = self.config.clamp(position);
        let plant = Plant::new(position, energy, self.config.plants.consumption_time);
        let id = self.plants.insert(plant);
        self.plant_grid.insert(id, position.as_tuple());
        id
    }

    /// Add a deposit of `kind` with `amount` units at `position` (clamped into the world).
    pub fn spawn_resource(&mut self, kind: ResourceKind, position: Vector2, amount: f32) -> ResourceId {
        let position = self.config.clamp(position);
        let id = self.resources.insert(ResourceNode::new(kind, position, amount));
        self.resource_grid.insert(id, position.as_tuple());
        id
    }

    /// Raise a building unless it would crowd an existing one or fall outside the world.
    pub fn place_building(
        &mut self,
        kind: BuildingKind,
        position: Vector2,
        owner: Option<EntityId>,
    ) -> Option<BuildingId> {
        if self.config.clamp(position) != position {
            debug!(kind = kind.label(), x = position.x, y = position.y, "building outside world");
            return None;
        }
        let crowded = self
            .buildings
            .values()
            .any(|building| !building.is_destroyed() && building.blocks(position));
        if crowded {
            debug!(kind = kind.label(), x = position.x, y = position.y, "building site occupied");
            return None;
        }
        Some(self.buildings.insert(Building::new(kind, position, owner)))
    }

    /// Bind a brain from the registry to the specified creature. Returns `true` on success.
    pub fn bind_brain(&mut self, id: EntityId, key: u64) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        match BrainBinding::from_registry(&self.brain_registry, &mut self.rng, key) {
            Some(binding) => {
                entity.brain = binding;
                true
            }
            None => false,
        }
    }

    /// Bind `key` to every live creature of `species`. Returns how many were bound.
    pub fn bind_species_brain(&mut self, species: Species, key: u64) -> usize {
        let targets: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, entity)| entity.species == species && entity.is_alive())
            .map(|(id, _)| id)
            .collect();
        targets
            .into_iter()
            .filter(|id| self.bind_brain(*id, key))
            .count()
    }

    /// Live plants within `radius` of `center`, nearest first.
    #[must_use]
    pub fn plants_in_radius(&self, center: Vector2, radius: f32) -> Vec<(PlantId, f32)> {
        self.plant_grid
            .query_radius(center.as_tuple(), radius)
            .into_iter()
            .filter(|(id, _)| self.plants.get(*id).is_some_and(|plant| plant.alive))
            .collect()
    }

    /// Live creatures within `radius` of `center`, nearest first.
    #[must_use]
    pub fn entities_in_radius(&self, center: Vector2, radius: f32) -> Vec<(EntityId, f32)> {
        self.entity_grid
            .query_radius(center.as_tuple(), radius)
            .into_iter()
            .filter(|(id, _)| self.entities.get(*id).is_some_and(Entity::is_alive))
            .collect()
    }

    fn stage_buildings(&mut self, dt: f32) {
        self.buildings.retain(|_, building| !building.is_destroyed());

        let mut farms = Vec::new();
        for building in self.buildings.values_mut() {
            match building.kind {
                BuildingKind::House => {
                    building.timer += dt;
                    if building.timer < HOUSE_HEAL_INTERVAL {
                        continue;
                    }
                    building.timer = 0.0;
                    let Some(owner) = building.owner.and_then(|id| self.entities.get_mut(id)) else {
                        continue;
                    };
                    if owner.body.position.distance_to(building.position) < building.radius {
                        owner.body.heal(HOUSE_HEAL);
                    }
                }
                BuildingKind::FarmPlot => {
                    building.timer += dt;
                    if building.timer >= FARM_INTERVAL {
                        building.timer = 0.0;
                        farms.push((building.position, building.radius));
                    }
                }
                BuildingKind::Campfire | BuildingKind::StorageBox => {}
            }
        }

        let farm_energy = self.config.plants.farm_energy;
        for (center, radius) in farms {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let distance = self
                .rng
                .random_range(FARM_MIN_DISTANCE..=radius.max(FARM_MIN_DISTANCE));
            let offset = Vector2::new(angle.cos(), angle.sin()) * distance;
            self.spawn_plant(center + offset, farm_energy);
        }
    }

    fn stage_plants(&mut self, dt: f32) -> usize {
        let entities = &self.entities;
        let mut grants = Vec::new();
        for (plant_id, plant) in &mut self.plants {
            plant.retain_consumers(|id| {
                entities
                    .get(id)
                    .is_some_and(|entity| entity.is_alive() && entity.eating == Some(plant_id))
            });
            grants.extend(plant.distribute(dt));
        }
        for (id, energy) in grants {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.body.gain_energy(energy);
            }
        }

        let depleted: HashSet<PlantId> = self
            .plants
            .iter()
            .filter(|(_, plant)| !plant.alive)
            .map(|(id, _)| id)
            .collect();
        if !depleted.is_empty() {
            self.plants.retain(|id, _| !depleted.contains(&id));
            for (_, entity) in self.entities.iter_mut() {
                if entity.eating.is_some_and(|plant| depleted.contains(&plant)) {
                    entity.eating = None;
                }
            }
        }

        let interval = self.config.plants.respawn_interval;
        if interval <= 0.0 {
            return 0;
        }
        self.plant_respawn_timer += dt;
        if self.plant_respawn_timer < interval {
            return 0;
        }
        self.plant_respawn_timer = 0.0;
        let missing = self.plant_target.saturating_sub(self.plants.len());
        let energy = self.config.plants.energy;
        for _ in 0..missing {
            let position = self.random_position();
            self.spawn_plant(position, energy);
        }
        if missing > 0 {
            debug!(tick = %self.tick, spawned = missing, "plants respawned");
        }
        missing
    }

    /// Miners that died or wandered past `gather_range` lose their slot and their effort.
    fn stage_resources(&mut self, dt: f32) {
        let gather_range = self.config.tribe.gather_range;
        let entities = &self.entities;
        let mut yields = Vec::new();
        for node in self.resources.values_mut() {
            let site = node.position;
            node.retain_miners(|id| {
                entities.get(id).is_some_and(|entity| {
                    entity.is_alive() && entity.body.position.distance_to(site) <= gather_range
                })
            });
            let item = node.yield_item();
            yields.extend(
                node.update(dt)
                    .into_iter()
                    .map(|(miner, count)| (miner, item, count)),
            );
        }
        for (miner, item, count) in yields {
            if let Some(state) = self
                .entities
                .get_mut(miner)
                .and_then(|entity| entity.smart_mut())
            {
                state.inventory.add(item, count);
            }
        }

        let exhausted: Vec<ResourceId> = self
            .resources
            .iter()
            .filter(|(_, node)| !node.alive)
            .map(|(id, _)| id)
            .collect();
        for id in exhausted {
            self.resources.remove(id);
            self.resource_grid.remove(id);
        }
    }

    fn stage_entities(&mut self, dt: f32) {
        let handles: Vec<EntityId> = self.entities.iter_handles().collect();
        for id in handles {
            if !self.entities.get(id).is_some_and(Entity::is_alive) {
                continue;
            }
            species::behave(self, id, dt);

            let model = self.config.energy;
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            entity.integrate(dt, &model);
            entity.body.position = self.config.clamp(entity.body.position);
            self.entity_grid.mark_moved(id, entity.body.position.as_tuple());
            species::try_reproduce(self, id);
        }

        for child in std::mem::take(&mut self.pending_spawns) {
            if !child.is_alive() {
                continue;
            }
            let position = child.body.position;
            let id = self.entities.insert(child);
            self.entity_grid.insert(id, position.as_tuple());
            self.last_births += 1;
        }

        self.pending_deaths.extend(
            self.entities
                .iter()
                .filter(|(_, entity)| !entity.is_alive())
                .map(|(id, _)| id),
        );
        if self.pending_deaths.is_empty() {
            return;
        }
        let dead = std::mem::take(&mut self.pending_deaths);
        for id in &dead {
            self.entity_grid.remove(*id);
            if let Some(plant) = self
                .entities
                .get(*id)
                .and_then(|entity| entity.eating)
                .and_then(|plant| self.plants.get_mut(plant))
            {
                plant.remove_consumer(*id);
            }
        }
        let doomed: HashSet<EntityId> = dead.iter().copied().collect();
        for node in self.resources.values_mut() {
            node.retain_miners(|miner| !doomed.contains(&miner));
        }
        self.last_deaths += self.entities.remove_many(&doomed);
        self.pending_deaths = dead;
        self.pending_deaths.clear();
    }

    fn stage_reindex(&mut self, next_tick: Tick) {
        self.entity_grid.reindex_moved();
        let interval = self.config.plant_grid_rebuild_interval;
        if interval > 0 && next_tick.0.is_multiple_of(interval) {
            let live: Vec<(PlantId, (f32, f32))> = self
                .plants
                .iter()
                .filter(|(_, plant)| plant.alive)
                .map(|(id, plant)| (id, plant.position.as_tuple()))
                .collect();
            self.plant_grid.rebuild(&live);
        }
    }

    fn stage_stats(&mut self) {
        self.last_stats = WorldStats::collect(self);
    }

    fn stage_persistence(&mut self, next_tick: Tick) {
        let summary = TickSummary {
            tick: next_tick,
            time: self.time,
            births: self.last_births,
            deaths: self.last_deaths,
            stats: self.last_stats.clone(),
        };
        self.persistence.on_tick(&summary);
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Execute one simulation tick pipeline returning emitted events.
    pub fn step(&mut self) -> TickEvents {
        let next_tick = self.tick.next();
        let dt = self.config.dt;
        self.last_births = 0;
        self.last_deaths = 0;

        self.stage_buildings(dt);
        let plants_respawned = self.stage_plants(dt);
        self.stage_resources(dt);
        self.stage_entities(dt);
        self.stage_reindex(next_tick);
        self.time += f64::from(dt);
        self.stage_stats();
        self.stage_persistence(next_tick);

        self.tick = next_tick;
        TickEvents {
            tick: next_tick,
            births: self.last_births,
            deaths: self.last_deaths,
            plants_respawned,
            extinct: self.last_stats.animals() == 0,
        }
    }

    /// Step `ticks` times, returning the events of the last tick processed.
    pub fn run(&mut self, ticks: u64) -> TickEvents {
        let mut events = TickEvents {
            tick: self.tick,
            ..TickEvents::default()
        };
        for _ in 0..ticks {
            events = self.step();
        }
        events
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Replace the persistence sink.
    pub fn set_persistence(&mut self, persistence: Box<dyn WorldPersistence>) {
        self.persistence = persistence;
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Statistics gathered at the end of the last tick (or by `populate`).
    #[must_use]
    pub fn stats(&self) -> &WorldStats {
        &self.last_stats
    }

    /// Iterate over retained tick summaries.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    #[must_use]
    pub fn entities(&self) -> &EntityArena {
        &self.entities
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    #[must_use]
    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plants.get(id)
    }

    pub fn plants(&self) -> impl Iterator<Item = (PlantId, &Plant)> {
        self.plants.iter()
    }

    #[must_use]
    pub fn plant_count(&self) -> usize {
        self.plants.len()
    }

    #[must_use]
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceNode> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &ResourceNode)> {
        self.resources.iter()
    }

    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id)
    }

    pub fn buildings(&self) -> impl Iterator<Item = (BuildingId, &Building)> {
        self.buildings.iter()
    }

    /// Immutable access to the brain registry.
    #[must_use]
    pub fn brain_registry(&self) -> &BrainRegistry {
        &self.brain_registry
    }

    /// Mutable access to the brain registry.
    #[must_use]
    pub fn brain_registry_mut(&mut self) -> &mut BrainRegistry {
        &mut self.brain_registry
    }

    /// Borrow the world RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn quiet_config() -> WorldConfig {
        let mut config = WorldConfig {
            rng_seed: Some(21),
            ..WorldConfig::default()
        };
        config.plants.respawn_interval = 0.0;
        config
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<TickSummary>>>);

    impl WorldPersistence for Recorder {
        fn on_tick(&mut self, summary: &TickSummary) {
            if let Ok(mut log) = self.0.lock() {
                log.push(summary.clone());
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected_before_the_first_tick() {
        let config = WorldConfig {
            grid_cell_size: 0.0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            WorldState::new(config),
            Err(WorldStateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn populate_spawns_configured_counts() {
        let mut world = WorldState::new(WorldConfig {
            rng_seed: Some(3),
            ..WorldConfig::default()
        })
        .expect("world");
        world.populate();
        let config = world.config().clone();
        assert_eq!(world.plant_count(), config.plants.count);
        assert_eq!(world.stats().herbivores, config.herbivores.count);
        assert_eq!(world.stats().predators, config.predators.count);
        assert_eq!(world.stats().smarts, config.smarts.count);
        let deposits =
            config.resources.trees + config.resources.stones + config.resources.copper + config.resources.iron;
        assert_eq!(world.resources().count(), deposits);
    }

    #[test]
    fn step_advances_clock_and_feeds_persistence() {
        let recorder = Recorder::default();
        let mut world =
            WorldState::with_persistence(quiet_config(), Box::new(recorder.clone())).expect("world");
        let grazer = world.spawn_entity(Species::Herbivore, Vector2::new(200.0, 200.0));
        world.entity_mut(grazer).expect("grazer").reproduction.threshold = f32::INFINITY;
        let events = world.run(3);
        assert_eq!(events.tick, Tick(3));
        assert_eq!(world.tick(), Tick(3));
        assert!((world.time() - 3.0 * f64::from(world.config().dt)).abs() < 1e-9);
        let log = recorder.0.lock().expect("recorder lock");
        assert_eq!(log.len(), 3);
        assert_eq!(log[2].stats.herbivores, 1);
        assert_eq!(world.history().count(), 3);
    }

    #[test]
    fn history_is_bounded() {
        let mut config = quiet_config();
        config.history_capacity = 4;
        let mut world = WorldState::new(config).expect("world");
        world.run(10);
        let ticks: Vec<u64> = world.history().map(|summary| summary.tick.0).collect();
        assert_eq!(ticks, vec![7, 8, 9, 10]);
    }

    #[test]
    fn dead_creatures_are_swept_and_counted() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let doomed = world.spawn_entity(Species::Herbivore, Vector2::new(100.0, 100.0));
        world.entity_mut(doomed).expect("doomed").reproduction.threshold = f32::INFINITY;
        let plant = world.spawn_plant(Vector2::new(104.0, 100.0), 100.0);
        world.step();
        assert!(world.plant(plant).expect("plant").has_consumer(doomed));

        world.entity_mut(doomed).expect("doomed").body.alive = false;
        let events = world.step();
        assert_eq!(events.deaths, 1);
        assert!(events.extinct);
        assert!(world.entity(doomed).is_none());
        assert_eq!(world.plant(plant).expect("plant").consumer_count(), 0);
        assert!(world.entities_in_radius(Vector2::new(100.0, 100.0), 50.0).is_empty());
    }

    #[test]
    fn miners_out_of_gather_range_are_dropped() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let node = world.spawn_resource(ResourceKind::Stone, Vector2::new(400.0, 400.0), 180.0);
        let near = world.spawn_entity(Species::Smart, Vector2::new(410.0, 400.0));
        let far = world.spawn_entity(Species::Smart, Vector2::new(440.0, 400.0));
        for id in [near, far] {
            world.entity_mut(id).expect("smart").reproduction.threshold = f32::INFINITY;
            world.resources[node].add_miner(id, 1.0);
        }

        world.step();
        let node = world.resource(node).expect("node");
        assert_eq!(node.miner_count(), 1);
        assert!(node.has_miner(near));
        assert!(!node.has_miner(far));
    }

    #[test]
    fn depleted_plants_are_swept_and_respawned() {
        let mut config = quiet_config();
        config.plants.count = 3;
        config.plants.respawn_interval = 0.05;
        let mut world = WorldState::new(config).expect("world");
        let husk = world.spawn_plant(Vector2::new(605.0, 600.0), 0.0);
        let mut respawned = 0;
        for _ in 0..4 {
            respawned += world.step().plants_respawned;
        }
        assert!(world.plant(husk).is_none());
        assert_eq!(respawned, 3);
        assert_eq!(world.plant_count(), 3);
    }

    #[test]
    fn placement_rejects_crowded_and_outside_sites() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let first = world.place_building(BuildingKind::Campfire, Vector2::new(50.0, 50.0), None);
        assert!(first.is_some());
        assert!(
            world
                .place_building(BuildingKind::Campfire, Vector2::new(55.0, 50.0), None)
                .is_none()
        );
        assert!(
            world
                .place_building(BuildingKind::House, Vector2::new(-5.0, 50.0), None)
                .is_none()
        );
        assert!(
            world
                .place_building(BuildingKind::House, Vector2::new(90.0, 50.0), None)
                .is_some()
        );
    }

    #[test]
    fn house_heals_owner_inside_radius() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let owner = world.spawn_entity(Species::Smart, Vector2::new(300.0, 300.0));
        {
            let entity = world.entity_mut(owner).expect("owner");
            entity.body.health = 50.0;
            entity.body.base_max_speed = 0.0;
            entity.reproduction.threshold = f32::INFINITY;
        }
        world
            .place_building(BuildingKind::House, Vector2::new(302.0, 300.0), Some(owner))
            .expect("house");
        let ticks = (1.0 / world.config().dt).ceil() as u64 + 1;
        world.run(ticks);
        let health = world.entity(owner).expect("owner").body.health;
        assert!(health >= 55.0 - 1e-3, "health {health}");
    }

    #[test]
    fn farm_plot_sows_plants_near_itself() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let farm = world
            .place_building(BuildingKind::FarmPlot, Vector2::new(700.0, 700.0), None)
            .expect("farm");
        let center = world.building(farm).expect("farm").position;
        let ticks = (10.0 / world.config().dt).ceil() as u64 + 1;
        world.run(ticks);
        let sown: Vec<&Plant> = world.plants().map(|(_, plant)| plant).collect();
        assert_eq!(sown.len(), 1);
        assert_eq!(sown[0].energy, world.config().plants.farm_energy);
        assert!(sown[0].position.distance_to(center) <= 5.0 + 1e-3);
    }

    #[test]
    fn destroyed_buildings_are_removed() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let fire = world
            .place_building(BuildingKind::Campfire, Vector2::new(10.0, 10.0), None)
            .expect("campfire");
        world.building_mut(fire).expect("campfire").damage(100.0);
        world.step();
        assert!(world.building(fire).is_none());
    }

    #[test]
    fn positions_are_clamped_to_the_world() {
        let mut world = WorldState::new(quiet_config()).expect("world");
        let runner = world.spawn_entity(Species::Predator, Vector2::new(1199.0, 5.0));
        world.entity_mut(runner).expect("runner").body.velocity = Vector2::new(5000.0, -5000.0);
        world.step();
        let position = world.entity(runner).expect("runner").body.position;
        assert!(position.x <= world.config().world_width);
        assert!(position.y >= 0.0);
    }
}
