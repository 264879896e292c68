//! World configuration, presets and validation.

use crate::{EnergyModel, Species, Vector2};
use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing world state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldStateError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Tunables for one creature family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesConfig {
    /// Creatures spawned by `populate`.
    pub count: usize,
    pub max_energy: f32,
    pub initial_energy: f32,
    pub max_health: f32,
    pub vision_range: f32,
    /// Top speed at full energy.
    pub max_speed: f32,
    pub radius: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    /// Seconds between strikes.
    pub attack_cooldown: f32,
    /// Energy needed before breeding.
    pub reproduction_threshold: f32,
    /// Fraction of `max_energy` a parent spends per offspring.
    pub reproduction_cost_fraction: f32,
    /// Seconds between births.
    pub reproduction_cooldown: f32,
    /// Fraction of the parent's spend handed to the offspring.
    pub offspring_energy_fraction: f32,
    /// Maximum per-axis offset of the offspring from its parent.
    pub offspring_jitter: f32,
}

impl SpeciesConfig {
    #[must_use]
    pub fn herbivore() -> Self {
        Self {
            count: 15,
            max_energy: 130.0,
            initial_energy: 110.0,
            max_health: 100.0,
            vision_range: 60.0,
            max_speed: 80.0,
            radius: 4.0,
            attack_range: 0.0,
            attack_damage: 0.0,
            attack_cooldown: 0.0,
            reproduction_threshold: 90.0,
            reproduction_cost_fraction: 0.4,
            reproduction_cooldown: 5.0,
            offspring_energy_fraction: 0.8,
            offspring_jitter: 25.0,
        }
    }

    #[must_use]
    pub fn predator() -> Self {
        Self {
            count: 4,
            max_energy: 200.0,
            initial_energy: 180.0,
            max_health: 120.0,
            vision_range: 150.0,
            max_speed: 100.0,
            radius: 5.0,
            attack_range: 12.0,
            attack_damage: 50.0,
            attack_cooldown: 0.35,
            reproduction_threshold: 120.0,
            reproduction_cost_fraction: 0.4,
            reproduction_cooldown: 5.0,
            offspring_energy_fraction: 1.0,
            offspring_jitter: 30.0,
        }
    }

    #[must_use]
    pub fn smart() -> Self {
        Self {
            count: 6,
            max_energy: 120.0,
            initial_energy: 95.0,
            max_health: 100.0,
            vision_range: 95.0,
            max_speed: 88.0,
            radius: 4.5,
            attack_range: 10.0,
            attack_damage: 18.0,
            attack_cooldown: 0.45,
            reproduction_threshold: 85.0,
            reproduction_cost_fraction: 0.4,
            reproduction_cooldown: 5.0,
            offspring_energy_fraction: 0.85,
            offspring_jitter: 25.0,
        }
    }

    fn validate(&self) -> Result<(), WorldStateError> {
        let finite = [
            self.max_energy,
            self.initial_energy,
            self.max_health,
            self.vision_range,
            self.max_speed,
            self.radius,
            self.attack_range,
            self.attack_damage,
            self.attack_cooldown,
            self.reproduction_threshold,
            self.reproduction_cost_fraction,
            self.reproduction_cooldown,
            self.offspring_energy_fraction,
            self.offspring_jitter,
        ];
        if finite.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(WorldStateError::InvalidConfig(
                "species tunables must be finite and non-negative",
            ));
        }
        if self.max_energy <= 0.0 {
            return Err(WorldStateError::InvalidConfig("max_energy must be positive"));
        }
        if self.initial_energy > self.max_energy {
            return Err(WorldStateError::InvalidConfig(
                "initial_energy must not exceed max_energy",
            ));
        }
        if self.max_health <= 0.0 {
            return Err(WorldStateError::InvalidConfig("max_health must be positive"));
        }
        if self.reproduction_cost_fraction > 1.0 {
            return Err(WorldStateError::InvalidConfig(
                "reproduction_cost_fraction must be at most 1",
            ));
        }
        Ok(())
    }
}

/// Plant seeding and regrowth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlantConfig {
    /// Plants seeded at start and restored by respawns.
    pub count: usize,
    pub energy: f32,
    /// Seconds a single consumer needs to strip a plant.
    pub consumption_time: f32,
    /// Seconds between top-ups back to `count`.
    pub respawn_interval: f32,
    /// Energy of plants grown by farm plots.
    pub farm_energy: f32,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            count: 100,
            energy: 100.0,
            consumption_time: 2.5,
            respawn_interval: 5.0,
            farm_energy: 30.0,
        }
    }
}

/// Resource node counts seeded by `populate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourceConfig {
    pub trees: usize,
    pub stones: usize,
    pub copper: usize,
    pub iron: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            trees: 35,
            stones: 28,
            copper: 14,
            iron: 8,
        }
    }
}

/// Herbivore fear hysteresis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanicConfig {
    /// Threats at or inside this distance start a panic.
    pub enter_distance: f32,
    /// Threats inside this distance keep an ongoing panic alive.
    pub exit_distance: f32,
    /// Seconds a fresh panic lasts.
    pub min_duration: f32,
    /// Feeding lock-out after fleeing.
    pub no_eat_after_flee: f32,
    /// Creatures at or below this energy are too exhausted to panic.
    pub min_energy: f32,
    pub flee_speed: f32,
}

impl Default for PanicConfig {
    fn default() -> Self {
        Self {
            enter_distance: 34.0,
            exit_distance: 52.0,
            min_duration: 1.2,
            no_eat_after_flee: 0.9,
            min_energy: 20.0,
            flee_speed: 65.0,
        }
    }
}

/// Smart creature tribe behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TribeConfig {
    pub default_tribe: u32,
    /// Radius inside which food is handed to hungry tribemates.
    pub share_radius: f32,
    /// Tribemates below this energy ratio receive food.
    pub share_below_ratio: f32,
    pub inventory_capacity: f32,
    /// Creatures below this energy ratio eat from their pack.
    pub auto_eat_ratio: f32,
    /// Radius searched for a plant when no meat is carried.
    pub forage_radius: f32,
    /// Maximum distance to a resource node while mining.
    pub gather_range: f32,
}

impl Default for TribeConfig {
    fn default() -> Self {
        Self {
            default_tribe: 1,
            share_radius: 42.0,
            share_below_ratio: 0.4,
            inventory_capacity: 35.0,
            auto_eat_ratio: 0.7,
            forage_radius: 15.0,
            gather_range: 15.0,
        }
    }
}

/// Static configuration for an ecosim world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// Seconds simulated per tick.
    pub dt: f32,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Edge length of the spatial grid cells.
    pub grid_cell_size: f32,
    /// Ticks between full plant grid rebuilds.
    pub plant_grid_rebuild_interval: u64,
    /// Number of tick summaries retained in memory.
    pub history_capacity: usize,
    pub plants: PlantConfig,
    pub resources: ResourceConfig,
    pub herbivores: SpeciesConfig,
    pub predators: SpeciesConfig,
    pub smarts: SpeciesConfig,
    pub panic: PanicConfig,
    pub tribe: TribeConfig,
    pub energy: EnergyModel,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_width: 1200.0,
            world_height: 1200.0,
            dt: 0.016,
            rng_seed: None,
            grid_cell_size: 100.0,
            plant_grid_rebuild_interval: 5,
            history_capacity: 600,
            plants: PlantConfig::default(),
            resources: ResourceConfig::default(),
            herbivores: SpeciesConfig::herbivore(),
            predators: SpeciesConfig::predator(),
            smarts: SpeciesConfig::smart(),
            panic: PanicConfig::default(),
            tribe: TribeConfig::default(),
            energy: EnergyModel::default(),
        }
    }
}

impl WorldConfig {
    /// Tunables for `species`.
    #[must_use]
    pub fn species(&self, species: Species) -> &SpeciesConfig {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Predator => &self.predators,
            Species::Smart => &self.smarts,
        }
    }

    pub fn species_mut(&mut self, species: Species) -> &mut SpeciesConfig {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Predator => &mut self.predators,
            Species::Smart => &mut self.smarts,
        }
    }

    /// Clamp `position` into `[0, world_width] x [0, world_height]`.
    #[must_use]
    pub fn clamp(&self, position: Vector2) -> Vector2 {
        Vector2::new(
            position.x.clamp(0.0, self.world_width),
            position.y.clamp(0.0, self.world_height),
        )
    }

    /// Reject configurations the tick pipeline cannot run with.
    pub fn validate(&self) -> Result<(), WorldStateError> {
        if !self.world_width.is_finite()
            || !self.world_height.is_finite()
            || self.world_width <= 0.0
            || self.world_height <= 0.0
        {
            return Err(WorldStateError::InvalidConfig(
                "world dimensions must be positive and finite",
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(WorldStateError::InvalidConfig("dt must be positive"));
        }
        if !self.grid_cell_size.is_finite() || self.grid_cell_size <= 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "grid_cell_size must be positive",
            ));
        }
        if self.plant_grid_rebuild_interval == 0 {
            return Err(WorldStateError::InvalidConfig(
                "plant_grid_rebuild_interval must be non-zero",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldStateError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        if !self.plants.energy.is_finite() || self.plants.energy < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "plant energy must be non-negative",
            ));
        }
        if !self.plants.consumption_time.is_finite() || self.plants.consumption_time <= 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "plant consumption_time must be positive",
            ));
        }
        if !self.plants.respawn_interval.is_finite() || self.plants.respawn_interval < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "plant respawn_interval must be non-negative",
            ));
        }
        if self.panic.exit_distance < self.panic.enter_distance {
            return Err(WorldStateError::InvalidConfig(
                "panic exit_distance must not be below enter_distance",
            ));
        }
        if self.tribe.inventory_capacity < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "inventory_capacity must be non-negative",
            ));
        }
        if self.energy.metabolic_rate < 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "metabolic_rate must be non-negative",
            ));
        }
        for species in Species::ALL {
            self.species(species).validate()?;
        }
        Ok(())
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Named starting scenarios.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Balanced,
    HerbivoreDominated,
    PredatorDominant,
    ScarceResources,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Balanced,
        Preset::HerbivoreDominated,
        Preset::PredatorDominant,
        Preset::ScarceResources,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Preset::Balanced => "balanced",
            Preset::HerbivoreDominated => "herbivore_dominated",
            Preset::PredatorDominant => "predator_dominant",
            Preset::ScarceResources => "scarce_resources",
        }
    }

    /// Build the configuration for this scenario.
    #[must_use]
    pub fn config(self) -> WorldConfig {
        let mut config = WorldConfig::default();
        let (size, plants, plant_energy, resources) = match self {
            Preset::Balanced => (1400.0, 100, 100.0, [35, 28, 14, 8]),
            Preset::HerbivoreDominated => (1700.0, 150, 120.0, [45, 30, 16, 9]),
            Preset::PredatorDominant => (1200.0, 120, 100.0, [24, 22, 11, 6]),
            Preset::ScarceResources => (2000.0, 80, 100.0, [30, 26, 12, 7]),
        };
        config.world_width = size;
        config.world_height = size;
        config.plants.count = plants;
        config.plants.energy = plant_energy;
        let [trees, stones, copper, iron] = resources;
        config.resources = ResourceConfig {
            trees,
            stones,
            copper,
            iron,
        };

        // (count, initial energy) per species.
        let [(herbivores, herbivore_energy), (predators, predator_energy), (smarts, smart_energy)] =
            match self {
                Preset::Balanced => [(20, 110.0), (5, 180.0), (6, 95.0)],
                Preset::HerbivoreDominated => [(30, 120.0), (2, 180.0), (8, 100.0)],
                Preset::PredatorDominant => [(18, 75.0), (8, 145.0), (5, 90.0)],
                Preset::ScarceResources => [(12, 65.0), (4, 145.0), (4, 85.0)],
            };
        config.herbivores.count = herbivores;
        config.herbivores.initial_energy = herbivore_energy;
        config.predators.count = predators;
        config.predators.initial_energy = predator_energy;
        config.smarts.count = smarts;
        config.smarts.initial_energy = smart_energy;
        if self == Preset::HerbivoreDominated {
            config.predators.attack_damage = 40.0;
        }
        config
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
