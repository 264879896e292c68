//! Core types shared across the ecosim workspace.
//!
//! [`WorldState`] owns every creature, plant, resource deposit and building together with
//! their spatial indices, and advances them with [`WorldState::step`]. Creatures are steered by
//! built-in species heuristics unless a [`BrainRunner`] is bound through the world's
//! [`BrainRegistry`].

pub mod building;
pub mod config;
pub mod crafting;
pub mod decision;
pub mod energy;
pub mod entity;
pub mod inventory;
pub mod items;
pub mod resources;
pub mod sensing;
mod species;
pub mod stats;
pub mod vector;
pub mod world;

use slotmap::new_key_type;

new_key_type! {
    /// Stable handle for creatures backed by a generational slot map.
    pub struct EntityId;
    /// Stable handle for plants.
    pub struct PlantId;
    /// Stable handle for resource deposits.
    pub struct ResourceId;
    /// Stable handle for buildings.
    pub struct BuildingId;
}

pub use building::{Building, BuildingKind, BuildingStats, PLACEMENT_MARGIN};
pub use config::{
    PanicConfig, PlantConfig, Preset, ResourceConfig, SpeciesConfig, TribeConfig, WorldConfig,
    WorldStateError,
};
pub use crafting::{CraftError, Recipe, RecipeBook, Station, craft};
pub use decision::{BrainBinding, BrainRegistry, BrainRunner, Decision, DecisionKind};
pub use energy::{EnergyModel, MovementCoefficients};
pub use entity::{
    Activity, Body, Combat, Entity, EntityArena, HerbivoreState, PredatorState,
    ReproductionState, SmartState, Species, SpeciesState,
};
pub use inventory::Inventory;
pub use items::{Equipment, EquipmentSlot, ItemCategory, ItemKind, ItemStats};
pub use resources::{
    BASE_MINING_POWER, DEPLETION_THRESHOLD, Plant, ResourceKind, ResourceNode, YIELD_COST,
};
pub use sensing::{
    BuildingSighting, EntitySighting, EntityView, PlantSighting, ResourceSighting, SensorSnapshot,
};
pub use stats::{FrameStats, PopulationSummary, RunSummary, StatisticsCollector, WorldStats};
pub use vector::Vector2;
pub use world::{NullPersistence, Tick, TickEvents, TickSummary, WorldPersistence, WorldState};
