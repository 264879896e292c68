//! Edible plants and mineable resource nodes.
//!
//! Both keep their participants in insertion order so energy and item distribution is
//! deterministic for a seeded world.

use crate::{EntityId, ItemKind, Vector2};
use serde::{Deserialize, Serialize};

/// Effort a single item costs to extract.
pub const YIELD_COST: f32 = 10.0;
/// Effort produced per second at efficiency 1.0.
pub const BASE_MINING_POWER: f32 = 5.0;
/// Nodes at or below this amount are exhausted.
pub const DEPLETION_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
struct Consumer {
    entity: EntityId,
    eating_time: f32,
}

/// Energy source shared by every creature currently feeding on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    pub position: Vector2,
    pub energy: f32,
    pub max_energy: f32,
    /// Seconds a single consumer needs to strip the plant.
    pub consumption_time: f32,
    pub alive: bool,
    /// Eating time per consumer, in registration order. Each id appears at most once.
    consumers: Vec<Consumer>,
}

impl Plant {
    #[must_use]
    pub fn new(position: Vector2, energy: f32, consumption_time: f32) -> Self {
        Self {
            position,
            energy,
            max_energy: energy,
            consumption_time,
            alive: energy > 0.0,
            consumers: Vec::new(),
        }
    }

    /// Register `entity` as feeding; existing consumers keep their progress.
    pub fn add_consumer(&mut self, entity: EntityId) {
        if !self.has_consumer(entity) {
            self.consumers.push(Consumer {
                entity,
                eating_time: 0.0,
            });
        }
    }

    pub fn remove_consumer(&mut self, entity: EntityId) -> bool {
        let before = self.consumers.len();
        self.consumers.retain(|consumer| consumer.entity != entity);
        before != self.consumers.len()
    }

    /// Drop every consumer rejected by `keep`.
    pub fn retain_consumers(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.consumers.retain(|consumer| keep(consumer.entity));
    }

    #[must_use]
    pub fn has_consumer(&self, entity: EntityId) -> bool {
        self.consumers
            .iter()
            .any(|consumer| consumer.entity == entity)
    }

    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn consumers(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.consumers.iter().map(|consumer| consumer.entity)
    }

    /// Split this tick's feeding budget between consumers.
    ///
    /// The budget is `max_energy / consumption_time × dt`, shared equally; each share is capped
    /// by whatever energy remains, so the total handed out never exceeds the plant's energy.
    pub fn distribute(&mut self, dt: f32) -> Vec<(EntityId, f32)> {
        if self.energy <= 0.0 {
            self.alive = false;
            return Vec::new();
        }
        if self.consumers.is_empty() || self.consumption_time <= 0.0 {
            return Vec::new();
        }
        let budget = self.max_energy / self.consumption_time * dt;
        let per_consumer = budget / self.consumers.len() as f32;
        let mut given = Vec::with_capacity(self.consumers.len());
        for consumer in &mut self.consumers {
            let share = per_consumer.min(self.energy).max(0.0);
            self.energy -= share;
            consumer.eating_time += dt;
            given.push((consumer.entity, share));
        }
        if self.energy <= 0.0 {
            self.energy = 0.0;
            self.alive = false;
        }
        given
    }

    /// Take up to `amount` energy directly, returning what was removed.
    pub fn bite(&mut self, amount: f32) -> f32 {
        if !self.alive {
            return 0.0;
        }
        let taken = amount.min(self.energy).max(0.0);
        self.energy -= taken;
        if self.energy <= 0.0 {
            self.energy = 0.0;
            self.alive = false;
        }
        taken
    }

    /// Fraction of a full meal `entity` has eaten, in `[0, 1]`.
    #[must_use]
    pub fn eating_progress(&self, entity: EntityId) -> f32 {
        if self.consumption_time <= 0.0 {
            return 0.0;
        }
        self.consumers
            .iter()
            .find(|consumer| consumer.entity == entity)
            .map_or(0.0, |consumer| {
                (consumer.eating_time / self.consumption_time).min(1.0)
            })
    }
}

/// Raw material deposits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tree,
    Stone,
    Copper,
    Iron,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Tree,
        ResourceKind::Stone,
        ResourceKind::Copper,
        ResourceKind::Iron,
    ];

    /// Item produced by mining this kind.
    #[must_use]
    pub const fn yield_item(self) -> ItemKind {
        match self {
            ResourceKind::Tree => ItemKind::Wood,
            ResourceKind::Stone => ItemKind::Stone,
            ResourceKind::Copper => ItemKind::CopperOre,
            ResourceKind::Iron => ItemKind::IronOre,
        }
    }

    /// Starting amount for freshly seeded nodes.
    #[must_use]
    pub const fn default_amount(self) -> f32 {
        match self {
            ResourceKind::Tree => 120.0,
            ResourceKind::Stone => 180.0,
            ResourceKind::Copper => 90.0,
            ResourceKind::Iron => 110.0,
        }
    }

    /// Type code used by policy observations.
    #[must_use]
    pub const fn code(self) -> f32 {
        match self {
            ResourceKind::Tree => 0.0,
            ResourceKind::Stone => 0.33,
            ResourceKind::Copper => 0.66,
            ResourceKind::Iron => 1.0,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Tree => "tree",
            ResourceKind::Stone => "stone",
            ResourceKind::Copper => "copper",
            ResourceKind::Iron => "iron",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
struct Miner {
    entity: EntityId,
    efficiency: f32,
    accumulated: f32,
}

/// Finite deposit worked by any number of miners at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub position: Vector2,
    pub amount: f32,
    pub max_amount: f32,
    pub alive: bool,
    miners: Vec<Miner>,
}

impl ResourceNode {
    #[must_use]
    pub fn new(kind: ResourceKind, position: Vector2, amount: f32) -> Self {
        Self {
            kind,
            position,
            amount,
            max_amount: amount,
            alive: amount > DEPLETION_THRESHOLD,
            miners: Vec::new(),
        }
    }

    /// Start (or keep) mining with the given tool efficiency.
    pub fn add_miner(&mut self, entity: EntityId, efficiency: f32) {
        if let Some(miner) = self.miners.iter_mut().find(|miner| miner.entity == entity) {
            miner.efficiency = efficiency;
        } else {
            self.miners.push(Miner {
                entity,
                efficiency,
                accumulated: 0.0,
            });
        }
    }

    pub fn remove_miner(&mut self, entity: EntityId) -> bool {
        let before = self.miners.len();
        self.miners.retain(|miner| miner.entity != entity);
        before != self.miners.len()
    }

    pub fn retain_miners(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.miners.retain(|miner| keep(miner.entity));
    }

    #[must_use]
    pub fn has_miner(&self, entity: EntityId) -> bool {
        self.miners.iter().any(|miner| miner.entity == entity)
    }

    #[must_use]
    pub fn miner_count(&self) -> usize {
        self.miners.len()
    }

    pub fn miners(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.miners.iter().map(|miner| miner.entity)
    }

    /// Effort banked by `entity` toward its next item.
    #[must_use]
    pub fn miner_progress(&self, entity: EntityId) -> Option<f32> {
        self.miners
            .iter()
            .find(|miner| miner.entity == entity)
            .map(|miner| miner.accumulated)
    }

    #[must_use]
    pub const fn yield_item(&self) -> ItemKind {
        self.kind.yield_item()
    }

    /// Convert this tick's mining effort into whole items per miner.
    pub fn update(&mut self, dt: f32) -> Vec<(EntityId, u32)> {
        if !self.alive || self.amount <= 0.0 {
            self.alive = false;
            return Vec::new();
        }
        let mut produced = Vec::new();
        for miner in &mut self.miners {
            let effort = (BASE_MINING_POWER * miner.efficiency * dt)
                .min(self.amount.max(0.0) * YIELD_COST);
            miner.accumulated += effort;
            self.amount -= effort / YIELD_COST;
            if miner.accumulated >= YIELD_COST {
                let count = (miner.accumulated / YIELD_COST).floor();
                miner.accumulated -= count * YIELD_COST;
                produced.push((miner.entity, count as u32));
            }
        }
        if self.amount <= DEPLETION_THRESHOLD {
            self.alive = false;
        }
        produced
    }
}
