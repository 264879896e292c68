//! Population statistics: per-tick aggregates and a run-long collector.

use crate::{ResourceKind, Species, Tick, WorldState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Counts and energy totals gathered in a single pass over the world.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldStats {
    pub herbivores: usize,
    pub predators: usize,
    pub smarts: usize,
    /// Distinct tribes among living smarts.
    pub tribes: usize,
    pub plants: usize,
    pub trees: usize,
    pub stones: usize,
    pub copper_deposits: usize,
    pub iron_deposits: usize,
    pub buildings: usize,
    pub herbivore_energy: f32,
    pub predator_energy: f32,
    pub smart_energy: f32,
}

impl WorldStats {
    #[must_use]
    pub fn collect(world: &WorldState) -> Self {
        let mut stats = Self::default();
        let mut tribes = BTreeSet::new();
        for (_, entity) in world.entities.iter() {
            if !entity.is_alive() {
                continue;
            }
            let energy = entity.body.energy;
            match entity.species {
                Species::Herbivore => {
                    stats.herbivores += 1;
                    stats.herbivore_energy += energy;
                }
                Species::Predator => {
                    stats.predators += 1;
                    stats.predator_energy += energy;
                }
                Species::Smart => {
                    stats.smarts += 1;
                    stats.smart_energy += energy;
                    if let Some(tribe) = entity.tribe() {
                        tribes.insert(tribe);
                    }
                }
            }
        }
        stats.tribes = tribes.len();
        stats.plants = world.plants.values().filter(|plant| plant.alive).count();
        for node in world.resources.values().filter(|node| node.alive) {
            match node.kind {
                ResourceKind::Tree => stats.trees += 1,
                ResourceKind::Stone => stats.stones += 1,
                ResourceKind::Copper => stats.copper_deposits += 1,
                ResourceKind::Iron => stats.iron_deposits += 1,
            }
        }
        stats.buildings = world
            .buildings
            .values()
            .filter(|building| !building.is_destroyed())
            .count();
        stats
    }

    #[must_use]
    pub const fn count(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Predator => self.predators,
            Species::Smart => self.smarts,
        }
    }

    #[must_use]
    pub const fn total_energy(&self, species: Species) -> f32 {
        match species {
            Species::Herbivore => self.herbivore_energy,
            Species::Predator => self.predator_energy,
            Species::Smart => self.smart_energy,
        }
    }

    /// Mean energy of one species; zero when it has no members.
    #[must_use]
    pub fn average_energy(&self, species: Species) -> f32 {
        match self.count(species) {
            0 => 0.0,
            count => self.total_energy(species) / count as f32,
        }
    }

    #[must_use]
    pub const fn resource_count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Tree => self.trees,
            ResourceKind::Stone => self.stones,
            ResourceKind::Copper => self.copper_deposits,
            ResourceKind::Iron => self.iron_deposits,
        }
    }

    /// Living creatures of every species.
    #[must_use]
    pub const fn animals(&self) -> usize {
        self.herbivores + self.predators + self.smarts
    }
}

/// One recorded sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameStats {
    pub tick: Tick,
    pub time: f64,
    pub herbivores: usize,
    pub predators: usize,
    pub smarts: usize,
    pub plants: usize,
    pub herbivore_energy: f32,
    pub predator_energy: f32,
    pub smart_energy: f32,
    pub herbivore_average_energy: f32,
    pub predator_average_energy: f32,
    pub smart_average_energy: f32,
}

impl FrameStats {
    #[must_use]
    pub fn capture(world: &WorldState) -> Self {
        let stats = world.stats();
        Self {
            tick: world.tick(),
            time: world.time(),
            herbivores: stats.herbivores,
            predators: stats.predators,
            smarts: stats.smarts,
            plants: stats.plants,
            herbivore_energy: stats.herbivore_energy,
            predator_energy: stats.predator_energy,
            smart_energy: stats.smart_energy,
            herbivore_average_energy: stats.average_energy(Species::Herbivore),
            predator_average_energy: stats.average_energy(Species::Predator),
            smart_average_energy: stats.average_energy(Species::Smart),
        }
    }

    #[must_use]
    pub const fn count(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Predator => self.predators,
            Species::Smart => self.smarts,
        }
    }
}

/// Peak and mean population of one species over a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PopulationSummary {
    pub max: usize,
    pub average: f32,
    #[serde(rename = "final")]
    pub last: usize,
}

/// Whole-run digest produced by [`StatisticsCollector::summary`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub frames: usize,
    pub first_tick: Tick,
    pub last_tick: Tick,
    pub herbivores: PopulationSummary,
    pub predators: PopulationSummary,
    pub smarts: PopulationSummary,
    pub final_plants: usize,
}

impl RunSummary {
    #[must_use]
    pub const fn population(&self, species: Species) -> &PopulationSummary {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Predator => &self.predators,
            Species::Smart => &self.smarts,
        }
    }
}

/// Records [`FrameStats`] while running.
#[derive(Debug, Clone, Default)]
pub struct StatisticsCollector {
    frames: Vec<FrameStats>,
    running: bool,
}

impl StatisticsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a fresh recording, discarding earlier frames.
    pub fn start(&mut self) {
        self.frames.clear();
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Sample `world`. Ignored unless the collector is running.
    pub fn record(&mut self, world: &WorldState) {
        if self.running {
            self.frames.push(FrameStats::capture(world));
        }
    }

    #[must_use]
    pub fn frames(&self) -> &[FrameStats] {
        &self.frames
    }

    /// Frames whose tick lies in `[start, end]`.
    pub fn range(&self, start: Tick, end: Tick) -> impl Iterator<Item = &FrameStats> {
        self.frames
            .iter()
            .filter(move |frame| frame.tick >= start && frame.tick <= end)
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let (Some(first), Some(last)) = (self.frames.first(), self.frames.last()) else {
            return RunSummary::default();
        };
        let population = |species: Species| {
            let total: usize = self.frames.iter().map(|frame| frame.count(species)).sum();
            PopulationSummary {
                max: self
                    .frames
                    .iter()
                    .map(|frame| frame.count(species))
                    .max()
                    .unwrap_or_default(),
                average: total as f32 / self.frames.len() as f32,
                last: last.count(species),
            }
        };
        RunSummary {
            frames: self.frames.len(),
            first_tick: first.tick,
            last_tick: last.tick,
            herbivores: population(Species::Herbivore),
            predators: population(Species::Predator),
            smarts: population(Species::Smart),
            final_plants: last.plants,
        }
    }
}
