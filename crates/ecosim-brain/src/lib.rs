//! Traits and baseline implementations for ecosim brains.
//!
//! A [`Brain`] turns a [`SensorSnapshot`] into a [`Decision`]. Brains are wrapped into the
//! core [`BrainRunner`] trait object through [`into_runner`] so the world can drive them without
//! knowing the concrete type.

pub mod heuristic;
pub mod observation;
pub mod policy;

use ecosim_core::{BrainRunner, Decision, EntityView, SensorSnapshot};
use std::fmt;

pub use heuristic::{HerbivoreHeuristic, PredatorHeuristic, SmartHeuristic, register_heuristic};
pub use observation::{
    BASE_OBSERVATION_SIZE, INVENTORY_ITEMS, SMART_OBSERVATION_SIZE, encode, observation_size,
};
pub use policy::{
    ACTION_SIZE, InferenceModel, PolicyBrain, PolicyCache, SharedPolicy, UnloadedModel,
};

/// Static identifier of a brain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrainKind(&'static str);

impl BrainKind {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for BrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Shared interface implemented by all creature brains.
pub trait Brain: Send + Sync {
    /// Immutable brain identifier (useful for analytics).
    fn kind(&self) -> BrainKind;

    /// Choose this tick's action. Brains only read the world.
    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision;

    /// Fresh brain for a newborn when the parent was attached directly.
    fn offspring(&self) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

/// Wraps a [`Brain`] so it can sit behind the core [`BrainRunner`] trait object.
#[derive(Debug)]
pub struct BrainRunnerAdapter<B> {
    pub brain: B,
}

impl<B: Brain + 'static> BrainRunner for BrainRunnerAdapter<B> {
    fn kind(&self) -> &'static str {
        self.brain.kind().as_str()
    }

    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision {
        self.brain.decide(sensors, entity)
    }

    fn offspring(&self) -> Option<Box<dyn BrainRunner>> {
        self.brain.offspring().map(into_runner)
    }
}

/// Box a brain into a runner.
#[must_use]
pub fn into_runner<B: Brain + 'static>(brain: B) -> Box<dyn BrainRunner> {
    Box::new(BrainRunnerAdapter { brain })
}

/// Brain that never acts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBrain;

impl NoopBrain {
    pub const KIND: BrainKind = BrainKind::new("noop");

    #[must_use]
    pub fn runner() -> Box<dyn BrainRunner> {
        into_runner(Self)
    }
}

impl Brain for NoopBrain {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn decide(&mut self, _sensors: &SensorSnapshot, _entity: &EntityView) -> Decision {
        Decision::Idle
    }

    fn offspring(&self) -> Option<Self> {
        Some(Self)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ecosim_core::{
        EntityId, EntitySighting, EntityView, Equipment, Species, Vector2,
    };

    pub(crate) fn view(species: Species) -> EntityView {
        EntityView {
            id: EntityId::default(),
            species,
            position: Vector2::new(500.0, 500.0),
            velocity: Vector2::ZERO,
            max_speed: 100.0,
            base_max_speed: 100.0,
            energy: 50.0,
            max_energy: 100.0,
            health: 100.0,
            max_health: 100.0,
            age: 0.0,
            vision_range: 150.0,
            attack_range: 12.0,
            attack_ready: true,
            panic_enter_distance: 34.0,
            panic_exit_distance: 52.0,
            tribe: None,
            inventory: Vec::new(),
            equipment: Equipment::default(),
        }
    }

    pub(crate) fn sighting(
        id: EntityId,
        species: Species,
        distance: f32,
        direction: Vector2,
        energy: f32,
    ) -> EntitySighting {
        EntitySighting {
            id,
            distance,
            direction,
            velocity: Vector2::ZERO,
            energy,
            species,
        }
    }
}
