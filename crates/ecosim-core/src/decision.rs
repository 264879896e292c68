//! Brain-facing decision protocol and the registry that spawns brain runners.

use crate::{BuildingKind, EntityId, EntityView, ItemKind, PlantId, ResourceId, SensorSnapshot, Vector2};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// One tick's intent for a single creature.
///
/// Payload ids are validated by the controller when the decision is executed; stale or
/// out-of-range targets turn the decision into a no-op.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Move { direction: Vector2, speed: f32 },
    Flee { direction: Vector2, speed: f32 },
    Eat { plant: PlantId, direction: Vector2 },
    Attack { target: EntityId, direction: Vector2 },
    Gather { resource: ResourceId, direction: Vector2 },
    Craft { item: ItemKind },
    Build { kind: BuildingKind },
    Equip { item: ItemKind },
    Wander { speed: f32 },
    #[default]
    Idle,
}

/// Payload-free discriminant of [`Decision`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Move,
    Flee,
    Eat,
    Attack,
    Gather,
    Craft,
    Build,
    Equip,
    Wander,
    Idle,
}

impl Decision {
    #[must_use]
    pub const fn kind(&self) -> DecisionKind {
        match self {
            Decision::Move { .. } => DecisionKind::Move,
            Decision::Flee { .. } => DecisionKind::Flee,
            Decision::Eat { .. } => DecisionKind::Eat,
            Decision::Attack { .. } => DecisionKind::Attack,
            Decision::Gather { .. } => DecisionKind::Gather,
            Decision::Craft { .. } => DecisionKind::Craft,
            Decision::Build { .. } => DecisionKind::Build,
            Decision::Equip { .. } => DecisionKind::Equip,
            Decision::Wander { .. } => DecisionKind::Wander,
            Decision::Idle => DecisionKind::Idle,
        }
    }

    /// Heading carried by the decision, if any.
    #[must_use]
    pub const fn direction(&self) -> Option<Vector2> {
        match *self {
            Decision::Move { direction, .. }
            | Decision::Flee { direction, .. }
            | Decision::Eat { direction, .. }
            | Decision::Attack { direction, .. }
            | Decision::Gather { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Requested speed; zero for decisions that do not move the creature.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        match *self {
            Decision::Move { speed, .. }
            | Decision::Flee { speed, .. }
            | Decision::Wander { speed } => speed,
            _ => 0.0,
        }
    }
}

/// Anything that can pick a [`Decision`] for a creature each tick.
pub trait BrainRunner: Send + Sync {
    /// Label recorded in registries and bindings, such as `heuristic.herbivore`.
    fn kind(&self) -> &'static str;

    /// Pick this tick's decision. Brains only see the snapshot and never touch the world.
    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision;

    /// Runner for a newborn when the parent's brain is not registry-backed.
    fn offspring(&self) -> Option<Box<dyn BrainRunner>> {
        None
    }
}

type Factory = Box<dyn Fn(&mut dyn RngCore) -> Box<dyn BrainRunner> + Send + Sync + 'static>;

struct Registration {
    kind: Cow<'static, str>,
    build: Factory,
}

/// Brain factories owned by a world.
///
/// A key names one factory. Every creature bound through that key gets its own runner, and a
/// newborn of a bound parent gets a fresh runner from the parent's key.
#[derive(Default)]
pub struct BrainRegistry {
    next_key: u64,
    registrations: BTreeMap<u64, Registration>,
}

impl fmt::Debug for BrainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.registrations
                    .iter()
                    .map(|(key, registration)| (key, registration.kind.as_ref())),
            )
            .finish()
    }
}

impl BrainRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory for brains labelled `kind`. Keys are never reused.
    pub fn register<F>(&mut self, kind: impl Into<Cow<'static, str>>, factory: F) -> u64
    where
        F: Fn(&mut dyn RngCore) -> Box<dyn BrainRunner> + Send + Sync + 'static,
    {
        let key = self.next_key;
        self.next_key += 1;
        self.registrations.insert(
            key,
            Registration {
                kind: kind.into(),
                build: Box::new(factory),
            },
        );
        key
    }

    /// Drop a factory. Creatures already bound keep their runners.
    pub fn unregister(&mut self, key: u64) -> bool {
        self.registrations.remove(&key).is_some()
    }

    pub fn spawn(&self, rng: &mut dyn RngCore, key: u64) -> Option<Box<dyn BrainRunner>> {
        let registration = self.registrations.get(&key)?;
        Some((registration.build)(rng))
    }

    #[must_use]
    pub fn kind(&self, key: u64) -> Option<&str> {
        self.registrations
            .get(&key)
            .map(|registration| registration.kind.as_ref())
    }

    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.registrations.contains_key(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Where a creature's runner came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Registry(u64),
    Direct,
}

/// The brain steering one creature, if any.
///
/// Cloning keeps the label and registry key but not the runner, so a cloned creature is
/// steered by its species heuristic until it is bound again.
#[derive(Default)]
pub struct BrainBinding {
    runner: Option<Box<dyn BrainRunner>>,
    origin: Option<Origin>,
    kind: Option<String>,
}

impl Clone for BrainBinding {
    fn clone(&self) -> Self {
        Self {
            runner: None,
            origin: self.origin,
            kind: self.kind.clone(),
        }
    }
}

impl fmt::Debug for BrainBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BrainBinding({}", self.describe())?;
        if self.origin.is_some() && !self.is_bound() {
            f.write_str(", detached")?;
        }
        f.write_str(")")
    }
}

impl BrainBinding {
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Steer with `runner` directly, bypassing the registry.
    #[must_use]
    pub fn with_runner(runner: Box<dyn BrainRunner>) -> Self {
        Self {
            kind: Some(runner.kind().to_owned()),
            runner: Some(runner),
            origin: Some(Origin::Direct),
        }
    }

    /// Build a runner from the factory under `key`. `None` for unknown keys.
    #[must_use]
    pub fn from_registry(
        registry: &BrainRegistry,
        rng: &mut dyn RngCore,
        key: u64,
    ) -> Option<Self> {
        Some(Self {
            runner: Some(registry.spawn(rng, key)?),
            origin: Some(Origin::Registry(key)),
            kind: registry.kind(key).map(str::to_owned),
        })
    }

    #[must_use]
    pub fn registry_key(&self) -> Option<u64> {
        match self.origin {
            Some(Origin::Registry(key)) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.runner.is_some()
    }

    /// `kind#key` for registry brains, the bare kind for direct ones, `unbound` otherwise.
    #[must_use]
    pub fn describe(&self) -> Cow<'_, str> {
        match (self.origin, self.kind.as_deref()) {
            (Some(Origin::Registry(key)), Some(kind)) => Cow::Owned(format!("{kind}#{key}")),
            (Some(Origin::Registry(key)), None) => Cow::Owned(format!("#{key}")),
            (_, Some(kind)) => Cow::Borrowed(kind),
            (_, None) => Cow::Borrowed("unbound"),
        }
    }

    /// The runner's decision; `None` when nothing is attached.
    pub fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Option<Decision> {
        let runner = self.runner.as_mut()?;
        Some(runner.decide(sensors, entity))
    }

    /// Binding for a newborn.
    ///
    /// Registry brains respawn from the parent's key while it is still registered. Direct
    /// runners may hand out a child runner. Everything else yields an unbound newborn.
    #[must_use]
    pub fn offspring(&self, registry: &BrainRegistry, rng: &mut dyn RngCore) -> Self {
        let respawned = self
            .registry_key()
            .and_then(|key| Self::from_registry(registry, rng, key));
        if let Some(binding) = respawned {
            return binding;
        }
        match self.runner.as_ref().and_then(|runner| runner.offspring()) {
            Some(child) => Self::with_runner(child),
            None => Self::unbound(),
        }
    }
}
