//! Neural policy brains and the plumbing that shares one model across many creatures.

use crate::observation::{encode, observation_size};
use crate::{Brain, BrainKind, into_runner};
use ecosim_core::{
    BrainRegistry, Decision, EntityId, EntityView, PlantId, SensorSnapshot, Species, Vector2,
};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outputs per inference: heading x, heading y, speed factor.
pub const ACTION_SIZE: usize = 3;

/// Read-only model mapping an observation to a raw action.
pub trait InferenceModel: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Observation width the model was built for.
    fn observation_size(&self) -> usize;

    /// Raw action in roughly `[-1, 1]`, or `None` when the model cannot answer.
    fn infer(&self, observation: &[f32]) -> Option<[f32; ACTION_SIZE]>;

    fn is_loaded(&self) -> bool {
        true
    }
}

/// Stand-in for a model that failed to load. Brains backed by it idle.
#[derive(Debug, Clone, Copy)]
pub struct UnloadedModel {
    observation_size: usize,
}

impl UnloadedModel {
    #[must_use]
    pub const fn new(observation_size: usize) -> Self {
        Self { observation_size }
    }
}

impl InferenceModel for UnloadedModel {
    fn kind(&self) -> &'static str {
        "unloaded"
    }

    fn observation_size(&self) -> usize {
        self.observation_size
    }

    fn infer(&self, _observation: &[f32]) -> Option<[f32; ACTION_SIZE]> {
        None
    }

    fn is_loaded(&self) -> bool {
        false
    }
}

const EAT_ENTER_DISTANCE: f32 = 12.0;
const EAT_KEEP_DISTANCE: f32 = 16.0;
const MOVE_HOLD: (f32, f32) = (0.10, 0.30);
const EAT_HOLD: (f32, f32) = (0.14, 0.26);
const MIN_HEADING: f32 = 0.12;
const FALLBACK_FLEE_ENERGY: f32 = 15.0;
const FALLBACK_CRUISE_SPEED: f32 = 0.3;
const EDGE_MARGIN: f32 = 22.0;
const EDGE_WEIGHT: f32 = 0.55;
const SMOOTHING: f32 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Remembered {
    Eat { plant: PlantId },
    Move { direction: Vector2, speed: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Memory {
    until_age: f32,
    decision: Remembered,
}

/// Stabilisation state for the creature this brain currently steers.
#[derive(Debug, Clone, Copy)]
struct Steering {
    owner: EntityId,
    memory: Option<Memory>,
    last_heading: Option<Vector2>,
}

impl Steering {
    const fn new(owner: EntityId) -> Self {
        Self {
            owner,
            memory: None,
            last_heading: None,
        }
    }
}

/// Brain that asks an [`InferenceModel`] for a heading and speed.
///
/// Herbivore policies get extra stabilisation: a short decision memory so the creature does
/// not twitch every tick, an eating shortcut, a push away from the map edge and heading
/// smoothing.
pub struct PolicyBrain {
    model: Arc<dyn InferenceModel>,
    species: Species,
    seed: u64,
    rng: SmallRng,
    steering: Option<Steering>,
}

impl fmt::Debug for PolicyBrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyBrain")
            .field("model", &self.model.kind())
            .field("species", &self.species)
            .field("steering", &self.steering)
            .finish_non_exhaustive()
    }
}

impl PolicyBrain {
    pub const KIND: BrainKind = BrainKind::new("policy.shared");

    #[must_use]
    pub fn new(model: Arc<dyn InferenceModel>, species: Species, seed: u64) -> Self {
        Self {
            model,
            species,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            steering: None,
        }
    }

    #[must_use]
    pub fn model(&self) -> &Arc<dyn InferenceModel> {
        &self.model
    }

    #[must_use]
    pub const fn species(&self) -> Species {
        self.species
    }

    /// Id of the creature whose memory and heading are held, if any.
    #[must_use]
    pub fn steered(&self) -> Option<EntityId> {
        self.steering.map(|steering| steering.owner)
    }

    /// State for `owner`. A different owner than last time starts from scratch.
    fn steering_for(&mut self, owner: EntityId) -> &mut Steering {
        let steering = self.steering.get_or_insert(Steering::new(owner));
        if steering.owner != owner {
            *steering = Steering::new(owner);
        }
        steering
    }

    fn remember(&mut self, entity: &EntityView, decision: Remembered, (low, high): (f32, f32)) {
        let hold = self.rng.random_range(low..high);
        self.steering_for(entity.id).memory = Some(Memory {
            until_age: entity.age + hold,
            decision,
        });
    }

    fn recall(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Option<Decision> {
        let steering = self.steering_for(entity.id);
        let memory = steering.memory.take()?;
        if entity.age >= memory.until_age {
            return None;
        }
        let recalled = match memory.decision {
            Remembered::Eat { plant } => sensors
                .nearby_plants
                .iter()
                .find(|sighting| sighting.id == plant && sighting.distance <= EAT_KEEP_DISTANCE)
                .map(|sighting| Decision::Eat {
                    plant,
                    direction: sighting.direction,
                }),
            Remembered::Move { direction, speed } if direction.magnitude() > 0.0 => {
                Some(Decision::Move { direction, speed })
            }
            Remembered::Move { .. } => None,
        };
        if recalled.is_some() {
            steering.memory = Some(memory);
        }
        recalled
    }

    /// Heading used when the policy output is too weak to trust.
    fn fallback_heading(sensors: &SensorSnapshot, entity: &EntityView) -> Vector2 {
        let threat = sensors
            .nearby_predators
            .iter()
            .chain(&sensors.nearby_smarts)
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(threat) = threat {
            if entity.energy > FALLBACK_FLEE_ENERGY {
                return (-threat.direction).normalize();
            }
        }
        let plant = sensors
            .nearby_plants
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(plant) = plant {
            return if plant.direction.magnitude() > 0.0 {
                plant.direction.normalize()
            } else {
                Vector2::new(1.0, 0.0)
            };
        }
        if entity.velocity.magnitude() > FALLBACK_CRUISE_SPEED {
            entity.velocity.normalize()
        } else {
            Vector2::ZERO
        }
    }

    fn edge_push(sensors: &SensorSnapshot, position: Vector2) -> Vector2 {
        let axis = |value: f32, extent: f32| {
            if value < EDGE_MARGIN {
                (EDGE_MARGIN - value) / EDGE_MARGIN
            } else if value > extent - EDGE_MARGIN {
                -(value - (extent - EDGE_MARGIN)) / EDGE_MARGIN
            } else {
                0.0
            }
        };
        Vector2::new(
            axis(position.x, sensors.world_width),
            axis(position.y, sensors.world_height),
        )
    }

    fn stabilise(
        &mut self,
        sensors: &SensorSnapshot,
        entity: &EntityView,
        mut direction: Vector2,
    ) -> Vector2 {
        let push = Self::edge_push(sensors, entity.position);
        if push.magnitude() > 0.0 {
            let push = push.normalize();
            direction = if direction.magnitude() > 0.0 {
                direction * (1.0 - EDGE_WEIGHT) + push * EDGE_WEIGHT
            } else {
                push
            };
        }
        let steering = self.steering_for(entity.id);
        if let Some(previous) = steering.last_heading {
            if previous.magnitude() > 0.0 && direction.magnitude() > 0.0 {
                direction = previous * SMOOTHING + direction * (1.0 - SMOOTHING);
            }
        }
        if direction.magnitude() > 0.0 {
            direction = direction.normalize();
            steering.last_heading = Some(direction);
        }
        direction
    }
}

impl Brain for PolicyBrain {
    fn kind(&self) -> BrainKind {
        Self::KIND
    }

    fn decide(&mut self, sensors: &SensorSnapshot, entity: &EntityView) -> Decision {
        if !self.model.is_loaded() {
            return Decision::Idle;
        }
        let herbivore = self.species == Species::Herbivore;

        if herbivore {
            if let Some(decision) = self.recall(sensors, entity) {
                return decision;
            }
            let food = sensors
                .nearby_plants
                .iter()
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
                .filter(|plant| plant.distance <= EAT_ENTER_DISTANCE)
                .copied();
            if let Some(plant) = food {
                self.remember(entity, Remembered::Eat { plant: plant.id }, EAT_HOLD);
                return Decision::Eat {
                    plant: plant.id,
                    direction: plant.direction,
                };
            }
        }

        let observation = encode(self.species, sensors, entity);
        let Some(action) = self.model.infer(&observation) else {
            return Decision::Idle;
        };
        let [x, y, throttle] = action.map(|value| value.clamp(-1.0, 1.0));

        let mut direction = Vector2::new(x, y);
        if direction.magnitude() > MIN_HEADING {
            direction = direction.normalize();
        } else if herbivore {
            direction = Self::fallback_heading(sensors, entity);
        }

        let throttle = (throttle + 1.0) / 2.0;
        let factor = match self.species {
            Species::Predator => 0.3 + 0.7 * throttle,
            Species::Herbivore | Species::Smart => 0.2 + 0.8 * throttle,
        };
        let speed = factor * entity.max_speed;

        if herbivore {
            direction = self.stabilise(sensors, entity, direction);
            if direction.magnitude() > 0.0 {
                self.remember(entity, Remembered::Move { direction, speed }, MOVE_HOLD);
            }
        }
        Decision::Move { direction, speed }
    }

    fn offspring(&self) -> Option<Self> {
        let seed = self.seed.rotate_left(17) ^ 0x9E37_79B9_7F4A_7C15;
        Some(Self::new(Arc::clone(&self.model), self.species, seed))
    }
}

/// One loaded model handed out to every creature of a species.
#[derive(Clone)]
pub struct SharedPolicy {
    model: Arc<dyn InferenceModel>,
    species: Species,
}

impl fmt::Debug for SharedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPolicy")
            .field("model", &self.model.kind())
            .field("species", &self.species)
            .finish()
    }
}

impl SharedPolicy {
    #[must_use]
    pub fn new(model: Arc<dyn InferenceModel>, species: Species) -> Self {
        Self { model, species }
    }

    #[must_use]
    pub fn model(&self) -> &Arc<dyn InferenceModel> {
        &self.model
    }

    #[must_use]
    pub const fn species(&self) -> Species {
        self.species
    }

    /// Thin per-creature brain around the shared model.
    #[must_use]
    pub fn attach(&self, seed: u64) -> PolicyBrain {
        PolicyBrain::new(Arc::clone(&self.model), self.species, seed)
    }

    /// Register a factory whose runners all wrap this model.
    pub fn register(&self, registry: &mut BrainRegistry) -> u64 {
        let policy = self.clone();
        registry.register(PolicyBrain::KIND.as_str(), move |rng| {
            into_runner(policy.attach(rng.next_u64()))
        })
    }
}

/// Loaded models keyed by species and weights path; each pair is loaded at most once.
#[derive(Default)]
pub struct PolicyCache {
    entries: HashMap<(Species, PathBuf), Arc<dyn InferenceModel>>,
}

impl fmt::Debug for PolicyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl PolicyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `(species, path)`, loading it on first use.
    ///
    /// A failed load is logged and cached as an [`UnloadedModel`], so creatures using it idle
    /// and the file is not retried.
    pub fn get_or_load<F, E>(
        &mut self,
        species: Species,
        path: &Path,
        loader: F,
    ) -> Arc<dyn InferenceModel>
    where
        F: FnOnce(&Path) -> Result<Arc<dyn InferenceModel>, E>,
        E: fmt::Display,
    {
        let key = (species, path.to_path_buf());
        if let Some(model) = self.entries.get(&key) {
            return Arc::clone(model);
        }
        let model = match loader(path) {
            Ok(model) => {
                info!(%species, path = %path.display(), kind = model.kind(), "loaded policy");
                model
            }
            Err(error) => {
                warn!(
                    %species,
                    path = %path.display(),
                    %error,
                    "failed to load policy; creatures will idle"
                );
                Arc::new(UnloadedModel::new(observation_size(species))) as Arc<dyn InferenceModel>
            }
        };
        self.entries.insert(key, Arc::clone(&model));
        model
    }

    /// [`SharedPolicy`] for the cached model.
    pub fn policy<F, E>(&mut self, species: Species, path: &Path, loader: F) -> SharedPolicy
    where
        F: FnOnce(&Path) -> Result<Arc<dyn InferenceModel>, E>,
        E: fmt::Display,
    {
        SharedPolicy::new(self.get_or_load(species, path, loader), species)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
