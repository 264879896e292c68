//! Creature data: bodies, per-species state and the dense entity arena.

use crate::config::{SpeciesConfig, WorldConfig};
use crate::{BrainBinding, EnergyModel, EntityId, Equipment, Inventory, PlantId, Vector2};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::HashSet;

/// Closed set of creature families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Herbivore,
    Predator,
    Smart,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Herbivore, Species::Predator, Species::Smart];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Species::Herbivore => "herbivore",
            Species::Predator => "predator",
            Species::Smart => "smart",
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What a creature is currently doing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    #[default]
    Idle,
    Searching,
    Eating,
    Fleeing,
    Hunting,
    Attacking,
    Gathering,
    Crafting,
    Building,
    Equipping,
}

/// Physical state shared by every creature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub position: Vector2,
    pub velocity: Vector2,
    /// Top speed at full energy.
    pub base_max_speed: f32,
    pub energy: f32,
    pub max_energy: f32,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    /// Seconds lived.
    pub age: f32,
    pub vision_range: f32,
    pub radius: f32,
}

impl Body {
    /// Top speed allowed by the current energy level.
    #[must_use]
    pub fn effective_max_speed(&self) -> f32 {
        EnergyModel::max_speed(self.base_max_speed, self.energy, self.max_energy)
    }

    #[must_use]
    pub fn energy_ratio(&self) -> f32 {
        if self.max_energy <= 0.0 {
            0.0
        } else {
            self.energy / self.max_energy
        }
    }

    /// Add energy up to the cap. Dead bodies stay dead.
    pub fn gain_energy(&mut self, amount: f32) {
        if !self.alive {
            return;
        }
        self.energy = (self.energy + amount).min(self.max_energy);
    }

    /// Restore health up to the cap.
    pub fn heal(&mut self, amount: f32) {
        if !self.alive {
            return;
        }
        self.health = (self.health + amount).min(self.max_health);
    }

    /// Lose `amount` health and half as much energy.
    pub fn take_damage(&mut self, amount: f32) {
        self.health -= amount;
        self.energy -= amount * 0.5;
        self.check_vitals();
    }

    /// Pay `amount` energy outright, dying if it runs out.
    pub fn spend_energy(&mut self, amount: f32) {
        self.energy -= amount;
        self.check_vitals();
    }

    fn check_vitals(&mut self) {
        if self.energy <= 0.0 || self.health <= 0.0 {
            self.alive = false;
        }
    }

    /// Advance motion and pay the energy bill for `dt` seconds.
    pub fn integrate(&mut self, dt: f32, model: &EnergyModel, species: Species) {
        self.velocity = self.velocity.clamp_magnitude(self.effective_max_speed());
        self.age += dt;
        self.position += self.velocity * dt;
        let speed = self.velocity.magnitude();
        self.energy -= model.movement_cost(species, speed, dt) + model.metabolic_cost(dt);
        self.check_vitals();
        self.energy = self.energy.min(self.max_energy);
    }
}

/// Breeding gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReproductionState {
    /// Energy required before breeding.
    pub threshold: f32,
    /// Seconds until breeding is allowed again.
    pub cooldown: f32,
}

impl ReproductionState {
    #[must_use]
    pub fn ready(&self, energy: f32) -> bool {
        energy >= self.threshold && self.cooldown <= 0.0
    }
}

/// Melee stats and timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Combat {
    pub range: f32,
    pub damage: f32,
    pub cooldown: f32,
    /// Seconds until the next strike; ready at or below zero.
    pub timer: f32,
}

impl Combat {
    #[must_use]
    pub fn ready(&self) -> bool {
        self.timer <= 0.0
    }
}

/// Fear hysteresis for grazers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HerbivoreState {
    pub panic_timer: f32,
    pub panic_enter_distance: f32,
    pub panic_exit_distance: f32,
    pub panic_min_duration: f32,
    /// Feeding is refused while this is positive.
    pub no_eat_timer: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PredatorState {
    pub combat: Combat,
}

/// Tribal tool users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartState {
    pub combat: Combat,
    pub tribe: u32,
    pub share_radius: f32,
    pub inventory: Inventory,
    pub equipment: Equipment,
}

/// Species-specific state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SpeciesState {
    Herbivore(HerbivoreState),
    Predator(PredatorState),
    Smart(Box<SmartState>),
}

/// A living (or freshly dead) creature.
#[derive(Debug, Clone)]
pub struct Entity {
    pub species: Species,
    pub body: Body,
    pub reproduction: ReproductionState,
    pub activity: Activity,
    /// Seconds until the wander heading is re-rolled.
    pub wander_timer: f32,
    /// Plant this creature is registered on as a consumer.
    pub eating: Option<PlantId>,
    pub brain: BrainBinding,
    pub state: SpeciesState,
}

impl Entity {
    /// Build a creature of `species` at `position` from the world configuration.
    #[must_use]
    pub fn new(species: Species, position: Vector2, config: &WorldConfig) -> Self {
        let tuning: &SpeciesConfig = config.species(species);
        let combat = Combat {
            range: tuning.attack_range,
            damage: tuning.attack_damage,
            cooldown: tuning.attack_cooldown,
            timer: 0.0,
        };
        let state = match species {
            Species::Herbivore => SpeciesState::Herbivore(HerbivoreState {
                panic_timer: 0.0,
                panic_enter_distance: config.panic.enter_distance,
                panic_exit_distance: config.panic.exit_distance,
                panic_min_duration: config.panic.min_duration,
                no_eat_timer: 0.0,
            }),
            Species::Predator => SpeciesState::Predator(PredatorState { combat }),
            Species::Smart => SpeciesState::Smart(Box::new(SmartState {
                combat,
                tribe: config.tribe.default_tribe,
                share_radius: config.tribe.share_radius,
                inventory: Inventory::new(config.tribe.inventory_capacity),
                equipment: Equipment::default(),
            })),
        };
        Self {
            species,
            body: Body {
                position,
                velocity: Vector2::ZERO,
                base_max_speed: tuning.max_speed,
                energy: tuning.initial_energy,
                max_energy: tuning.max_energy,
                health: tuning.max_health,
                max_health: tuning.max_health,
                alive: tuning.initial_energy > 0.0 && tuning.max_health > 0.0,
                age: 0.0,
                vision_range: tuning.vision_range,
                radius: tuning.radius,
            },
            reproduction: ReproductionState {
                threshold: tuning.reproduction_threshold,
                cooldown: 0.0,
            },
            activity: Activity::Idle,
            wander_timer: 0.0,
            eating: None,
            brain: BrainBinding::unbound(),
            state,
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.body.alive
    }

    #[must_use]
    pub fn combat(&self) -> Option<&Combat> {
        match &self.state {
            SpeciesState::Herbivore(_) => None,
            SpeciesState::Predator(state) => Some(&state.combat),
            SpeciesState::Smart(state) => Some(&state.combat),
        }
    }

    pub fn combat_mut(&mut self) -> Option<&mut Combat> {
        match &mut self.state {
            SpeciesState::Herbivore(_) => None,
            SpeciesState::Predator(state) => Some(&mut state.combat),
            SpeciesState::Smart(state) => Some(&mut state.combat),
        }
    }

    #[must_use]
    pub fn herbivore(&self) -> Option<&HerbivoreState> {
        match &self.state {
            SpeciesState::Herbivore(state) => Some(state),
            _ => None,
        }
    }

    pub fn herbivore_mut(&mut self) -> Option<&mut HerbivoreState> {
        match &mut self.state {
            SpeciesState::Herbivore(state) => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn smart(&self) -> Option<&SmartState> {
        match &self.state {
            SpeciesState::Smart(state) => Some(state),
            _ => None,
        }
    }

    pub fn smart_mut(&mut self) -> Option<&mut SmartState> {
        match &mut self.state {
            SpeciesState::Smart(state) => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn tribe(&self) -> Option<u32> {
        self.smart().map(|state| state.tribe)
    }

    /// Strike strength at the current energy level.
    #[must_use]
    pub fn attack_damage(&self) -> f32 {
        let ratio = self.body.energy_ratio().max(0.0);
        match &self.state {
            SpeciesState::Herbivore(_) => 0.0,
            SpeciesState::Predator(state) => state.combat.damage * (0.3 + 1.2 * ratio),
            SpeciesState::Smart(state) => {
                let base = state
                    .equipment
                    .weapon_damage()
                    .unwrap_or(state.combat.damage);
                base * (0.5 + 0.6 * ratio)
            }
        }
    }

    /// Apply an incoming hit after armor.
    pub fn receive_damage(&mut self, raw: f32) {
        let defense = self
            .smart()
            .map_or(0.0, |state| state.equipment.defense());
        self.body.take_damage(raw * (1.0 - defense));
    }

    /// Physics step plus timers that tick with it.
    pub fn integrate(&mut self, dt: f32, model: &EnergyModel) {
        self.body.integrate(dt, model, self.species);
        if self.reproduction.cooldown > 0.0 {
            self.reproduction.cooldown -= dt;
        }
    }

    #[must_use]
    pub fn can_reproduce(&self) -> bool {
        self.body.alive && self.reproduction.ready(self.body.energy)
    }
}

/// Dense creature storage addressed by generational handles.
///
/// Iteration follows insertion order; bulk removal keeps the survivors' relative order so a
/// seeded run visits creatures identically every time.
#[derive(Debug, Default)]
pub struct EntityArena {
    slots: SlotMap<EntityId, usize>,
    handles: Vec<EntityId>,
    entities: Vec<Entity>,
}

impl EntityArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            handles: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Handles in dense iteration order.
    pub fn iter_handles(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.handles.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.handles.iter().copied().zip(self.entities.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> + '_ {
        self.handles.iter().copied().zip(self.entities.iter_mut())
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(id)
    }

    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|index| &self.entities[index])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let index = self.index_of(id)?;
        Some(&mut self.entities[index])
    }

    /// Mutable access to two distinct creatures at once.
    pub fn get2_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (low, high) = self.entities.split_at_mut(ib);
            Some((&mut low[ia], &mut high[0]))
        } else {
            let (low, high) = self.entities.split_at_mut(ia);
            Some((&mut high[0], &mut low[ib]))
        }
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let index = self.entities.len();
        self.entities.push(entity);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Remove one creature. Swaps the last creature into its slot.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.slots.remove(id)?;
        let removed = self.entities.swap_remove(index);
        self.handles.swap_remove(index);
        if let Some(moved) = self.handles.get(index).copied() {
            if let Some(slot) = self.slots.get_mut(moved) {
                *slot = index;
            }
        }
        Some(removed)
    }

    /// Remove every id in `dead`, preserving the order of survivors.
    pub fn remove_many(&mut self, dead: &HashSet<EntityId>) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let before = self.entities.len();
        let handles = std::mem::take(&mut self.handles);
        let entities = std::mem::take(&mut self.entities);
        for (id, entity) in handles.into_iter().zip(entities) {
            if dead.contains(&id) {
                self.slots.remove(id);
                continue;
            }
            if let Some(slot) = self.slots.get_mut(id) {
                *slot = self.handles.len();
            }
            self.handles.push(id);
            self.entities.push(entity);
        }
        before - self.entities.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.handles.clear();
        self.entities.clear();
    }
}
