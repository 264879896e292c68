use crate::Species;
use serde::{Deserialize, Serialize};

/// Per-species movement cost coefficients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovementCoefficients {
    pub herbivore: f32,
    pub predator: f32,
    pub smart: f32,
}

impl Default for MovementCoefficients {
    fn default() -> Self {
        Self {
            herbivore: 0.0003,
            predator: 0.001,
            smart: 0.0002,
        }
    }
}

impl MovementCoefficients {
    #[must_use]
    pub const fn for_species(&self, species: Species) -> f32 {
        match species {
            Species::Herbivore => self.herbivore,
            Species::Predator => self.predator,
            Species::Smart => self.smart,
        }
    }
}

/// Energy bookkeeping shared by every creature.
///
/// Moving costs `speed² × coefficient × dt`; simply being alive costs `metabolic_rate × dt`.
/// Available top speed shrinks with the square root of the remaining energy ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnergyModel {
    pub metabolic_rate: f32,
    pub movement: MovementCoefficients,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            metabolic_rate: 0.000_005,
            movement: MovementCoefficients::default(),
        }
    }
}

impl EnergyModel {
    #[must_use]
    pub fn movement_cost(&self, species: Species, speed: f32, dt: f32) -> f32 {
        speed * speed * self.movement.for_species(species) * dt
    }

    #[must_use]
    pub fn metabolic_cost(&self, dt: f32) -> f32 {
        self.metabolic_rate * dt
    }

    /// Top speed available at the given energy level.
    #[must_use]
    pub fn max_speed(base: f32, energy: f32, max_energy: f32) -> f32 {
        if max_energy <= 0.0 {
            return 0.0;
        }
        let ratio = (energy / max_energy).clamp(0.0, 1.0);
        base * ratio.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_cost_scales_with_square_of_speed() {
        let model = EnergyModel::default();
        let slow = model.movement_cost(Species::Predator, 10.0, 1.0);
        let fast = model.movement_cost(Species::Predator, 20.0, 1.0);
        assert!((slow - 0.1).abs() < 1e-6);
        assert!((fast - 4.0 * slow).abs() < 1e-6);
        assert!(
            model.movement_cost(Species::Smart, 10.0, 1.0)
                < model.movement_cost(Species::Herbivore, 10.0, 1.0)
        );
    }

    #[test]
    fn max_speed_follows_energy_ratio() {
        assert!((EnergyModel::max_speed(80.0, 100.0, 100.0) - 80.0).abs() < 1e-6);
        assert!((EnergyModel::max_speed(80.0, 25.0, 100.0) - 40.0).abs() < 1e-6);
        assert_eq!(EnergyModel::max_speed(80.0, -5.0, 100.0), 0.0);
        assert_eq!(EnergyModel::max_speed(80.0, 500.0, 100.0), 80.0);
        assert_eq!(EnergyModel::max_speed(80.0, 10.0, 0.0), 0.0);
    }
}
