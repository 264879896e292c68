use crate::{EntityId, ItemKind, Station, Vector2};
use serde::{Deserialize, Serialize};

/// Extra clearance required between building footprints.
pub const PLACEMENT_MARGIN: f32 = 5.0;

/// Structures smart creatures can raise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
    FarmPlot,
    Campfire,
    StorageBox,
}

/// Static properties of a building kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingStats {
    pub max_health: f32,
    pub cost: &'static [(ItemKind, u32)],
    /// Interaction radius.
    pub radius: f32,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 4] = [
        BuildingKind::House,
        BuildingKind::FarmPlot,
        BuildingKind::Campfire,
        BuildingKind::StorageBox,
    ];

    #[must_use]
    pub const fn stats(self) -> BuildingStats {
        match self {
            BuildingKind::House => BuildingStats {
                max_health: 500.0,
                cost: &[(ItemKind::Wood, 25), (ItemKind::Stone, 10)],
                radius: 15.0,
            },
            BuildingKind::FarmPlot => BuildingStats {
                max_health: 100.0,
                cost: &[(ItemKind::Wood, 5), (ItemKind::Stone, 5)],
                radius: 5.0,
            },
            BuildingKind::Campfire => BuildingStats {
                max_health: 50.0,
                cost: &[(ItemKind::Wood, 5), (ItemKind::Stone, 2)],
                radius: 8.0,
            },
            BuildingKind::StorageBox => BuildingStats {
                max_health: 150.0,
                cost: &[(ItemKind::Wood, 10), (ItemKind::Stone, 4)],
                radius: 10.0,
            },
        }
    }

    /// Crafting stations usable next to this building.
    #[must_use]
    pub const fn stations(self) -> &'static [Station] {
        match self {
            BuildingKind::Campfire => &[Station::Campfire, Station::Furnace],
            BuildingKind::StorageBox => &[Station::Workbench],
            BuildingKind::House | BuildingKind::FarmPlot => &[],
        }
    }

    /// Type code used by policy observations.
    #[must_use]
    pub const fn code(self) -> f32 {
        match self {
            BuildingKind::House => 0.0,
            BuildingKind::FarmPlot => 0.33,
            BuildingKind::Campfire => 0.66,
            BuildingKind::StorageBox => 1.0,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BuildingKind::House => "house",
            BuildingKind::FarmPlot => "farm_plot",
            BuildingKind::Campfire => "campfire",
            BuildingKind::StorageBox => "storage_box",
        }
    }
}

/// A placed structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Building {
    pub kind: BuildingKind,
    pub position: Vector2,
    pub owner: Option<EntityId>,
    pub health: f32,
    pub max_health: f32,
    pub radius: f32,
    /// Seconds accumulated toward the next periodic effect.
    pub timer: f32,
}

impl Building {
    #[must_use]
    pub fn new(kind: BuildingKind, position: Vector2, owner: Option<EntityId>) -> Self {
        let stats = kind.stats();
        Self {
            kind,
            position,
            owner,
            health: stats.max_health,
            max_health: stats.max_health,
            radius: stats.radius,
            timer: 0.0,
        }
    }

    pub fn damage(&mut self, amount: f32) {
        self.health -= amount.max(0.0);
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    #[must_use]
    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Whether a new building at `position` would crowd this one.
    #[must_use]
    pub fn blocks(&self, position: Vector2) -> bool {
        self.position.distance_to(position) < self.radius + PLACEMENT_MARGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buildings_start_at_full_health() {
        let house = Building::new(BuildingKind::House, Vector2::new(10.0, 10.0), None);
        assert_eq!(house.health, 500.0);
        assert_eq!(house.radius, 15.0);
        assert_eq!(house.health_ratio(), 1.0);
    }

    #[test]
    fn damage_destroys() {
        let mut fire = Building::new(BuildingKind::Campfire, Vector2::ZERO, None);
        fire.damage(20.0);
        assert!(!fire.is_destroyed());
        assert!((fire.health_ratio() - 0.6).abs() < 1e-6);
        fire.damage(30.0);
        assert!(fire.is_destroyed());
    }

    #[test]
    fn footprint_blocks_nearby_placement() {
        let house = Building::new(BuildingKind::House, Vector2::new(100.0, 100.0), None);
        assert!(house.blocks(Vector2::new(119.0, 100.0)));
        assert!(!house.blocks(Vector2::new(120.0, 100.0)));
    }

    #[test]
    fn stations_follow_building_kind() {
        assert_eq!(
            BuildingKind::Campfire.stations(),
            &[Station::Campfire, Station::Furnace]
        );
        assert_eq!(BuildingKind::StorageBox.stations(), &[Station::Workbench]);
        assert!(BuildingKind::House.stations().is_empty());
    }
}
