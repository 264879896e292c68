use crate::{Inventory, ItemKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workplace a recipe requires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    /// No station needed.
    Manual,
    Campfire,
    Furnace,
    Workbench,
}

/// Reasons a craft attempt can fail. The inventory is untouched in every case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CraftError {
    #[error("missing {needed} x {item:?}")]
    MissingIngredient { item: ItemKind, needed: u32 },
    #[error("crafted result would exceed carrying capacity")]
    OverCapacity,
    #[error("recipe requires a {0:?} nearby")]
    StationUnavailable(Station),
    #[error("no recipe produces {0:?}")]
    UnknownRecipe(ItemKind),
}

/// A single crafting rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub output: ItemKind,
    pub amount: u32,
    pub ingredients: &'static [(ItemKind, u32)],
    pub station: Station,
}

impl Recipe {
    /// Whether the inventory holds every ingredient.
    #[must_use]
    pub fn has_ingredients(&self, inventory: &Inventory) -> bool {
        self.ingredients
            .iter()
            .all(|(item, count)| inventory.has(*item, *count))
    }

    /// Whether the station requirement is satisfied by `stations`.
    #[must_use]
    pub fn station_available(&self, stations: &[Station]) -> bool {
        self.station == Station::Manual || stations.contains(&self.station)
    }

    /// Inventory weight after the craft completes.
    #[must_use]
    pub fn projected_weight(&self, inventory: &Inventory) -> f32 {
        let consumed: f32 = self
            .ingredients
            .iter()
            .map(|(item, count)| item.weight() * *count as f32)
            .sum();
        inventory.current_weight() - consumed + self.output.weight() * self.amount as f32
    }
}

const CATALOG: &[Recipe] = &[
    Recipe {
        output: ItemKind::StonePickaxe,
        amount: 1,
        ingredients: &[(ItemKind::Wood, 2), (ItemKind::Stone, 3)],
        station: Station::Manual,
    },
    Recipe {
        output: ItemKind::StoneSpear,
        amount: 1,
        ingredients: &[(ItemKind::Wood, 3), (ItemKind::Stone, 1)],
        station: Station::Manual,
    },
    Recipe {
        output: ItemKind::CopperIngot,
        amount: 1,
        ingredients: &[(ItemKind::CopperOre, 1)],
        station: Station::Furnace,
    },
    Recipe {
        output: ItemKind::CopperPickaxe,
        amount: 1,
        ingredients: &[(ItemKind::Wood, 2), (ItemKind::CopperIngot, 3)],
        station: Station::Workbench,
    },
    Recipe {
        output: ItemKind::CopperSpear,
        amount: 1,
        ingredients: &[(ItemKind::Wood, 3), (ItemKind::CopperIngot, 1)],
        station: Station::Workbench,
    },
    Recipe {
        output: ItemKind::IronIngot,
        amount: 1,
        ingredients: &[(ItemKind::IronOre, 1)],
        station: Station::Furnace,
    },
    Recipe {
        output: ItemKind::IronPickaxe,
        amount: 1,
        ingredients: &[(ItemKind::Wood, 2), (ItemKind::IronIngot, 3)],
        station: Station::Workbench,
    },
    Recipe {
        output: ItemKind::IronSpear,
        amount: 1,
        ingredients: &[(ItemKind::Wood, 3), (ItemKind::IronIngot, 1)],
        station: Station::Workbench,
    },
    Recipe {
        output: ItemKind::LeatherBag,
        amount: 1,
        ingredients: &[(ItemKind::Leather, 5)],
        station: Station::Manual,
    },
    Recipe {
        output: ItemKind::LeatherArmor,
        amount: 1,
        ingredients: &[(ItemKind::Leather, 8)],
        station: Station::Manual,
    },
    Recipe {
        output: ItemKind::CookedMeat,
        amount: 1,
        ingredients: &[(ItemKind::Meat, 1), (ItemKind::Wood, 1)],
        station: Station::Campfire,
    },
];

/// Read-only view over the recipe catalog.
#[derive(Debug, Clone, Copy)]
pub struct RecipeBook {
    recipes: &'static [Recipe],
}

impl Default for RecipeBook {
    fn default() -> Self {
        Self { recipes: CATALOG }
    }
}

impl RecipeBook {
    #[must_use]
    pub fn recipes(&self) -> &'static [Recipe] {
        self.recipes
    }

    /// First recipe producing `output`.
    #[must_use]
    pub fn find(&self, output: ItemKind) -> Option<&'static Recipe> {
        self.recipes.iter().find(|recipe| recipe.output == output)
    }

    /// Recipes craftable right now with the given inventory and nearby stations.
    pub fn available<'a>(
        &self,
        inventory: &'a Inventory,
        stations: &'a [Station],
    ) -> impl Iterator<Item = &'static Recipe> + 'a {
        let recipes: &'static [Recipe] = self.recipes;
        recipes.iter().filter(move |recipe| {
            recipe.station_available(stations) && recipe.has_ingredients(inventory)
        })
    }

    /// Look up the recipe for `output` and craft it if the stations allow.
    pub fn craft_item(
        &self,
        output: ItemKind,
        inventory: &mut Inventory,
        stations: &[Station],
    ) -> Result<&'static Recipe, CraftError> {
        let recipe = self.find(output).ok_or(CraftError::UnknownRecipe(output))?;
        if !recipe.station_available(stations) {
            return Err(CraftError::StationUnavailable(recipe.station));
        }
        craft(recipe, inventory)?;
        Ok(recipe)
    }
}

/// Consume the ingredients and store the output, or change nothing.
pub fn craft(recipe: &Recipe, inventory: &mut Inventory) -> Result<(), CraftError> {
    if let Some((item, needed)) = recipe
        .ingredients
        .iter()
        .find(|(item, count)| !inventory.has(*item, *count))
    {
        return Err(CraftError::MissingIngredient {
            item: *item,
            needed: *needed,
        });
    }
    if recipe.projected_weight(inventory) > inventory.max_capacity() {
        return Err(CraftError::OverCapacity);
    }
    for (item, count) in recipe.ingredients {
        inventory.remove(*item, *count);
    }
    inventory.add(recipe.output, recipe.amount);
    Ok(())
}
