use serde::{Deserialize, Serialize};

/// Every item a creature can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Wood,
    Stone,
    CopperOre,
    IronOre,
    Coal,
    Meat,
    Leather,
    CookedMeat,
    HealingHerb,
    CopperIngot,
    IronIngot,
    StonePickaxe,
    CopperPickaxe,
    IronPickaxe,
    StoneSpear,
    CopperSpear,
    IronSpear,
    LeatherBag,
    LeatherArmor,
}

/// Broad grouping used by the equipment rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Resource,
    Tool,
    Weapon,
    Armor,
    Consumable,
}

/// Static properties of an item kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStats {
    pub weight: f32,
    pub max_stack: u32,
    pub category: ItemCategory,
    pub damage: f32,
    /// Gathering speed multiplier.
    pub efficiency: f32,
    pub durability: f32,
    /// Fraction of incoming damage absorbed.
    pub defense: f32,
    /// Extra carrying capacity granted while equipped.
    pub carry_bonus: f32,
    pub energy_gain: f32,
    pub heal_amount: f32,
}

impl ItemStats {
    const fn resource(weight: f32) -> Self {
        Self {
            weight,
            max_stack: 64,
            category: ItemCategory::Resource,
            damage: 0.0,
            efficiency: 1.0,
            durability: 100.0,
            defense: 0.0,
            carry_bonus: 0.0,
            energy_gain: 0.0,
            heal_amount: 0.0,
        }
    }

    const fn food(weight: f32, energy_gain: f32, heal_amount: f32) -> Self {
        Self {
            category: ItemCategory::Consumable,
            energy_gain,
            heal_amount,
            ..Self::resource(weight)
        }
    }

    const fn gear(
        weight: f32,
        category: ItemCategory,
        damage: f32,
        efficiency: f32,
        durability: f32,
    ) -> Self {
        Self {
            max_stack: 1,
            category,
            damage,
            efficiency,
            durability,
            ..Self::resource(weight)
        }
    }
}

impl ItemKind {
    pub const ALL: [ItemKind; 19] = [
        ItemKind::Wood,
        ItemKind::Stone,
        ItemKind::CopperOre,
        ItemKind::IronOre,
        ItemKind::Coal,
        ItemKind::Meat,
        ItemKind::Leather,
        ItemKind::CookedMeat,
        ItemKind::HealingHerb,
        ItemKind::CopperIngot,
        ItemKind::IronIngot,
        ItemKind::StonePickaxe,
        ItemKind::CopperPickaxe,
        ItemKind::IronPickaxe,
        ItemKind::StoneSpear,
        ItemKind::CopperSpear,
        ItemKind::IronSpear,
        ItemKind::LeatherBag,
        ItemKind::LeatherArmor,
    ];

    /// Static stats table lookup.
    #[must_use]
    pub const fn stats(self) -> ItemStats {
        use ItemCategory::{Armor, Tool, Weapon};
        match self {
            ItemKind::Wood => ItemStats::resource(0.5),
            ItemKind::Stone => ItemStats::resource(1.0),
            ItemKind::CopperOre => ItemStats::resource(1.2),
            ItemKind::IronOre => ItemStats::resource(1.5),
            ItemKind::Coal => ItemStats::resource(0.3),
            ItemKind::Leather => ItemStats::resource(0.1),
            ItemKind::CopperIngot => ItemStats::resource(1.0),
            ItemKind::IronIngot => ItemStats::resource(1.3),
            ItemKind::Meat => ItemStats::food(0.2, 25.0, 0.0),
            ItemKind::CookedMeat => ItemStats::food(0.2, 60.0, 10.0),
            ItemKind::HealingHerb => ItemStats::food(0.1, 5.0, 35.0),
            ItemKind::StonePickaxe => ItemStats::gear(2.0, Tool, 5.0, 1.5, 50.0),
            ItemKind::CopperPickaxe => ItemStats::gear(2.5, Tool, 8.0, 2.5, 150.0),
            ItemKind::IronPickaxe => ItemStats::gear(3.0, Tool, 12.0, 4.0, 300.0),
            ItemKind::StoneSpear => ItemStats::gear(1.5, Weapon, 15.0, 1.0, 50.0),
            ItemKind::CopperSpear => ItemStats::gear(2.0, Weapon, 25.0, 1.0, 150.0),
            ItemKind::IronSpear => ItemStats::gear(2.5, Weapon, 40.0, 1.0, 300.0),
            ItemKind::LeatherBag => ItemStats {
                carry_bonus: 50.0,
                ..ItemStats::gear(0.5, Armor, 0.0, 1.0, 100.0)
            },
            ItemKind::LeatherArmor => ItemStats {
                defense: 0.2,
                ..ItemStats::gear(1.0, Armor, 0.0, 1.0, 100.0)
            },
        }
    }

    #[must_use]
    pub const fn weight(self) -> f32 {
        self.stats().weight
    }

    #[must_use]
    pub const fn category(self) -> ItemCategory {
        self.stats().category
    }

    /// Snake-case label used in logs and serialized summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ItemKind::Wood => "wood",
            ItemKind::Stone => "stone",
            ItemKind::CopperOre => "copper_ore",
            ItemKind::IronOre => "iron_ore",
            ItemKind::Coal => "coal",
            ItemKind::Meat => "meat",
            ItemKind::Leather => "leather",
            ItemKind::CookedMeat => "cooked_meat",
            ItemKind::HealingHerb => "healing_herb",
            ItemKind::CopperIngot => "copper_ingot",
            ItemKind::IronIngot => "iron_ingot",
            ItemKind::StonePickaxe => "stone_pickaxe",
            ItemKind::CopperPickaxe => "copper_pickaxe",
            ItemKind::IronPickaxe => "iron_pickaxe",
            ItemKind::StoneSpear => "stone_spear",
            ItemKind::CopperSpear => "copper_spear",
            ItemKind::IronSpear => "iron_spear",
            ItemKind::LeatherBag => "leather_bag",
            ItemKind::LeatherArmor => "leather_armor",
        }
    }

    /// Material tier in `[0, 1]` used when encoding equipment for policies.
    #[must_use]
    pub const fn tier(self) -> f32 {
        match self {
            ItemKind::StonePickaxe | ItemKind::StoneSpear => 0.2,
            ItemKind::CopperPickaxe | ItemKind::CopperSpear => 0.5,
            ItemKind::IronPickaxe | ItemKind::IronSpear => 1.0,
            _ => 0.1,
        }
    }
}

/// Slots a creature can fill with gear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Tool,
    Armor,
    Bag,
}

impl EquipmentSlot {
    /// Slot an item goes into, or `None` for items that cannot be equipped.
    #[must_use]
    pub const fn for_item(item: ItemKind) -> Option<Self> {
        match item {
            ItemKind::LeatherBag => Some(Self::Bag),
            _ => match item.category() {
                ItemCategory::Weapon => Some(Self::Weapon),
                ItemCategory::Tool => Some(Self::Tool),
                ItemCategory::Armor => Some(Self::Armor),
                ItemCategory::Resource | ItemCategory::Consumable => None,
            },
        }
    }
}

/// Items currently worn or wielded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equipment {
    pub weapon: Option<ItemKind>,
    pub tool: Option<ItemKind>,
    pub armor: Option<ItemKind>,
    pub bag: Option<ItemKind>,
}

impl Equipment {
    #[must_use]
    pub const fn slot(&self, slot: EquipmentSlot) -> Option<ItemKind> {
        match slot {
            EquipmentSlot::Weapon => self.weapon,
            EquipmentSlot::Tool => self.tool,
            EquipmentSlot::Armor => self.armor,
            EquipmentSlot::Bag => self.bag,
        }
    }

    pub fn slot_mut(&mut self, slot: EquipmentSlot) -> &mut Option<ItemKind> {
        match slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Tool => &mut self.tool,
            EquipmentSlot::Armor => &mut self.armor,
            EquipmentSlot::Bag => &mut self.bag,
        }
    }

    /// Gathering efficiency of the equipped tool, 1.0 bare-handed.
    #[must_use]
    pub fn tool_efficiency(&self) -> f32 {
        self.tool.map_or(1.0, |tool| tool.stats().efficiency)
    }

    /// Damage of the equipped weapon, if any.
    #[must_use]
    pub fn weapon_damage(&self) -> Option<f32> {
        self.weapon.map(|weapon| weapon.stats().damage)
    }

    /// Damage fraction absorbed by worn armor.
    #[must_use]
    pub fn defense(&self) -> f32 {
        self.armor.map_or(0.0, |armor| armor.stats().defense)
    }
}
