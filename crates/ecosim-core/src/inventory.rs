use crate::ItemKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Absorbs float drift when a result exactly fills the remaining room.
const FIT_EPSILON: f32 = 1e-4;

/// Weight-limited item storage carried by smart creatures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inventory {
    base_capacity: f32,
    capacity_modifier: f32,
    items: BTreeMap<ItemKind, u32>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl Inventory {
    /// Create an empty inventory holding up to `capacity` weight units.
    #[must_use]
    pub fn new(capacity: f32) -> Self {
        Self {
            base_capacity: capacity.max(0.0),
            capacity_modifier: 0.0,
            items: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn base_capacity(&self) -> f32 {
        self.base_capacity
    }

    #[must_use]
    pub const fn capacity_modifier(&self) -> f32 {
        self.capacity_modifier
    }

    /// Extra capacity from equipped gear (bags).
    pub fn set_capacity_modifier(&mut self, modifier: f32) {
        self.capacity_modifier = modifier;
    }

    #[must_use]
    pub fn max_capacity(&self) -> f32 {
        self.base_capacity + self.capacity_modifier
    }

    #[must_use]
    pub fn current_weight(&self) -> f32 {
        self.items
            .iter()
            .map(|(kind, count)| kind.weight() * *count as f32)
            .sum()
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> f32 {
        self.max_capacity() - self.current_weight()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current_weight() >= self.max_capacity()
    }

    /// Whether `amount` more of `kind` would fit.
    #[must_use]
    pub fn can_add(&self, kind: ItemKind, amount: u32) -> bool {
        self.current_weight() + kind.weight() * amount as f32 <= self.max_capacity()
    }

    /// Add as many of `amount` as fit, returning how many were stored.
    pub fn add(&mut self, kind: ItemKind, amount: u32) -> u32 {
        if amount == 0 {
            return 0;
        }
        let fit = (self.remaining_capacity() / kind.weight() + FIT_EPSILON).floor();
        let fit = if fit.is_finite() && fit > 0.0 {
            fit as u32
        } else {
            0
        };
        let stored = amount.min(fit);
        if stored > 0 {
            *self.items.entry(kind).or_insert(0) += stored;
        }
        stored
    }

    /// Remove exactly `amount` of `kind`; nothing changes when fewer are held.
    pub fn remove(&mut self, kind: ItemKind, amount: u32) -> bool {
        let Some(count) = self.items.get_mut(&kind) else {
            return amount == 0;
        };
        if *count < amount {
            return false;
        }
        *count -= amount;
        if *count == 0 {
            self.items.remove(&kind);
        }
        true
    }

    #[must_use]
    pub fn has(&self, kind: ItemKind, amount: u32) -> bool {
        self.count(kind) >= amount
    }

    #[must_use]
    pub fn count(&self, kind: ItemKind) -> u32 {
        self.items.get(&kind).copied().unwrap_or(0)
    }

    /// Held items in stable kind order.
    pub fn contents(&self) -> impl Iterator<Item = (ItemKind, u32)> + '_ {
        self.items.iter().map(|(kind, count)| (*kind, *count))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
