//! Items and the inventories that hold them.

use serde::{Deserialize, Serialize};

use crate::mechanics::{ItemCategory, ItemRarity};

/// An item that can be carried, bought and sold.
///
/// Items are plain values: two items with the same fields are the same item.
/// They move between inventories and are never duplicated by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub rarity: ItemRarity,
    /// Price in gold.
    pub price: u32,
}

impl Item {
    /// Create a common item.
    pub fn new(name: impl Into<String>, category: ItemCategory, price: u32) -> Self {
        Self {
            name: name.into(),
            category,
            rarity: ItemRarity::Common,
            price,
        }
    }

    /// Set the rarity.
    pub fn with_rarity(mut self, rarity: ItemRarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Case-insensitive name match.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {}): {} gold",
            self.name, self.category, self.rarity, self.price
        )
    }
}

/// Items and gold held by a single character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Inventory {
    /// Ordered item sequence; duplicates are allowed.
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub gold: u32,
}

impl Inventory {
    /// Create an empty inventory holding some gold.
    pub fn with_gold(gold: u32) -> Self {
        Self {
            items: Vec::new(),
            gold,
        }
    }

    /// Add an item to the end of the sequence.
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Add multiple items.
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    /// Index of the first item equal to `item`.
    pub fn position(&self, item: &Item) -> Option<usize> {
        self.items.iter().position(|held| held == item)
    }

    /// Check whether an equal item is held.
    pub fn contains(&self, item: &Item) -> bool {
        self.position(item).is_some()
    }

    /// First item with the given name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.is_named(name))
    }

    /// Number of items held.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Combined price of every item held.
    pub fn total_item_value(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.price)).sum()
    }

    /// Render the inventory as prompt lines.
    pub fn to_context(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push_str(&format!("- {}\n", item));
        }
        out.push_str(&format!("Gold: {}\n", self.gold));
        out
    }
}
