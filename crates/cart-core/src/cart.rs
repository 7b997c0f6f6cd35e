//! # Cart Types
//!
//! Cart items, the cart state and the commands that mutate it.
//!
//! Every mutation is a discrete [`CartCommand`] applied through
//! [`CartState::apply`]; that is the only code path that changes items, so the
//! invariants below are enforced in one place:
//!
//! - `total_price == product_snapshot.unit_price * quantity` after every command
//! - no item with a zero quantity is ever retained
//! - item ids are unique and items keep insertion order

use crate::product::ProductSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A line in the shopping cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Cart item id (the product id; adds of the same id merge)
    pub id: String,

    /// Catalog product id
    pub product_id: String,

    /// Product as it was when added
    pub product_snapshot: ProductSnapshot,

    /// Always at least 1
    pub quantity: u32,

    /// `unit_price * quantity`
    pub total_price: f64,

    /// When the line was first added
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Create a new line from a product snapshot
    pub fn new(product: ProductSnapshot, quantity: u32) -> Self {
        let total_price = line_total(product.unit_price, quantity);
        Self {
            id: product.id.clone(),
            product_id: product.id.clone(),
            product_snapshot: product,
            quantity,
            total_price,
            added_at: Utc::now(),
        }
    }

    /// Unit price from the snapshot
    pub fn unit_price(&self) -> f64 {
        self.product_snapshot.unit_price
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.total_price = line_total(self.product_snapshot.unit_price, quantity);
    }
}

fn line_total(unit_price: f64, quantity: u32) -> f64 {
    unit_price * f64::from(quantity)
}

/// Clamp a requested quantity into the stored range. `None` means "remove".
fn stored_quantity(quantity: i64) -> Option<u32> {
    if quantity <= 0 {
        None
    } else {
        Some(u32::try_from(quantity).unwrap_or(u32::MAX))
    }
}

/// A discrete cart mutation
#[derive(Debug, Clone, PartialEq)]
pub enum CartCommand {
    /// Add `quantity` of a product, merging with an existing line of the same id
    Add {
        product: ProductSnapshot,
        quantity: i64,
    },
    /// Remove one line (idempotent)
    Remove { id: String },
    /// Remove several lines (idempotent)
    RemoveMany { ids: Vec<String> },
    /// Set the quantity of a line; `<= 0` removes it
    SetQuantity { id: String, quantity: i64 },
    /// Empty the cart
    Clear,
}

impl CartCommand {
    /// Add with the default quantity of one
    pub fn add_one(product: ProductSnapshot) -> Self {
        CartCommand::Add {
            product,
            quantity: 1,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            CartCommand::Add { .. } => "add",
            CartCommand::Remove { .. } => "remove",
            CartCommand::RemoveMany { .. } => "remove_many",
            CartCommand::SetQuantity { .. } => "set_quantity",
            CartCommand::Clear => "clear",
        }
    }
}

/// The canonical in-memory cart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    items: Vec<CartItem>,
    initialized: bool,
}

impl CartState {
    /// Create an empty, not-yet-loaded cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in insertion order
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the persisted snapshot has been loaded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Populate from a loaded snapshot. Only the first call has an effect.
    ///
    /// Returns false if the cart was already initialized.
    pub fn initialize(&mut self, items: Vec<CartItem>) -> bool {
        if self.initialized {
            return false;
        }
        if !self.items.is_empty() {
            debug!(
                discarded = self.items.len(),
                "Replacing pre-load cart lines with persisted snapshot"
            );
        }
        self.items = dedupe(items);
        self.initialized = true;
        true
    }

    /// Apply a command. Returns true if the items changed.
    pub fn apply(&mut self, command: CartCommand) -> bool {
        match command {
            CartCommand::Add { product, quantity } => self.add(product, quantity),
            CartCommand::Remove { id } => self.remove(&id),
            CartCommand::RemoveMany { ids } => {
                let before = self.items.len();
                self.items.retain(|item| !ids.contains(&item.id));
                self.items.len() != before
            }
            CartCommand::SetQuantity { id, quantity } => self.set_quantity(&id, quantity),
            CartCommand::Clear => {
                let changed = !self.items.is_empty();
                self.items.clear();
                changed
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn add(&mut self, product: ProductSnapshot, quantity: i64) -> bool {
        match self.position(&product.id) {
            Some(index) => {
                // Merge keeps the original snapshot and its unit price.
                let merged = i64::from(self.items[index].quantity).saturating_add(quantity);
                self.set_quantity_at(index, merged)
            }
            None => {
                if !product.unit_price.is_finite() {
                    warn!(product_id = %product.id, "Ignoring add with non-finite unit price");
                    return false;
                }
                match stored_quantity(quantity) {
                    Some(quantity) => {
                        self.items.push(CartItem::new(product, quantity));
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    fn set_quantity(&mut self, id: &str, quantity: i64) -> bool {
        match self.position(id) {
            Some(index) => self.set_quantity_at(index, quantity),
            None => false,
        }
    }

    fn set_quantity_at(&mut self, index: usize, quantity: i64) -> bool {
        match stored_quantity(quantity) {
            Some(quantity) => {
                let item = &mut self.items[index];
                if item.quantity == quantity {
                    return false;
                }
                item.set_quantity(quantity);
                true
            }
            None => {
                self.items.remove(index);
                true
            }
        }
    }

    /// Sum of quantities
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of line totals
    pub fn total_price(&self) -> f64 {
        self.items.iter().map(|item| item.total_price).sum()
    }

    /// Look up a line by id
    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Keep the first occurrence of each id
fn dedupe(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
