// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Catalog types: categories, products, and per-size stock counters.

use serde::{Deserialize, Serialize};

/// A product variant: one size with its remaining stock.
///
/// The `stock` counters embedded here form the stock ledger. They are
/// mutated only by the order workflow (conditional decrements at checkout)
/// and by admin catalog edits. The invariant `stock >= 0` holds at all
/// times; a decrement is never applied beyond available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// The size label (e.g. "S", "M", "L", "XL"). Unique per product.
    pub size: String,
    /// Units remaining. Never negative.
    pub stock: u32,
}

impl Variant {
    /// Creates a new variant.
    #[must_use]
    pub const fn new(size: String, stock: u32) -> Self {
        Self { size, stock }
    }
}

/// A catalog product.
///
/// Products are soft-deleted (deactivated, never hard-removed) so that
/// historical order snapshots retain referential validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// The unique product identifier.
    pub product_id: i64,
    /// The display title.
    pub title: String,
    /// The unique, human-readable slug.
    pub slug: String,
    /// The long-form description. May be empty.
    pub description: String,
    /// The current price, in decimal currency units. Non-negative.
    pub price: f64,
    /// The strike-through comparison price. Zero when unset.
    pub compare_at_price: f64,
    /// The category this product belongs to.
    pub category_id: i64,
    /// Image URLs, in display order.
    pub images: Vec<String>,
    /// Size variants, in display order, unique by size.
    pub variants: Vec<Variant>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Whether the product is surfaced on the storefront home page.
    pub is_featured: bool,
    /// Whether the product is live. False means soft-deleted.
    pub is_active: bool,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl Product {
    /// Finds the variant matching the given size, if present.
    #[must_use]
    pub fn variant(&self, size: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.size == size)
    }
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The unique category identifier.
    pub category_id: i64,
    /// The display name.
    pub name: String,
    /// The unique, human-readable slug.
    pub slug: String,
    /// Whether the category is live. False means soft-deleted.
    pub is_active: bool,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}
