// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use hemline_domain::{Order, Variant};
use serde::{Deserialize, Serialize};

/// A stored user account.
///
/// Includes the password hash; callers strip it before anything leaves the
/// API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

/// Input fields for creating or replacing a product.
///
/// Identity and timestamps are assigned by the store; everything else comes
/// from the admin payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub compare_at_price: f64,
    pub category_id: i64,
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
    pub tags: Vec<String>,
    pub is_featured: bool,
}

/// A page of results with totals, the shape every listing returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total items matching the filter, across all pages.
    pub total: i64,
    /// The 1-based page number served.
    pub page: u32,
    /// Total number of pages.
    pub pages: u32,
}

/// A 1-based page request, normalized at the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The 1-based page number. Zero is treated as 1.
    pub page: u32,
    /// Items per page. Clamped to [1, `MAX_PAGE_LIMIT`].
    pub limit: u32,
}

/// Upper bound on items per page.
pub const MAX_PAGE_LIMIT: u32 = 100;

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Returns the effective page number (at least 1).
    #[must_use]
    pub const fn effective_page(&self) -> u32 {
        if self.page == 0 { 1 } else { self.page }
    }

    /// Returns the effective per-page limit (clamped to [1, `MAX_PAGE_LIMIT`]).
    #[must_use]
    pub const fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            1
        } else if self.limit > MAX_PAGE_LIMIT {
            MAX_PAGE_LIMIT
        } else {
            self.limit
        }
    }

    /// Returns the row offset for this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.effective_page() - 1) * i64::from(self.effective_limit())
    }

    /// Computes the page count for a given total.
    #[must_use]
    pub fn pages_for_total(&self, total: i64) -> u32 {
        let limit: i64 = i64::from(self.effective_limit());
        let pages: i64 = (total + limit - 1) / limit;
        u32::try_from(pages).unwrap_or(0)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 12 }
    }
}

/// Sort keys for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Newest first (default).
    #[default]
    New,
    /// Oldest first.
    Old,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
    /// Title A-Z.
    TitleAsc,
    /// Title Z-A.
    TitleDesc,
}

/// Filter for product listings.
///
/// `active: Some(true)` with no other filters is the public storefront view;
/// `active: None` lets admins see soft-deleted products too.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductFilter {
    /// Restrict to one category.
    pub category_id: Option<i64>,
    /// Case-insensitive substring match on the title.
    pub title_query: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
    /// Restrict to products carrying this tag.
    pub tag: Option<String>,
    /// Restrict by the featured flag.
    pub featured: Option<bool>,
    /// Restrict to products with this size in stock.
    pub in_stock_size: Option<String>,
    /// Restrict by the active flag.
    pub active: Option<bool>,
    /// Sort key.
    pub sort: ProductSort,
}

/// Sort keys for category listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySort {
    /// Newest first (default).
    #[default]
    New,
    /// Oldest first.
    Old,
    /// Name A-Z.
    NameAsc,
    /// Name Z-A.
    NameDesc,
}

/// Filter for category listings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryFilter {
    /// Case-insensitive substring match on the name.
    pub name_query: Option<String>,
    /// Restrict by the active flag.
    pub active: Option<bool>,
    /// Sort key.
    pub sort: CategorySort,
}

/// An order joined with its owner's identity, for the admin view.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminOrder {
    /// The order record.
    pub order: Order,
    /// The owning user's display name.
    pub owner_name: String,
    /// The owning user's email.
    pub owner_email: String,
}
