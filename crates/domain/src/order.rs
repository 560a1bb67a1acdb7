// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Order records and line-item snapshots.
//!
//! Order items are snapshots captured at order-creation time and never
//! re-derived from the live product, so later catalog edits do not
//! retroactively alter historical orders.

use crate::order_status::OrderStatus;
use serde::{Deserialize, Serialize};

/// One order line: an immutable snapshot of a cart item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product this line references.
    pub product_id: i64,
    /// Product title at add-to-cart time.
    pub title_snapshot: String,
    /// Unit price at add-to-cart time.
    pub price_snapshot: f64,
    /// Primary image URL at add-to-cart time, if any.
    pub image_snapshot: Option<String>,
    /// The size ordered.
    pub size: String,
    /// Units ordered. At least 1.
    pub qty: u32,
}

/// A shipping address, validated at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient name.
    pub full_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// Country.
    pub country: String,
}

/// A persisted order.
///
/// Immutable once created, status excepted: status advances through the
/// [`OrderStatus`] lifecycle by admin action only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// The unique order identifier.
    pub order_id: i64,
    /// The user who placed the order.
    pub user_id: i64,
    /// Line-item snapshots, in cart order.
    pub items: Vec<OrderItem>,
    /// The shipping address submitted at checkout.
    pub shipping_address: ShippingAddress,
    /// Sum of `price_snapshot * qty` over items.
    pub subtotal: f64,
    /// Shipping cost. Currently always 0; no shipping-cost model exists.
    pub shipping_cost: f64,
    /// `subtotal + shipping_cost`.
    pub total: f64,
    /// The fulfilment status.
    pub status: OrderStatus,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// The write-side shape of an order: everything the caller supplies.
///
/// Identity, status, and the creation timestamp are assigned by the order
/// record store when the draft is committed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    /// The user placing the order.
    pub user_id: i64,
    /// Line-item snapshots, in cart order.
    pub items: Vec<OrderItem>,
    /// The shipping address submitted at checkout.
    pub shipping_address: ShippingAddress,
    /// Sum of `price_snapshot * qty` over items.
    pub subtotal: f64,
    /// Shipping cost. Currently always 0.
    pub shipping_cost: f64,
    /// `subtotal + shipping_cost`.
    pub total: f64,
}

/// Computes the subtotal of a sequence of order lines.
///
/// The subtotal is the sum of `price_snapshot * qty` over all lines,
/// accumulated in cart order.
#[must_use]
pub fn subtotal(items: &[OrderItem]) -> f64 {
    items
        .iter()
        .map(|item| item.price_snapshot * f64::from(item.qty))
        .sum()
}
