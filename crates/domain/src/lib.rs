// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Domain types and rule validation for the Hemline storefront.
//!
//! This crate defines the catalog and order vocabulary shared by every other
//! layer: products with per-size stock counters, immutable order line
//! snapshots, the order status lifecycle, and the validation rules that guard
//! them. It has no persistence or transport concerns.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

mod error;
mod order;
mod order_status;
mod types;
mod validation;

pub use error::DomainError;
pub use order::{Order, OrderDraft, OrderItem, ShippingAddress, subtotal};
pub use order_status::OrderStatus;
pub use types::{Category, Product, Variant};
pub use validation::{
    validate_cart, validate_price, validate_shipping_address, validate_slug, validate_variants,
};
