// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Product title is empty or invalid.
    InvalidTitle(String),
    /// Slug is empty or contains characters outside `a-z`, `0-9`, `-`.
    InvalidSlug(String),
    /// Price is negative or not a finite number.
    InvalidPrice {
        /// The rejected price value.
        value: f64,
    },
    /// A variant size appears more than once on the same product.
    DuplicateVariantSize {
        /// The duplicated size label.
        size: String,
    },
    /// A variant size label is empty.
    InvalidVariantSize(String),
    /// The cart contains no items.
    EmptyCart,
    /// A cart line requested a quantity of zero.
    InvalidQuantity {
        /// Zero-based index of the offending cart line.
        line: usize,
    },
    /// A cart line carried a negative or non-finite snapshot price.
    InvalidSnapshotPrice {
        /// Zero-based index of the offending cart line.
        line: usize,
        /// The rejected snapshot price.
        value: f64,
    },
    /// A shipping address field is missing or too short.
    InvalidAddressField {
        /// The field name.
        field: &'static str,
        /// The minimum number of characters required.
        min_length: usize,
    },
    /// The referenced product does not exist or is no longer active.
    ProductNotFound {
        /// The product identifier from the cart line.
        product_id: i64,
    },
    /// The named product/size lacks sufficient stock.
    InsufficientStock {
        /// The product title, for the human-readable message.
        title: String,
        /// The requested size.
        size: String,
    },
    /// The client snapshot price no longer matches the live catalog price.
    PriceChanged {
        /// The product title, for the human-readable message.
        title: String,
        /// The current catalog price.
        live_price: f64,
        /// The price the client snapshotted at add-to-cart time.
        snapshot_price: f64,
    },
    /// An order status string is not one of the four lifecycle states.
    InvalidOrderStatus {
        /// The rejected status string.
        status: String,
    },
    /// An order status transition is not permitted by the lifecycle rules.
    InvalidStatusTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
        /// Why the transition was rejected.
        reason: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle(msg) => write!(f, "Invalid title: {msg}"),
            Self::InvalidSlug(msg) => write!(f, "Invalid slug: {msg}"),
            Self::InvalidPrice { value } => {
                write!(f, "Invalid price: {value} (must be a non-negative number)")
            }
            Self::DuplicateVariantSize { size } => {
                write!(f, "Duplicate variant size: '{size}'")
            }
            Self::InvalidVariantSize(msg) => write!(f, "Invalid variant size: {msg}"),
            Self::EmptyCart => write!(f, "Cart must contain at least one item"),
            Self::InvalidQuantity { line } => {
                write!(f, "Cart line {line}: quantity must be at least 1")
            }
            Self::InvalidSnapshotPrice { line, value } => {
                write!(f, "Cart line {line}: invalid snapshot price {value}")
            }
            Self::InvalidAddressField { field, min_length } => {
                write!(
                    f,
                    "Shipping address field '{field}' must be at least {min_length} characters"
                )
            }
            Self::ProductNotFound { product_id } => {
                write!(f, "Product not found: {product_id}")
            }
            Self::InsufficientStock { title, size } => {
                write!(f, "Out of stock: {title} (size {size})")
            }
            Self::PriceChanged {
                title,
                live_price,
                snapshot_price,
            } => write!(
                f,
                "Price changed for {title}: cart has {snapshot_price}, catalog has {live_price}"
            ),
            Self::InvalidOrderStatus { status } => {
                write!(f, "Invalid order status: '{status}'")
            }
            Self::InvalidStatusTransition { from, to, reason } => {
                write!(f, "Invalid status transition {from} -> {to}: {reason}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
