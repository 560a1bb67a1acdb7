// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Validation rules for catalog fields, cart payloads, and addresses.
//!
//! These checks are structural only. Stock availability is not checked
//! here: the commit-time conditional decrement is the true gate, and any
//! read-only availability check before it is advisory.

use crate::error::DomainError;
use crate::order::{OrderItem, ShippingAddress};
use crate::types::Variant;

/// Minimum lengths for shipping address fields, in field order.
const ADDRESS_FIELD_MINIMUMS: [(&str, usize); 5] = [
    ("full_name", 2),
    ("phone", 7),
    ("address", 5),
    ("city", 2),
    ("country", 2),
];

/// Validates a product slug.
///
/// Slugs must be non-empty and consist of lowercase ASCII letters, digits,
/// and hyphens.
///
/// # Errors
///
/// Returns `DomainError::InvalidSlug` if the slug is malformed.
pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    if slug.is_empty() {
        return Err(DomainError::InvalidSlug(String::from(
            "slug cannot be empty",
        )));
    }

    let well_formed: bool = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        return Err(DomainError::InvalidSlug(format!(
            "'{slug}' may only contain lowercase letters, digits, and hyphens"
        )));
    }

    Ok(())
}

/// Validates a price value.
///
/// # Errors
///
/// Returns `DomainError::InvalidPrice` if the price is negative or not a
/// finite number.
pub fn validate_price(price: f64) -> Result<(), DomainError> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::InvalidPrice { value: price });
    }
    Ok(())
}

/// Validates a product's variant set.
///
/// Sizes must be non-empty and unique within the product.
///
/// # Errors
///
/// Returns an error if a size label is empty or duplicated.
pub fn validate_variants(variants: &[Variant]) -> Result<(), DomainError> {
    let mut seen: Vec<&str> = Vec::with_capacity(variants.len());
    for variant in variants {
        if variant.size.trim().is_empty() {
            return Err(DomainError::InvalidVariantSize(String::from(
                "size label cannot be empty",
            )));
        }
        if seen.contains(&variant.size.as_str()) {
            return Err(DomainError::DuplicateVariantSize {
                size: variant.size.clone(),
            });
        }
        seen.push(&variant.size);
    }
    Ok(())
}

/// Validates the structural shape of a cart payload.
///
/// The cart must be non-empty; every line must request at least one unit,
/// name a size, and carry a finite non-negative snapshot price.
///
/// # Errors
///
/// Returns the first structural violation found, identifying the offending
/// line by index.
pub fn validate_cart(items: &[OrderItem]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::EmptyCart);
    }

    for (line, item) in items.iter().enumerate() {
        if item.qty == 0 {
            return Err(DomainError::InvalidQuantity { line });
        }
        if item.size.trim().is_empty() {
            return Err(DomainError::InvalidVariantSize(format!(
                "cart line {line} has no size"
            )));
        }
        if !item.price_snapshot.is_finite() || item.price_snapshot < 0.0 {
            return Err(DomainError::InvalidSnapshotPrice {
                line,
                value: item.price_snapshot,
            });
        }
    }

    Ok(())
}

/// Validates a shipping address against the per-field minimum lengths.
///
/// # Errors
///
/// Returns `DomainError::InvalidAddressField` naming the first field that
/// falls short of its minimum.
pub fn validate_shipping_address(address: &ShippingAddress) -> Result<(), DomainError> {
    let fields: [&str; 5] = [
        &address.full_name,
        &address.phone,
        &address.address,
        &address.city,
        &address.country,
    ];

    for ((field, min_length), value) in ADDRESS_FIELD_MINIMUMS.iter().zip(fields) {
        if value.trim().chars().count() < *min_length {
            return Err(DomainError::InvalidAddressField {
                field,
                min_length: *min_length,
            });
        }
    }

    Ok(())
}
