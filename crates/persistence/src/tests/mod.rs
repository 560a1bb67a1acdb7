// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod order_tests;

use hemline_domain::{OrderDraft, OrderItem, Product, ShippingAddress, Variant, subtotal};

use crate::{ProductDraft, StorePersistence};

pub fn test_store() -> StorePersistence {
    StorePersistence::new_in_memory().expect("In-memory store")
}

pub fn seed_category(store: &mut StorePersistence) -> i64 {
    store
        .create_category("Outerwear", "outerwear")
        .expect("Seed category")
        .category_id
}

pub fn seed_customer(store: &mut StorePersistence) -> i64 {
    store
        .create_user(
            "Avery Quinn",
            "avery@example.com",
            "$2b$10$hashhashhashhashhashha",
            "customer",
        )
        .expect("Seed customer")
        .user_id
}

pub fn hoodie_draft(category_id: i64) -> ProductDraft {
    ProductDraft {
        title: String::from("Fleece Hoodie"),
        slug: String::from("fleece-hoodie"),
        description: String::from("Heavyweight fleece."),
        price: 59.0,
        compare_at_price: 79.0,
        category_id,
        images: vec![String::from("https://img.example.com/hoodie.jpg")],
        variants: vec![
            Variant::new(String::from("M"), 5),
            Variant::new(String::from("L"), 2),
        ],
        tags: vec![String::from("fleece"), String::from("winter")],
        is_featured: true,
    }
}

pub fn tee_draft(category_id: i64) -> ProductDraft {
    ProductDraft {
        title: String::from("Basic Tee"),
        slug: String::from("basic-tee"),
        description: String::new(),
        price: 19.0,
        compare_at_price: 0.0,
        category_id,
        images: vec![],
        variants: vec![Variant::new(String::from("S"), 10)],
        tags: vec![String::from("cotton")],
        is_featured: false,
    }
}

pub fn test_address() -> ShippingAddress {
    ShippingAddress {
        full_name: String::from("Avery Quinn"),
        phone: String::from("5551234567"),
        address: String::from("12 Hem Street"),
        city: String::from("Portland"),
        country: String::from("USA"),
    }
}

/// Builds an order draft from a stored product, snapshotting its current
/// title, price, and first image for each requested `(size, qty)` line.
pub fn draft_for(user_id: i64, product: &Product, lines: &[(&str, u32)]) -> OrderDraft {
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|(size, qty)| OrderItem {
            product_id: product.product_id,
            title_snapshot: product.title.clone(),
            price_snapshot: product.price,
            image_snapshot: product.images.first().cloned(),
            size: (*size).to_string(),
            qty: *qty,
        })
        .collect();

    let items_subtotal: f64 = subtotal(&items);
    OrderDraft {
        user_id,
        items,
        shipping_address: test_address(),
        subtotal: items_subtotal,
        shipping_cost: 0.0,
        total: items_subtotal,
    }
}
