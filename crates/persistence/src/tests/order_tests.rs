// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

use hemline_domain::{Order, OrderDraft, OrderStatus, Product, Variant};

use crate::tests::{draft_for, hoodie_draft, seed_category, seed_customer, test_store};
use crate::{AdminOrder, Page, PageRequest, PersistenceError, ProductDraft, StorePersistence};

fn seed_hoodie(store: &mut StorePersistence) -> Product {
    let category_id: i64 = seed_category(store);
    store
        .create_product(&hoodie_draft(category_id))
        .expect("Seed product")
}

#[test]
fn test_commit_order_decrements_stock_and_snapshots() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);

    let draft: OrderDraft = draft_for(user_id, &product, &[("M", 2)]);
    let order: Order = store.commit_order(&draft).expect("Commit order");

    assert_eq!(order.user_id, user_id);
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].qty, 2);
    assert_eq!(order.items[0].title_snapshot, "Fleece Hoodie");
    assert!((order.subtotal - 118.0).abs() < 1e-9);
    assert!((order.total - order.subtotal - order.shipping_cost).abs() < 1e-9);

    // Stock was taken at commit.
    assert_eq!(
        store
            .get_variant_stock(product.product_id, "M")
            .expect("Stock lookup"),
        Some(3)
    );
}

#[test]
fn test_commit_order_rolls_back_on_stock_conflict() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);

    // First line fits (M has 5), second does not (L has 2).
    let draft: OrderDraft = draft_for(user_id, &product, &[("M", 1), ("L", 3)]);
    let error: PersistenceError = store
        .commit_order(&draft)
        .expect_err("Oversized line must abort the commit");

    assert_eq!(
        error,
        PersistenceError::StockConflict {
            product_id: product.product_id,
            size: String::from("L"),
        }
    );

    // All or nothing: the M decrement was rolled back and no order exists.
    assert_eq!(
        store
            .get_variant_stock(product.product_id, "M")
            .expect("Stock lookup"),
        Some(5)
    );
    assert_eq!(
        store
            .get_variant_stock(product.product_id, "L")
            .expect("Stock lookup"),
        Some(2)
    );
    let page: Page<Order> = store
        .list_orders_by_user(user_id, PageRequest::default())
        .expect("List orders");
    assert_eq!(page.total, 0);
}

#[test]
fn test_exact_stock_drains_to_zero_then_conflicts() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);

    store
        .commit_order(&draft_for(user_id, &product, &[("L", 2)]))
        .expect("Exact-stock order commits");
    assert_eq!(
        store
            .get_variant_stock(product.product_id, "L")
            .expect("Stock lookup"),
        Some(0)
    );

    let error: PersistenceError = store
        .commit_order(&draft_for(user_id, &product, &[("L", 1)]))
        .expect_err("Drained variant must conflict");
    assert_eq!(
        error,
        PersistenceError::StockConflict {
            product_id: product.product_id,
            size: String::from("L"),
        }
    );
}

#[test]
fn test_concurrent_commits_take_last_unit_exactly_once() {
    // Two writers on their own connections race for a single unit of
    // stock through a shared file-backed database. The conditional
    // decrement must admit exactly one of them.
    let db_path: PathBuf =
        std::env::temp_dir().join(format!("hemline_race_{}.db", std::process::id()));
    let _ = std::fs::remove_file(&db_path);

    let mut store: StorePersistence = StorePersistence::open(&db_path).expect("File-backed store");
    let user_id: i64 = seed_customer(&mut store);
    let category_id: i64 = seed_category(&mut store);
    let mut seed: ProductDraft = hoodie_draft(category_id);
    seed.variants = vec![Variant::new(String::from("M"), 1)];
    let product: Product = store.create_product(&seed).expect("Seed product");
    drop(store);

    let barrier: Arc<Barrier> = Arc::new(Barrier::new(2));
    let handles: Vec<thread::JoinHandle<Result<Order, PersistenceError>>> = (0..2)
        .map(|_| {
            let barrier: Arc<Barrier> = Arc::clone(&barrier);
            let path: PathBuf = db_path.clone();
            let product: Product = product.clone();
            thread::spawn(move || {
                let mut store: StorePersistence =
                    StorePersistence::open(&path).expect("Writer connection");
                let draft: OrderDraft = draft_for(user_id, &product, &[("M", 1)]);
                barrier.wait();
                store.commit_order(&draft)
            })
        })
        .collect();

    let results: Vec<Result<Order, PersistenceError>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Writer thread"))
        .collect();

    let successes: usize = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(
        results
            .iter()
            .any(|result| matches!(result, Err(PersistenceError::StockConflict { .. })))
    );

    let mut store: StorePersistence = StorePersistence::open(&db_path).expect("Reopen store");
    assert_eq!(
        store
            .get_variant_stock(product.product_id, "M")
            .expect("Stock lookup"),
        Some(0)
    );
    drop(store);

    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
    let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
}

#[test]
fn test_unknown_variant_conflicts() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);

    let error: PersistenceError = store
        .commit_order(&draft_for(user_id, &product, &[("XXL", 1)]))
        .expect_err("Unknown size must conflict");
    assert_eq!(
        error,
        PersistenceError::StockConflict {
            product_id: product.product_id,
            size: String::from("XXL"),
        }
    );
}

#[test]
fn test_order_snapshot_survives_catalog_edits() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);

    let order: Order = store
        .commit_order(&draft_for(user_id, &product, &[("M", 1)]))
        .expect("Commit order");

    // Retitle and reprice the product, then soft-delete it.
    let mut draft = hoodie_draft(product.category_id);
    draft.title = String::from("Renamed Hoodie");
    draft.price = 99.0;
    store
        .update_product(product.product_id, &draft)
        .expect("Update product")
        .expect("Product exists");
    store
        .set_product_active(product.product_id, false)
        .expect("Soft delete")
        .expect("Product exists");

    let stored: Order = store
        .get_order_by_id(order.order_id)
        .expect("Lookup order")
        .expect("Order exists");
    assert_eq!(stored.items[0].title_snapshot, "Fleece Hoodie");
    assert!((stored.items[0].price_snapshot - 59.0).abs() < f64::EPSILON);
}

#[test]
fn test_list_orders_by_user_newest_first() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let other_id: i64 = store
        .create_user("Sam Reyes", "sam@example.com", "$2b$10$samhash", "customer")
        .expect("Second user")
        .user_id;
    let product: Product = seed_hoodie(&mut store);

    let first: Order = store
        .commit_order(&draft_for(user_id, &product, &[("M", 1)]))
        .expect("First order");
    let second: Order = store
        .commit_order(&draft_for(user_id, &product, &[("M", 1)]))
        .expect("Second order");
    store
        .commit_order(&draft_for(other_id, &product, &[("M", 1)]))
        .expect("Other user's order");

    let page: Page<Order> = store
        .list_orders_by_user(user_id, PageRequest::default())
        .expect("List orders");
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].order_id, second.order_id);
    assert_eq!(page.items[1].order_id, first.order_id);
}

#[test]
fn test_list_all_orders_joins_owner_identity() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);
    store
        .commit_order(&draft_for(user_id, &product, &[("M", 1)]))
        .expect("Commit order");

    let page: Page<AdminOrder> = store
        .list_all_orders(PageRequest::default())
        .expect("List all orders");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].owner_name, "Avery Quinn");
    assert_eq!(page.items[0].owner_email, "avery@example.com");
}

#[test]
fn test_status_update_is_conditional_on_current_status() {
    let mut store: StorePersistence = test_store();
    let user_id: i64 = seed_customer(&mut store);
    let product: Product = seed_hoodie(&mut store);
    let order: Order = store
        .commit_order(&draft_for(user_id, &product, &[("M", 1)]))
        .expect("Commit order");

    let applied: bool = store
        .update_order_status(order.order_id, OrderStatus::Placed, OrderStatus::Packed)
        .expect("Status update");
    assert!(applied);

    // A second caller holding the stale PLACED status loses the race.
    let applied: bool = store
        .update_order_status(order.order_id, OrderStatus::Placed, OrderStatus::Packed)
        .expect("Status update");
    assert!(!applied);

    let stored: Order = store
        .get_order_by_id(order.order_id)
        .expect("Lookup order")
        .expect("Order exists");
    assert_eq!(stored.status, OrderStatus::Packed);
}

#[test]
fn test_status_update_on_missing_order_is_not_applied() {
    let mut store: StorePersistence = test_store();

    let applied: bool = store
        .update_order_status(404, OrderStatus::Placed, OrderStatus::Packed)
        .expect("Status update");
    assert!(!applied);
}
