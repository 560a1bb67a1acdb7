// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::SqliteConnection;
use diesel::connection::SimpleConnection;
use tracing::info;

use crate::error::PersistenceError;

/// Initializes the database schema.
///
/// # Arguments
///
/// * `conn` - The database connection to initialize
///
/// # Errors
///
/// Returns an error if schema creation fails.
pub fn initialize_schema(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    info!("Initializing database schema");

    // Enable foreign key enforcement
    conn.batch_execute("PRAGMA foreign_keys = ON")
        .map_err(|e| PersistenceError::InitializationError(e.to_string()))?;

    conn.batch_execute(
        "
        -- Account tables
        CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'customer' CHECK(role IN ('customer', 'admin')),
            created_at TEXT NOT NULL
        );

        -- Catalog tables
        CREATE TABLE IF NOT EXISTS categories (
            category_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1 CHECK(is_active IN (0, 1)),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS products (
            product_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL CHECK(price >= 0),
            compare_at_price REAL NOT NULL DEFAULT 0,
            category_id INTEGER NOT NULL,
            images_json TEXT NOT NULL DEFAULT '[]',
            tags_json TEXT NOT NULL DEFAULT '[]',
            is_featured INTEGER NOT NULL DEFAULT 0 CHECK(is_featured IN (0, 1)),
            is_active INTEGER NOT NULL DEFAULT 1 CHECK(is_active IN (0, 1)),
            created_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES categories(category_id)
        );

        CREATE INDEX IF NOT EXISTS idx_products_category
            ON products(category_id);

        CREATE INDEX IF NOT EXISTS idx_products_active
            ON products(is_active);

        -- Stock ledger: one row per (product, size). The CHECK(stock >= 0)
        -- constraint backstops the conditional decrement; it must never fire.
        CREATE TABLE IF NOT EXISTS variants (
            variant_id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL,
            size TEXT NOT NULL,
            stock INTEGER NOT NULL CHECK(stock >= 0),
            position INTEGER NOT NULL DEFAULT 0,
            UNIQUE(product_id, size),
            FOREIGN KEY(product_id) REFERENCES products(product_id)
        );

        CREATE INDEX IF NOT EXISTS idx_variants_product
            ON variants(product_id, position);

        -- Order record tables
        CREATE TABLE IF NOT EXISTS orders (
            order_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            ship_full_name TEXT NOT NULL,
            ship_phone TEXT NOT NULL,
            ship_address TEXT NOT NULL,
            ship_city TEXT NOT NULL,
            ship_country TEXT NOT NULL,
            subtotal REAL NOT NULL,
            shipping_cost REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'PLACED'
                CHECK(status IN ('PLACED', 'PACKED', 'SHIPPED', 'DELIVERED')),
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_orders_user
            ON orders(user_id, order_id DESC);

        CREATE TABLE IF NOT EXISTS order_items (
            order_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            title_snapshot TEXT NOT NULL,
            price_snapshot REAL NOT NULL,
            image_snapshot TEXT,
            size TEXT NOT NULL,
            qty INTEGER NOT NULL CHECK(qty >= 1),
            position INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(order_id) REFERENCES orders(order_id)
        );

        CREATE INDEX IF NOT EXISTS idx_order_items_order
            ON order_items(order_id, position);
        ",
    )
    .map_err(|e| PersistenceError::InitializationError(e.to_string()))?;

    Ok(())
}
