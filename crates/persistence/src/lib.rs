// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the Hemline storefront.
//!
//! This crate stores the catalog (categories, products, per-size stock),
//! user accounts, and order records in `SQLite` via Diesel. The stock
//! ledger lives here: every checkout commit runs through one immediate
//! transaction that conditionally decrements stock and inserts the order,
//! so the database is the single arbiter of availability.
//!
//! In-memory databases (unique per call) back unit and integration tests;
//! file-backed databases with WAL mode serve the real server.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::SqliteConnection;
use time::OffsetDateTime;
use time::format_description::well_known::Iso8601;

use hemline_domain::{Category, Order, OrderDraft, OrderStatus, Product};

mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;
mod schema;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;

pub use data_models::{
    AdminOrder, CategoryFilter, CategorySort, Page, PageRequest, ProductDraft, ProductFilter,
    ProductSort, UserData, MAX_PAGE_LIMIT,
};
pub use error::PersistenceError;

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential ID, so
/// tests are isolated without time-based collisions.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns the current UTC time as an ISO 8601 string.
///
/// All `created_at` columns store this format.
///
/// # Errors
///
/// Returns an error if the timestamp cannot be formatted.
pub fn current_timestamp() -> Result<String, PersistenceError> {
    OffsetDateTime::now_utc()
        .format(&Iso8601::DEFAULT)
        .map_err(|e| PersistenceError::SerializationError(format!("Timestamp format: {e}")))
}

/// Persistence adapter for the storefront database.
///
/// Holds one `SQLite` connection; callers serialize access (the server
/// wraps this in a mutex). All public methods delegate to monomorphic
/// query and mutation functions.
pub struct StorePersistence {
    conn: SqliteConnection,
}

impl StorePersistence {
    /// Creates a persistence adapter backed by a unique in-memory
    /// `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id: u64 = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let url: String = format!("file:hemline_test_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = SqliteConnection::establish(&url)?;
        schema::initialize_schema(&mut conn)?;
        verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates a persistence adapter backed by a `SQLite` database file.
    ///
    /// Enables WAL mode for better read concurrency.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str: &str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError(String::from("Invalid database path"))
        })?;

        let mut conn: SqliteConnection = SqliteConnection::establish(path_str)?;
        conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
            .map_err(|e| PersistenceError::InitializationError(format!("WAL setup: {e}")))?;
        schema::initialize_schema(&mut conn)?;
        verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self { conn })
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Creates a user account from a lowercased email and a hashed
    /// password.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::DuplicateEmail` if the email is taken,
    /// or another error if the insert fails.
    pub fn create_user(
        &mut self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<UserData, PersistenceError> {
        let created_at: String = current_timestamp()?;
        mutations::accounts::create_user(&mut self.conn, name, email, password_hash, role, &created_at)
    }

    /// Retrieves a user by email (exact match; callers lowercase first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserData>, PersistenceError> {
        queries::accounts::get_user_by_email(&mut self.conn, email)
    }

    /// Retrieves a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user_by_id(&mut self, user_id: i64) -> Result<Option<UserData>, PersistenceError> {
        queries::accounts::get_user_by_id(&mut self.conn, user_id)
    }

    // ========================================================================
    // Catalog: categories
    // ========================================================================

    /// Creates a category.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::DuplicateSlug` if the slug is taken, or
    /// another error if the insert fails.
    pub fn create_category(&mut self, name: &str, slug: &str) -> Result<Category, PersistenceError> {
        let created_at: String = current_timestamp()?;
        mutations::catalog::create_category(&mut self.conn, name, slug, &created_at)
    }

    /// Updates a category's name and slug.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::DuplicateSlug` if the new slug belongs
    /// to a different category, or another error if the update fails.
    pub fn update_category(
        &mut self,
        category_id: i64,
        name: &str,
        slug: &str,
    ) -> Result<Option<Category>, PersistenceError> {
        mutations::catalog::update_category(&mut self.conn, category_id, name, slug)
    }

    /// Sets a category's active flag; `false` is the soft delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_category_active(
        &mut self,
        category_id: i64,
        is_active: bool,
    ) -> Result<Option<Category>, PersistenceError> {
        mutations::catalog::set_category_active(&mut self.conn, category_id, is_active)
    }

    /// Lists categories matching a filter, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_categories(
        &mut self,
        filter: &CategoryFilter,
        page: PageRequest,
    ) -> Result<Page<Category>, PersistenceError> {
        queries::catalog::list_categories(&mut self.conn, filter, page)
    }

    /// Retrieves a category by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_category_by_id(
        &mut self,
        category_id: i64,
    ) -> Result<Option<Category>, PersistenceError> {
        queries::catalog::find_category_by_id(&mut self.conn, category_id)
    }

    /// Checks whether a category slug is taken, optionally excluding one
    /// category from the check.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn category_slug_exists(
        &mut self,
        slug: &str,
        exclude_category_id: Option<i64>,
    ) -> Result<bool, PersistenceError> {
        queries::catalog::category_slug_exists(&mut self.conn, slug, exclude_category_id)
    }

    // ========================================================================
    // Catalog: products
    // ========================================================================

    /// Creates a product with its variant rows, atomically.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::DuplicateSlug` if the slug is taken, or
    /// another error if any insert fails.
    pub fn create_product(&mut self, draft: &ProductDraft) -> Result<Product, PersistenceError> {
        let created_at: String = current_timestamp()?;
        mutations::catalog::create_product(&mut self.conn, draft, &created_at)
    }

    /// Replaces a product's editable fields and variant set, atomically.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::DuplicateSlug` if the new slug belongs
    /// to a different product, or another error if any statement fails.
    pub fn update_product(
        &mut self,
        product_id: i64,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, PersistenceError> {
        mutations::catalog::update_product(&mut self.conn, product_id, draft)
    }

    /// Sets a product's active flag; `false` is the soft delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_product_active(
        &mut self,
        product_id: i64,
        is_active: bool,
    ) -> Result<Option<Product>, PersistenceError> {
        mutations::catalog::set_product_active(&mut self.conn, product_id, is_active)
    }

    /// Lists products matching a filter, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored data cannot
    /// be reconstructed.
    pub fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, PersistenceError> {
        queries::catalog::list_products(&mut self.conn, filter, page)
    }

    /// Retrieves a product by ID regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored data cannot
    /// be reconstructed.
    pub fn get_product_by_id(
        &mut self,
        product_id: i64,
    ) -> Result<Option<Product>, PersistenceError> {
        queries::catalog::find_product_by_id(&mut self.conn, product_id)
    }

    /// Retrieves an active product by slug. Storefront detail view.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored data cannot
    /// be reconstructed.
    pub fn get_active_product_by_slug(
        &mut self,
        slug: &str,
    ) -> Result<Option<Product>, PersistenceError> {
        queries::catalog::find_active_product_by_slug(&mut self.conn, slug)
    }

    /// Checks whether a product slug is taken, optionally excluding one
    /// product from the check.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn product_slug_exists(
        &mut self,
        slug: &str,
        exclude_product_id: Option<i64>,
    ) -> Result<bool, PersistenceError> {
        queries::catalog::product_slug_exists(&mut self.conn, slug, exclude_product_id)
    }

    /// Reads the current stock for a `(product_id, size)` ledger row.
    ///
    /// Advisory only; the commit-time conditional decrement is the
    /// authoritative check.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_variant_stock(
        &mut self,
        product_id: i64,
        size: &str,
    ) -> Result<Option<u32>, PersistenceError> {
        queries::catalog::get_variant_stock(&mut self.conn, product_id, size)
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Commits an order: conditionally decrements stock for every cart
    /// line and inserts the order record inside one immediate transaction.
    /// Either every line's stock is taken and the order exists, or
    /// nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::StockConflict` naming the first line
    /// that could not be satisfied, or another error if a statement
    /// fails.
    pub fn commit_order(&mut self, draft: &OrderDraft) -> Result<Order, PersistenceError> {
        let created_at: String = current_timestamp()?;
        mutations::orders::commit_order(&mut self.conn, draft, &created_at)
    }

    /// Retrieves an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored data cannot
    /// be reconstructed.
    pub fn get_order_by_id(&mut self, order_id: i64) -> Result<Option<Order>, PersistenceError> {
        queries::orders::find_order_by_id(&mut self.conn, order_id)
    }

    /// Lists a user's orders, newest first, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored data cannot
    /// be reconstructed.
    pub fn list_orders_by_user(
        &mut self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<Order>, PersistenceError> {
        queries::orders::list_orders_by_user(&mut self.conn, user_id, page)
    }

    /// Lists all orders with owner identities joined in. Admin view.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored data cannot
    /// be reconstructed.
    pub fn list_all_orders(
        &mut self,
        page: PageRequest,
    ) -> Result<Page<AdminOrder>, PersistenceError> {
        queries::orders::list_all_orders(&mut self.conn, page)
    }

    /// Advances an order's status with an update conditional on the
    /// stored status still matching `from`.
    ///
    /// # Returns
    ///
    /// `true` if the transition was applied, `false` if the order is
    /// absent or its stored status moved since the caller read it.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_order_status(
        &mut self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, PersistenceError> {
        mutations::orders::update_order_status(&mut self.conn, order_id, from, to)
    }
}

/// Verifies that foreign key enforcement is enabled.
///
/// Startup-time check; referential integrity depends on it.
fn verify_foreign_key_enforcement(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    #[derive(QueryableByName)]
    struct ForeignKeysPragma {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        foreign_keys: i32,
    }

    let row: ForeignKeysPragma = diesel::sql_query("PRAGMA foreign_keys").get_result(conn)?;

    if row.foreign_keys == 1 {
        Ok(())
    } else {
        Err(PersistenceError::InitializationError(String::from(
            "Foreign key enforcement is not enabled",
        )))
    }
}
