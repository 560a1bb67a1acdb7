// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Catalog mutations: categories, products, and the stock ledger.
//!
//! Category and product removal is always a soft delete (`is_active = 0`);
//! rows are never hard-removed, so order snapshots keep a valid referent.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, info};

use hemline_domain::{Category, Product, Variant};

use crate::data_models::ProductDraft;
use crate::diesel_schema::{categories, products, variants};
use crate::error::PersistenceError;
use crate::queries::catalog::{find_category_by_id, find_product_by_id};

/// Diesel Insertable struct for new category rows.
#[derive(Insertable)]
#[diesel(table_name = categories)]
struct NewCategory<'a> {
    name: &'a str,
    slug: &'a str,
    created_at: &'a str,
}

/// Diesel Insertable struct for new product rows.
#[derive(Insertable)]
#[diesel(table_name = products)]
struct NewProduct<'a> {
    title: &'a str,
    slug: &'a str,
    description: &'a str,
    price: f64,
    compare_at_price: f64,
    category_id: i64,
    images_json: &'a str,
    tags_json: &'a str,
    is_featured: i32,
    created_at: &'a str,
}

/// Diesel Insertable struct for new variant rows.
#[derive(Insertable)]
#[diesel(table_name = variants)]
struct NewVariant<'a> {
    product_id: i64,
    size: &'a str,
    stock: i64,
    position: i32,
}

/// Creates a category.
///
/// # Errors
///
/// Returns `PersistenceError::DuplicateSlug` if the slug is taken, or
/// another error if the insert fails.
pub fn create_category(
    conn: &mut SqliteConnection,
    name: &str,
    slug: &str,
    created_at: &str,
) -> Result<Category, PersistenceError> {
    let record: NewCategory<'_> = NewCategory {
        name,
        slug,
        created_at,
    };

    let insert_result: Result<i64, DieselError> = diesel::insert_into(categories::table)
        .values(&record)
        .returning(categories::category_id)
        .get_result(conn);

    let category_id: i64 = match insert_result {
        Ok(id) => id,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(PersistenceError::DuplicateSlug {
                slug: slug.to_string(),
            });
        }
        Err(e) => return Err(PersistenceError::from(e)),
    };

    info!(category_id, slug, "Created category");

    find_category_by_id(conn, category_id)?.ok_or_else(|| {
        PersistenceError::ReconstructionError(format!(
            "Category {category_id} vanished after insert"
        ))
    })
}

/// Updates a category's name and slug.
///
/// # Errors
///
/// Returns `PersistenceError::DuplicateSlug` if the new slug belongs to a
/// different category, or another error if the update fails.
/// Returns `Ok(None)` if the category does not exist.
pub fn update_category(
    conn: &mut SqliteConnection,
    category_id: i64,
    name: &str,
    slug: &str,
) -> Result<Option<Category>, PersistenceError> {
    let update_result: Result<usize, DieselError> =
        diesel::update(categories::table.filter(categories::category_id.eq(category_id)))
            .set((categories::name.eq(name), categories::slug.eq(slug)))
            .execute(conn);

    let affected: usize = match update_result {
        Ok(n) => n,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(PersistenceError::DuplicateSlug {
                slug: slug.to_string(),
            });
        }
        Err(e) => return Err(PersistenceError::from(e)),
    };

    if affected == 0 {
        return Ok(None);
    }

    info!(category_id, slug, "Updated category");
    find_category_by_id(conn, category_id)
}

/// Sets a category's active flag. `false` is the soft delete.
///
/// # Errors
///
/// Returns an error if the update fails.
/// Returns `Ok(None)` if the category does not exist.
pub fn set_category_active(
    conn: &mut SqliteConnection,
    category_id: i64,
    is_active: bool,
) -> Result<Option<Category>, PersistenceError> {
    let affected: usize =
        diesel::update(categories::table.filter(categories::category_id.eq(category_id)))
            .set(categories::is_active.eq(i32::from(is_active)))
            .execute(conn)?;

    if affected == 0 {
        return Ok(None);
    }

    info!(category_id, is_active, "Set category active flag");
    find_category_by_id(conn, category_id)
}

/// Replaces a product's variant rows from a draft, preserving draft order.
fn replace_variants(
    conn: &mut SqliteConnection,
    product_id: i64,
    draft_variants: &[Variant],
) -> Result<(), PersistenceError> {
    diesel::delete(variants::table.filter(variants::product_id.eq(product_id))).execute(conn)?;

    let records: Vec<NewVariant<'_>> = draft_variants
        .iter()
        .enumerate()
        .map(|(position, variant)| NewVariant {
            product_id,
            size: &variant.size,
            stock: i64::from(variant.stock),
            position: i32::try_from(position).unwrap_or(i32::MAX),
        })
        .collect();

    diesel::insert_into(variants::table)
        .values(&records)
        .execute(conn)?;

    Ok(())
}

/// Creates a product with its variant rows, atomically.
///
/// # Errors
///
/// Returns `PersistenceError::DuplicateSlug` if the slug is taken, or
/// another error if any insert fails.
pub fn create_product(
    conn: &mut SqliteConnection,
    draft: &ProductDraft,
    created_at: &str,
) -> Result<Product, PersistenceError> {
    let images_json: String = serde_json::to_string(&draft.images)?;
    let tags_json: String = serde_json::to_string(&draft.tags)?;

    conn.transaction::<Product, PersistenceError, _>(|conn| {
        let record: NewProduct<'_> = NewProduct {
            title: &draft.title,
            slug: &draft.slug,
            description: &draft.description,
            price: draft.price,
            compare_at_price: draft.compare_at_price,
            category_id: draft.category_id,
            images_json: &images_json,
            tags_json: &tags_json,
            is_featured: i32::from(draft.is_featured),
            created_at,
        };

        let insert_result: Result<i64, DieselError> = diesel::insert_into(products::table)
            .values(&record)
            .returning(products::product_id)
            .get_result(conn);

        let product_id: i64 = match insert_result {
            Ok(id) => id,
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(PersistenceError::DuplicateSlug {
                    slug: draft.slug.clone(),
                });
            }
            Err(e) => return Err(PersistenceError::from(e)),
        };

        replace_variants(conn, product_id, &draft.variants)?;

        info!(product_id, slug = %draft.slug, "Created product");

        find_product_by_id(conn, product_id)?.ok_or_else(|| {
            PersistenceError::ReconstructionError(format!(
                "Product {product_id} vanished after insert"
            ))
        })
    })
}

/// Replaces a product's editable fields and variant set, atomically.
///
/// This is the admin catalog-edit path, the only stock ledger writer
/// besides checkout decrements.
///
/// # Errors
///
/// Returns `PersistenceError::DuplicateSlug` if the new slug belongs to a
/// different product, or another error if any statement fails.
/// Returns `Ok(None)` if the product does not exist.
pub fn update_product(
    conn: &mut SqliteConnection,
    product_id: i64,
    draft: &ProductDraft,
) -> Result<Option<Product>, PersistenceError> {
    let images_json: String = serde_json::to_string(&draft.images)?;
    let tags_json: String = serde_json::to_string(&draft.tags)?;

    conn.transaction::<Option<Product>, PersistenceError, _>(|conn| {
        let update_result: Result<usize, DieselError> =
            diesel::update(products::table.filter(products::product_id.eq(product_id)))
                .set((
                    products::title.eq(&draft.title),
                    products::slug.eq(&draft.slug),
                    products::description.eq(&draft.description),
                    products::price.eq(draft.price),
                    products::compare_at_price.eq(draft.compare_at_price),
                    products::category_id.eq(draft.category_id),
                    products::images_json.eq(&images_json),
                    products::tags_json.eq(&tags_json),
                    products::is_featured.eq(i32::from(draft.is_featured)),
                ))
                .execute(conn);

        let affected: usize = match update_result {
            Ok(n) => n,
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(PersistenceError::DuplicateSlug {
                    slug: draft.slug.clone(),
                });
            }
            Err(e) => return Err(PersistenceError::from(e)),
        };

        if affected == 0 {
            return Ok(None);
        }

        replace_variants(conn, product_id, &draft.variants)?;

        info!(product_id, slug = %draft.slug, "Updated product");
        find_product_by_id(conn, product_id)
    })
}

/// Sets a product's active flag. `false` is the soft delete.
///
/// # Errors
///
/// Returns an error if the update fails.
/// Returns `Ok(None)` if the product does not exist.
pub fn set_product_active(
    conn: &mut SqliteConnection,
    product_id: i64,
    is_active: bool,
) -> Result<Option<Product>, PersistenceError> {
    let affected: usize =
        diesel::update(products::table.filter(products::product_id.eq(product_id)))
            .set(products::is_active.eq(i32::from(is_active)))
            .execute(conn)?;

    if affected == 0 {
        return Ok(None);
    }

    info!(product_id, is_active, "Set product active flag");
    find_product_by_id(conn, product_id)
}

/// Applies one atomic conditional stock decrement.
///
/// The availability check and the decrement are a single statement:
/// "decrement stock by `qty` where the ledger row matches `(product_id,
/// size)` and `stock >= qty`". With zero rows affected the ledger was not
/// touched, and the caller learns the condition failed rather than getting
/// a silent no-op. This statement is the true admission gate at commit
/// time; any earlier read-only availability check is advisory.
///
/// # Returns
///
/// `true` if the decrement was applied, `false` if the variant is absent
/// or its stock is below `qty`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn apply_stock_decrement(
    conn: &mut SqliteConnection,
    product_id: i64,
    size: &str,
    qty: u32,
) -> Result<bool, PersistenceError> {
    let qty: i64 = i64::from(qty);

    let affected: usize = diesel::update(
        variants::table.filter(
            variants::product_id
                .eq(product_id)
                .and(variants::size.eq(size))
                .and(variants::stock.ge(qty)),
        ),
    )
    .set(variants::stock.eq(variants::stock - qty))
    .execute(conn)?;

    debug!(product_id, size, qty, applied = affected == 1, "Stock decrement");

    Ok(affected == 1)
}
