// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Catalog queries: products, variants, and categories.
//!
//! Products are stored across two tables (`products` plus one `variants` row
//! per size); queries reassemble them into domain [`Product`] values. The
//! `images_json` and `tags_json` columns hold JSON arrays decoded here.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use tracing::debug;

use hemline_domain::{Category, Product, Variant};

use crate::data_models::{CategoryFilter, CategorySort, Page, PageRequest, ProductFilter,
    ProductSort};
use crate::diesel_schema::{categories, products, variants};
use crate::error::PersistenceError;

/// Diesel Queryable struct for product rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = products)]
pub(crate) struct ProductRow {
    product_id: i64,
    title: String,
    slug: String,
    description: String,
    price: f64,
    compare_at_price: f64,
    category_id: i64,
    images_json: String,
    tags_json: String,
    is_featured: i32,
    is_active: i32,
    created_at: String,
}

/// Diesel Queryable struct for variant rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = variants)]
struct VariantRow {
    product_id: i64,
    size: String,
    stock: i64,
}

/// Diesel Queryable struct for category rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = categories)]
struct CategoryRow {
    category_id: i64,
    name: String,
    slug: String,
    is_active: i32,
    created_at: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            category_id: row.category_id,
            name: row.name,
            slug: row.slug,
            is_active: row.is_active != 0,
            created_at: row.created_at,
        }
    }
}

impl VariantRow {
    fn into_domain(self) -> Result<Variant, PersistenceError> {
        let stock: u32 = u32::try_from(self.stock).map_err(|_| {
            PersistenceError::ReconstructionError(format!(
                "Negative stock {} for product {}, size '{}'",
                self.stock, self.product_id, self.size
            ))
        })?;
        Ok(Variant::new(self.size, stock))
    }
}

/// Assembles a domain product from its row and variant rows.
fn assemble_product(
    row: ProductRow,
    variant_rows: Vec<VariantRow>,
) -> Result<Product, PersistenceError> {
    let images: Vec<String> = serde_json::from_str(&row.images_json)?;
    let tags: Vec<String> = serde_json::from_str(&row.tags_json)?;
    let product_variants: Vec<Variant> = variant_rows
        .into_iter()
        .map(VariantRow::into_domain)
        .collect::<Result<Vec<Variant>, PersistenceError>>()?;

    Ok(Product {
        product_id: row.product_id,
        title: row.title,
        slug: row.slug,
        description: row.description,
        price: row.price,
        compare_at_price: row.compare_at_price,
        category_id: row.category_id,
        images,
        variants: product_variants,
        tags,
        is_featured: row.is_featured != 0,
        is_active: row.is_active != 0,
        created_at: row.created_at,
    })
}

/// Loads variant rows for a set of products, in display order, and
/// assembles the rows into domain products preserving row order.
fn assemble_products(
    conn: &mut SqliteConnection,
    rows: Vec<ProductRow>,
) -> Result<Vec<Product>, PersistenceError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.product_id).collect();

    let variant_rows: Vec<VariantRow> = variants::table
        .filter(variants::product_id.eq_any(&ids))
        .order((variants::product_id.asc(), variants::position.asc()))
        .select(VariantRow::as_select())
        .load(conn)?;

    let mut result: Vec<Product> = Vec::with_capacity(rows.len());
    for row in rows {
        let product_id: i64 = row.product_id;
        let own_variants: Vec<VariantRow> = variant_rows
            .iter()
            .filter(|v| v.product_id == product_id)
            .map(|v| VariantRow {
                product_id: v.product_id,
                size: v.size.clone(),
                stock: v.stock,
            })
            .collect();
        result.push(assemble_product(row, own_variants)?);
    }

    Ok(result)
}

/// Builds a boxed product query from a filter.
///
/// Built once for the page load and once for the count, since boxed
/// queries cannot be cloned.
fn filtered_products(filter: &ProductFilter) -> products::BoxedQuery<'static, Sqlite> {
    let mut query: products::BoxedQuery<'static, Sqlite> = products::table.into_boxed();

    if let Some(category_id) = filter.category_id {
        query = query.filter(products::category_id.eq(category_id));
    }
    if let Some(title_query) = &filter.title_query {
        query = query.filter(products::title.like(format!("%{title_query}%")));
    }
    if let Some(min_price) = filter.min_price {
        query = query.filter(products::price.ge(min_price));
    }
    if let Some(max_price) = filter.max_price {
        query = query.filter(products::price.le(max_price));
    }
    if let Some(tag) = &filter.tag {
        // Tags are stored as a JSON array of strings; a quoted substring
        // match finds exact tag membership.
        query = query.filter(products::tags_json.like(format!("%\"{tag}\"%")));
    }
    if let Some(featured) = filter.featured {
        query = query.filter(products::is_featured.eq(i32::from(featured)));
    }
    if let Some(size) = &filter.in_stock_size {
        let in_stock = variants::table
            .filter(variants::size.eq(size.clone()).and(variants::stock.gt(0)))
            .select(variants::product_id);
        query = query.filter(products::product_id.eq_any(in_stock));
    }
    if let Some(active) = filter.active {
        query = query.filter(products::is_active.eq(i32::from(active)));
    }

    match filter.sort {
        ProductSort::New => query.order(products::product_id.desc()),
        ProductSort::Old => query.order(products::product_id.asc()),
        ProductSort::PriceAsc => {
            query.order((products::price.asc(), products::product_id.desc()))
        }
        ProductSort::PriceDesc => {
            query.order((products::price.desc(), products::product_id.desc()))
        }
        ProductSort::TitleAsc => {
            query.order((products::title.asc(), products::product_id.desc()))
        }
        ProductSort::TitleDesc => {
            query.order((products::title.desc(), products::product_id.desc()))
        }
    }
}

/// Lists products matching a filter, one page at a time.
///
/// # Errors
///
/// Returns an error if the database query fails or stored data cannot be
/// decoded.
pub fn list_products(
    conn: &mut SqliteConnection,
    filter: &ProductFilter,
    page: PageRequest,
) -> Result<Page<Product>, PersistenceError> {
    debug!(?filter, ?page, "Listing products");

    let total: i64 = filtered_products(filter).count().get_result(conn)?;

    let rows: Vec<ProductRow> = filtered_products(filter)
        .limit(i64::from(page.effective_limit()))
        .offset(page.offset())
        .select(ProductRow::as_select())
        .load(conn)?;

    let items: Vec<Product> = assemble_products(conn, rows)?;

    Ok(Page {
        items,
        total,
        page: page.effective_page(),
        pages: page.pages_for_total(total),
    })
}

/// Retrieves a product by ID, regardless of active flag.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the product is not found.
pub fn find_product_by_id(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> Result<Option<Product>, PersistenceError> {
    let result: Result<ProductRow, diesel::result::Error> = products::table
        .filter(products::product_id.eq(product_id))
        .select(ProductRow::as_select())
        .first(conn);

    match result {
        Ok(row) => {
            let mut assembled: Vec<Product> = assemble_products(conn, vec![row])?;
            Ok(assembled.pop())
        }
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Retrieves an active product by slug. Soft-deleted products are invisible
/// on the storefront, so inactive slugs return `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn find_active_product_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<Option<Product>, PersistenceError> {
    let result: Result<ProductRow, diesel::result::Error> = products::table
        .filter(products::slug.eq(slug).and(products::is_active.eq(1)))
        .select(ProductRow::as_select())
        .first(conn);

    match result {
        Ok(row) => {
            let mut assembled: Vec<Product> = assemble_products(conn, vec![row])?;
            Ok(assembled.pop())
        }
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Checks whether a product slug is taken, optionally excluding one product
/// (for updates).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn product_slug_exists(
    conn: &mut SqliteConnection,
    slug: &str,
    exclude_product_id: Option<i64>,
) -> Result<bool, PersistenceError> {
    let mut query = products::table.filter(products::slug.eq(slug)).into_boxed();
    if let Some(exclude) = exclude_product_id {
        query = query.filter(products::product_id.ne(exclude));
    }
    let count: i64 = query.count().get_result(conn)?;
    Ok(count > 0)
}

/// Returns the current stock for one `(product, size)` ledger entry.
///
/// # Errors
///
/// Returns an error if the database query fails or the stored counter is
/// negative.
/// Returns `Ok(None)` if no such variant exists.
pub fn get_variant_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    size: &str,
) -> Result<Option<u32>, PersistenceError> {
    let result: Result<i64, diesel::result::Error> = variants::table
        .filter(
            variants::product_id
                .eq(product_id)
                .and(variants::size.eq(size)),
        )
        .select(variants::stock)
        .first(conn);

    match result {
        Ok(stock) => {
            let stock: u32 = u32::try_from(stock).map_err(|_| {
                PersistenceError::ReconstructionError(format!(
                    "Negative stock {stock} for product {product_id}, size '{size}'"
                ))
            })?;
            Ok(Some(stock))
        }
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Builds a boxed category query from a filter.
fn filtered_categories(filter: &CategoryFilter) -> categories::BoxedQuery<'static, Sqlite> {
    let mut query: categories::BoxedQuery<'static, Sqlite> = categories::table.into_boxed();

    if let Some(name_query) = &filter.name_query {
        query = query.filter(categories::name.like(format!("%{name_query}%")));
    }
    if let Some(active) = filter.active {
        query = query.filter(categories::is_active.eq(i32::from(active)));
    }

    match filter.sort {
        CategorySort::New => query.order(categories::category_id.desc()),
        CategorySort::Old => query.order(categories::category_id.asc()),
        CategorySort::NameAsc => query.order(categories::name.asc()),
        CategorySort::NameDesc => query.order(categories::name.desc()),
    }
}

/// Lists categories matching a filter, one page at a time.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_categories(
    conn: &mut SqliteConnection,
    filter: &CategoryFilter,
    page: PageRequest,
) -> Result<Page<Category>, PersistenceError> {
    let total: i64 = filtered_categories(filter).count().get_result(conn)?;

    let rows: Vec<CategoryRow> = filtered_categories(filter)
        .limit(i64::from(page.effective_limit()))
        .offset(page.offset())
        .select(CategoryRow::as_select())
        .load(conn)?;

    Ok(Page {
        items: rows.into_iter().map(Category::from).collect(),
        total,
        page: page.effective_page(),
        pages: page.pages_for_total(total),
    })
}

/// Retrieves a category by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
/// Returns `Ok(None)` if the category is not found.
pub fn find_category_by_id(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<Option<Category>, PersistenceError> {
    let result: Result<CategoryRow, diesel::result::Error> = categories::table
        .filter(categories::category_id.eq(category_id))
        .select(CategoryRow::as_select())
        .first(conn);

    match result {
        Ok(row) => Ok(Some(Category::from(row))),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Checks whether a category slug is taken, optionally excluding one
/// category (for updates).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn category_slug_exists(
    conn: &mut SqliteConnection,
    slug: &str,
    exclude_category_id: Option<i64>,
) -> Result<bool, PersistenceError> {
    let mut query = categories::table
        .filter(categories::slug.eq(slug))
        .into_boxed();
    if let Some(exclude) = exclude_category_id {
        query = query.filter(categories::category_id.ne(exclude));
    }
    let count: i64 = query.count().get_result(conn)?;
    Ok(count > 0)
}
