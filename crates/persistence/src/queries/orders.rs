// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Order record queries.
//!
//! Orders are reassembled from the `orders` row plus their `order_items`
//! rows in cart order. Item snapshots are returned exactly as stored; they
//! are never re-derived from the live catalog.

use std::str::FromStr;

use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::debug;

use hemline_domain::{Order, OrderItem, OrderStatus, ShippingAddress};

use crate::data_models::{AdminOrder, Page, PageRequest};
use crate::diesel_schema::{order_items, orders, users};
use crate::error::PersistenceError;

/// Diesel Queryable struct for order rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = orders)]
struct OrderRow {
    order_id: i64,
    user_id: i64,
    ship_full_name: String,
    ship_phone: String,
    ship_address: String,
    ship_city: String,
    ship_country: String,
    subtotal: f64,
    shipping_cost: f64,
    total: f64,
    status: String,
    created_at: String,
}

/// Diesel Queryable struct for order item rows.
#[derive(Queryable, Selectable)]
#[diesel(table_name = order_items)]
struct OrderItemRow {
    order_id: i64,
    product_id: i64,
    title_snapshot: String,
    price_snapshot: f64,
    image_snapshot: Option<String>,
    size: String,
    qty: i64,
}

impl OrderItemRow {
    fn into_domain(self) -> Result<OrderItem, PersistenceError> {
        let qty: u32 = u32::try_from(self.qty).map_err(|_| {
            PersistenceError::ReconstructionError(format!(
                "Invalid quantity {} on order {}",
                self.qty, self.order_id
            ))
        })?;
        Ok(OrderItem {
            product_id: self.product_id,
            title_snapshot: self.title_snapshot,
            price_snapshot: self.price_snapshot,
            image_snapshot: self.image_snapshot,
            size: self.size,
            qty,
        })
    }
}

/// Assembles a domain order from its row and item rows.
fn assemble_order(row: OrderRow, item_rows: Vec<OrderItemRow>) -> Result<Order, PersistenceError> {
    let status: OrderStatus = OrderStatus::from_str(&row.status).map_err(|e| {
        PersistenceError::ReconstructionError(format!("Order {}: {e}", row.order_id))
    })?;

    let items: Vec<OrderItem> = item_rows
        .into_iter()
        .map(OrderItemRow::into_domain)
        .collect::<Result<Vec<OrderItem>, PersistenceError>>()?;

    Ok(Order {
        order_id: row.order_id,
        user_id: row.user_id,
        items,
        shipping_address: ShippingAddress {
            full_name: row.ship_full_name,
            phone: row.ship_phone,
            address: row.ship_address,
            city: row.ship_city,
            country: row.ship_country,
        },
        subtotal: row.subtotal,
        shipping_cost: row.shipping_cost,
        total: row.total,
        status,
        created_at: row.created_at,
    })
}

/// Loads item rows for a set of orders and assembles domain orders
/// preserving row order.
fn assemble_orders(
    conn: &mut SqliteConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, PersistenceError> {
    let ids: Vec<i64> = rows.iter().map(|row| row.order_id).collect();

    let item_rows: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq_any(&ids))
        .order((order_items::order_id.asc(), order_items::position.asc()))
        .select(OrderItemRow::as_select())
        .load(conn)?;

    let mut result: Vec<Order> = Vec::with_capacity(rows.len());
    for row in rows {
        let order_id: i64 = row.order_id;
        let own_items: Vec<OrderItemRow> = item_rows
            .iter()
            .filter(|item| item.order_id == order_id)
            .map(|item| OrderItemRow {
                order_id: item.order_id,
                product_id: item.product_id,
                title_snapshot: item.title_snapshot.clone(),
                price_snapshot: item.price_snapshot,
                image_snapshot: item.image_snapshot.clone(),
                size: item.size.clone(),
                qty: item.qty,
            })
            .collect();
        result.push(assemble_order(row, own_items)?);
    }

    Ok(result)
}

/// Retrieves an order by ID.
///
/// # Errors
///
/// Returns an error if the database query fails or stored data cannot be
/// reconstructed.
/// Returns `Ok(None)` if the order is not found.
pub fn find_order_by_id(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> Result<Option<Order>, PersistenceError> {
    let result: Result<OrderRow, diesel::result::Error> = orders::table
        .filter(orders::order_id.eq(order_id))
        .select(OrderRow::as_select())
        .first(conn);

    match result {
        Ok(row) => {
            let mut assembled: Vec<Order> = assemble_orders(conn, vec![row])?;
            Ok(assembled.pop())
        }
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(PersistenceError::from(e)),
    }
}

/// Lists a user's orders, newest first, one page at a time.
///
/// # Errors
///
/// Returns an error if the database query fails or stored data cannot be
/// reconstructed.
pub fn list_orders_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    page: PageRequest,
) -> Result<Page<Order>, PersistenceError> {
    debug!(user_id, ?page, "Listing orders for user");

    let total: i64 = orders::table
        .filter(orders::user_id.eq(user_id))
        .count()
        .get_result(conn)?;

    let rows: Vec<OrderRow> = orders::table
        .filter(orders::user_id.eq(user_id))
        .order(orders::order_id.desc())
        .limit(i64::from(page.effective_limit()))
        .offset(page.offset())
        .select(OrderRow::as_select())
        .load(conn)?;

    let items: Vec<Order> = assemble_orders(conn, rows)?;

    Ok(Page {
        items,
        total,
        page: page.effective_page(),
        pages: page.pages_for_total(total),
    })
}

/// Lists all orders, newest first, with each owner's identity joined in
/// for display. Admin view.
///
/// # Errors
///
/// Returns an error if the database query fails or stored data cannot be
/// reconstructed.
pub fn list_all_orders(
    conn: &mut SqliteConnection,
    page: PageRequest,
) -> Result<Page<AdminOrder>, PersistenceError> {
    debug!(?page, "Listing all orders");

    let total: i64 = orders::table.count().get_result(conn)?;

    let rows: Vec<(OrderRow, String, String)> = orders::table
        .inner_join(users::table)
        .order(orders::order_id.desc())
        .limit(i64::from(page.effective_limit()))
        .offset(page.offset())
        .select((OrderRow::as_select(), users::name, users::email))
        .load(conn)?;

    let mut owners: Vec<(String, String)> = Vec::with_capacity(rows.len());
    let mut order_rows: Vec<OrderRow> = Vec::with_capacity(rows.len());
    for (row, owner_name, owner_email) in rows {
        owners.push((owner_name, owner_email));
        order_rows.push(row);
    }

    let assembled: Vec<Order> = assemble_orders(conn, order_rows)?;
    let items: Vec<AdminOrder> = assembled
        .into_iter()
        .zip(owners)
        .map(|(order, (owner_name, owner_email))| AdminOrder {
            order,
            owner_name,
            owner_email,
        })
        .collect();

    Ok(Page {
        items,
        total,
        page: page.effective_page(),
        pages: page.pages_for_total(total),
    })
}
