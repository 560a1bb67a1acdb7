// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Order mutations: the transactional commit pass and status updates.

use diesel::SqliteConnection;
use diesel::prelude::*;
use tracing::{info, warn};

use hemline_domain::{Order, OrderDraft, OrderStatus};

use crate::diesel_schema::{order_items, orders};
use crate::error::PersistenceError;
use crate::mutations::catalog::apply_stock_decrement;
use crate::queries::orders::find_order_by_id;

/// Diesel Insertable struct for new order rows.
#[derive(Insertable)]
#[diesel(table_name = orders)]
struct NewOrder<'a> {
    user_id: i64,
    ship_full_name: &'a str,
    ship_phone: &'a str,
    ship_address: &'a str,
    ship_city: &'a str,
    ship_country: &'a str,
    subtotal: f64,
    shipping_cost: f64,
    total: f64,
    status: &'a str,
    created_at: &'a str,
}

/// Diesel Insertable struct for new order item rows.
#[derive(Insertable)]
#[diesel(table_name = order_items)]
struct NewOrderItem<'a> {
    order_id: i64,
    product_id: i64,
    title_snapshot: &'a str,
    price_snapshot: f64,
    image_snapshot: Option<&'a str>,
    size: &'a str,
    qty: i64,
    position: i32,
}

/// Inserts the order row and its item rows. Must run inside the commit
/// transaction.
fn insert_order(
    conn: &mut SqliteConnection,
    draft: &OrderDraft,
    created_at: &str,
) -> Result<i64, PersistenceError> {
    let record: NewOrder<'_> = NewOrder {
        user_id: draft.user_id,
        ship_full_name: &draft.shipping_address.full_name,
        ship_phone: &draft.shipping_address.phone,
        ship_address: &draft.shipping_address.address,
        ship_city: &draft.shipping_address.city,
        ship_country: &draft.shipping_address.country,
        subtotal: draft.subtotal,
        shipping_cost: draft.shipping_cost,
        total: draft.total,
        status: OrderStatus::Placed.as_str(),
        created_at,
    };

    let order_id: i64 = diesel::insert_into(orders::table)
        .values(&record)
        .returning(orders::order_id)
        .get_result(conn)?;

    let item_records: Vec<NewOrderItem<'_>> = draft
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| NewOrderItem {
            order_id,
            product_id: item.product_id,
            title_snapshot: &item.title_snapshot,
            price_snapshot: item.price_snapshot,
            image_snapshot: item.image_snapshot.as_deref(),
            size: &item.size,
            qty: i64::from(item.qty),
            position: i32::try_from(position).unwrap_or(i32::MAX),
        })
        .collect();

    diesel::insert_into(order_items::table)
        .values(&item_records)
        .execute(conn)?;

    Ok(order_id)
}

/// Commits an order: decrements stock for every cart line and inserts the
/// order record, all inside one immediate transaction.
///
/// Every line's decrement is conditional on sufficient stock. The first
/// line whose decrement affects zero rows aborts the transaction, which
/// rolls back the decrements already applied for earlier lines. Either
/// every line's stock is taken and the order exists, or nothing changed.
///
/// # Errors
///
/// Returns `PersistenceError::StockConflict` naming the first line that
/// could not be satisfied, or another error if a statement fails.
pub fn commit_order(
    conn: &mut SqliteConnection,
    draft: &OrderDraft,
    created_at: &str,
) -> Result<Order, PersistenceError> {
    // BEGIN IMMEDIATE takes the write lock up front, so the decrements and
    // the insert cannot interleave with another writer.
    let order_id: i64 = conn.immediate_transaction::<i64, PersistenceError, _>(|conn| {
        for item in &draft.items {
            let applied: bool = apply_stock_decrement(conn, item.product_id, &item.size, item.qty)?;
            if !applied {
                warn!(
                    product_id = item.product_id,
                    size = %item.size,
                    qty = item.qty,
                    "Stock conflict at commit, rolling back order"
                );
                return Err(PersistenceError::StockConflict {
                    product_id: item.product_id,
                    size: item.size.clone(),
                });
            }
        }

        insert_order(conn, draft, created_at)
    })?;

    info!(
        order_id,
        user_id = draft.user_id,
        total = draft.total,
        "Committed order"
    );

    find_order_by_id(conn, order_id)?.ok_or_else(|| {
        PersistenceError::ReconstructionError(format!("Order {order_id} vanished after commit"))
    })
}

/// Advances an order's status with a conditional update.
///
/// The update is guarded by `status = from`, mirroring the stock
/// decrement: if the stored status moved since the caller read it, zero
/// rows are affected and the caller sees `false` instead of a silently
/// repeated or skipped transition.
///
/// # Returns
///
/// `true` if the transition was applied, `false` if the order is absent
/// or its stored status no longer matches `from`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_order_status(
    conn: &mut SqliteConnection,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<bool, PersistenceError> {
    let affected: usize = diesel::update(
        orders::table.filter(
            orders::order_id
                .eq(order_id)
                .and(orders::status.eq(from.as_str())),
        ),
    )
    .set(orders::status.eq(to.as_str()))
    .execute(conn)?;

    if affected == 1 {
        info!(order_id, from = from.as_str(), to = to.as_str(), "Order status advanced");
    }

    Ok(affected == 1)
}
