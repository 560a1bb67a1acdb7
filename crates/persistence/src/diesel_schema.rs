// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

diesel::table! {
    users (user_id) {
        user_id -> BigInt,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        role -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    categories (category_id) {
        category_id -> BigInt,
        name -> Text,
        slug -> Text,
        is_active -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    products (product_id) {
        product_id -> BigInt,
        title -> Text,
        slug -> Text,
        description -> Text,
        price -> Double,
        compare_at_price -> Double,
        category_id -> BigInt,
        images_json -> Text,
        tags_json -> Text,
        is_featured -> Integer,
        is_active -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    variants (variant_id) {
        variant_id -> BigInt,
        product_id -> BigInt,
        size -> Text,
        stock -> BigInt,
        position -> Integer,
    }
}

diesel::table! {
    orders (order_id) {
        order_id -> BigInt,
        user_id -> BigInt,
        ship_full_name -> Text,
        ship_phone -> Text,
        ship_address -> Text,
        ship_city -> Text,
        ship_country -> Text,
        subtotal -> Double,
        shipping_cost -> Double,
        total -> Double,
        status -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    order_items (order_item_id) {
        order_item_id -> BigInt,
        order_id -> BigInt,
        product_id -> BigInt,
        title_snapshot -> Text,
        price_snapshot -> Double,
        image_snapshot -> Nullable<Text>,
        size -> Text,
        qty -> BigInt,
        position -> Integer,
    }
}

diesel::joinable!(products -> categories (category_id));
diesel::joinable!(variants -> products (product_id));
diesel::joinable!(orders -> users (user_id));
diesel::joinable!(order_items -> orders (order_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    categories,
    products,
    variants,
    orders,
    order_items,
);
