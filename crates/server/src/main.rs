// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use hemline_api::{
    AdminOrderView, ApiError, AuthResponse, AuthenticatedUser, CategoryRequest, JwtService,
    LoginRequest, PagedResponse, PlaceOrderRequest, ProductRequest, RegisterRequest,
    SetActiveRequest, UpdateOrderStatusRequest, UserProfile, advance_order_status, all_orders,
    create_category, create_product, current_user, delete_category, delete_product,
    featured_products, list_categories, list_products, login, my_orders, order_detail,
    place_order, product_by_id, product_by_slug, register, set_category_active,
    set_product_active, update_category, update_product,
};
use hemline_domain::{Category, Order, Product};
use hemline_persistence::{
    CategoryFilter, PageRequest, ProductFilter, ProductSort, StorePersistence,
};

/// Hemline Server - HTTP server for the Hemline storefront
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Secret used to sign bearer tokens
    #[arg(long, default_value = "hemline-dev-secret")]
    jwt_secret: String,
}

/// Application state shared across handlers.
///
/// This contains the persistence layer wrapped in a Mutex to allow
/// safe concurrent access, and the token service for bearer auth.
#[derive(Clone)]
struct AppState {
    /// The persistence layer for the catalog, accounts, and orders.
    persistence: Arc<Mutex<StorePersistence>>,
    /// The bearer token service.
    jwt: Arc<JwtService>,
}

/// Query parameters for product listings.
#[derive(Debug, Deserialize)]
struct ProductListQuery {
    /// The 1-based page number.
    page: Option<u32>,
    /// Items per page.
    limit: Option<u32>,
    /// Restrict to one category.
    category: Option<i64>,
    /// Case-insensitive substring match on the title.
    q: Option<String>,
    /// Inclusive lower price bound.
    min_price: Option<f64>,
    /// Inclusive upper price bound.
    max_price: Option<f64>,
    /// Restrict to products carrying this tag.
    tag: Option<String>,
    /// Restrict to products with this size in stock.
    size: Option<String>,
    /// Restrict by the featured flag.
    featured: Option<bool>,
    /// Sort key: new, old, price_asc, price_desc, title_asc, title_desc.
    sort: Option<String>,
}

/// Query parameters for plain paginated listings.
#[derive(Debug, Deserialize)]
struct PageQuery {
    /// The 1-based page number.
    page: Option<u32>,
    /// Items per page.
    limit: Option<u32>,
}

/// API response for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HealthResponse {
    /// Service status indicator.
    status: String,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ApiError::InvalidInput { .. }
            | ApiError::OutOfStock { .. }
            | ApiError::PriceChanged { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InvalidStatusTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Extracts and verifies the bearer token from the request headers.
fn bearer_user(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, HttpError> {
    let value: &str = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HttpError {
            status: StatusCode::UNAUTHORIZED,
            message: String::from("Missing bearer token"),
        })?;

    let token: &str = value.strip_prefix("Bearer ").ok_or_else(|| HttpError {
        status: StatusCode::UNAUTHORIZED,
        message: String::from("Authorization header must be a bearer token"),
    })?;

    state.jwt.verify(token).map_err(|e| HttpError {
        status: StatusCode::UNAUTHORIZED,
        message: e.to_string(),
    })
}

/// Builds a page request from optional query parameters.
const fn page_request(page: Option<u32>, limit: Option<u32>) -> PageRequest {
    PageRequest::new(
        match page {
            Some(p) => p,
            None => 1,
        },
        match limit {
            Some(l) => l,
            None => 12,
        },
    )
}

/// Parses a product sort key from its query-string form.
fn parse_sort(sort: Option<&str>) -> Result<ProductSort, HttpError> {
    match sort {
        None | Some("new") => Ok(ProductSort::New),
        Some("old") => Ok(ProductSort::Old),
        Some("price_asc") => Ok(ProductSort::PriceAsc),
        Some("price_desc") => Ok(ProductSort::PriceDesc),
        Some("title_asc") => Ok(ProductSort::TitleAsc),
        Some("title_desc") => Ok(ProductSort::TitleDesc),
        Some(other) => Err(HttpError {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid sort key: '{other}'"),
        }),
    }
}

/// Builds a product filter from listing query parameters.
fn product_filter(query: ProductListQuery, active: Option<bool>) -> Result<ProductFilter, HttpError> {
    let sort: ProductSort = parse_sort(query.sort.as_deref())?;
    Ok(ProductFilter {
        category_id: query.category,
        title_query: query.q,
        min_price: query.min_price,
        max_price: query.max_price,
        tag: query.tag,
        featured: query.featured,
        in_stock_size: query.size,
        active,
        sort,
    })
}

/// Handler for GET /health endpoint.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
    })
}

/// Handler for POST `/api/auth/register` endpoint.
async fn handle_register(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), HttpError> {
    info!("Handling register request");

    let mut store = state.persistence.lock().await;
    let response: AuthResponse = register(&mut store, &state.jwt, req)?;
    drop(store);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for POST `/api/auth/login` endpoint.
async fn handle_login(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, HttpError> {
    info!("Handling login request");

    let mut store = state.persistence.lock().await;
    let response: AuthResponse = login(&mut store, &state.jwt, req)?;
    drop(store);

    Ok(Json(response))
}

/// Handler for GET `/api/auth/me` endpoint.
async fn handle_me(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let profile: UserProfile = current_user(&mut store, &user)?;
    drop(store);

    Ok(Json(profile))
}

/// Handler for GET `/api/categories` endpoint.
///
/// Public listing: soft-deleted categories are hidden.
async fn handle_list_categories(
    AxumState(state): AxumState<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResponse<Category>>, HttpError> {
    let filter: CategoryFilter = CategoryFilter {
        active: Some(true),
        ..CategoryFilter::default()
    };

    let mut store = state.persistence.lock().await;
    let page: PagedResponse<Category> =
        list_categories(&mut store, &filter, page_request(query.page, query.limit))?;
    drop(store);

    Ok(Json(page))
}

/// Handler for GET `/api/products` endpoint.
///
/// Public listing: soft-deleted products are hidden.
async fn handle_list_products(
    AxumState(state): AxumState<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<PagedResponse<Product>>, HttpError> {
    let request: PageRequest = page_request(query.page, query.limit);
    let filter: ProductFilter = product_filter(query, Some(true))?;

    let mut store = state.persistence.lock().await;
    let page: PagedResponse<Product> = list_products(&mut store, &filter, request)?;
    drop(store);

    Ok(Json(page))
}

/// Handler for GET `/api/products/featured` endpoint.
async fn handle_featured_products(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<Vec<Product>>, HttpError> {
    let mut store = state.persistence.lock().await;
    let products: Vec<Product> = featured_products(&mut store)?;
    drop(store);

    Ok(Json(products))
}

/// Handler for GET `/api/products/{slug}` endpoint.
async fn handle_product_by_slug(
    AxumState(state): AxumState<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, HttpError> {
    let mut store = state.persistence.lock().await;
    let product: Product = product_by_slug(&mut store, &slug)?;
    drop(store);

    Ok(Json(product))
}

/// Handler for POST `/api/orders` endpoint.
///
/// Places an order for the authenticated user.
async fn handle_place_order(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    info!(user_id = user.user_id, "Handling place_order request");

    let mut store = state.persistence.lock().await;
    let order: Order = place_order(&mut store, &user, req)?;
    drop(store);

    Ok((StatusCode::CREATED, Json(order)))
}

/// Handler for GET `/api/orders` endpoint.
///
/// Lists the authenticated user's orders, newest first.
async fn handle_my_orders(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResponse<Order>>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let page: PagedResponse<Order> =
        my_orders(&mut store, &user, page_request(query.page, query.limit))?;
    drop(store);

    Ok(Json(page))
}

/// Handler for GET `/api/orders/{order_id}` endpoint.
async fn handle_order_detail(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let order: Order = order_detail(&mut store, &user, order_id)?;
    drop(store);

    Ok(Json(order))
}

/// Handler for GET `/api/admin/categories` endpoint.
///
/// Admin listing: soft-deleted categories are included.
async fn handle_admin_list_categories(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResponse<Category>>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;
    hemline_api::AuthorizationService::authorize_manage_catalog(&user)
        .map_err(|e| HttpError::from(ApiError::from(e)))?;

    let mut store = state.persistence.lock().await;
    let page: PagedResponse<Category> = list_categories(
        &mut store,
        &CategoryFilter::default(),
        page_request(query.page, query.limit),
    )?;
    drop(store);

    Ok(Json(page))
}

/// Handler for POST `/api/admin/categories` endpoint.
async fn handle_create_category(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    info!(slug = %req.slug, "Handling create_category request");

    let mut store = state.persistence.lock().await;
    let category: Category = create_category(&mut store, &user, req)?;
    drop(store);

    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for PUT `/api/admin/categories/{category_id}` endpoint.
async fn handle_update_category(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(category_id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let category: Category = update_category(&mut store, &user, category_id, req)?;
    drop(store);

    Ok(Json(category))
}

/// Handler for DELETE `/api/admin/categories/{category_id}` endpoint.
///
/// Soft-deletes the category.
async fn handle_delete_category(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(category_id): Path<i64>,
) -> Result<Json<Category>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let category: Category = delete_category(&mut store, &user, category_id)?;
    drop(store);

    Ok(Json(category))
}

/// Handler for PATCH `/api/admin/categories/{category_id}/active` endpoint.
///
/// Restores or hides the category.
async fn handle_set_category_active(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(category_id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<Category>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let category: Category = set_category_active(&mut store, &user, category_id, req)?;
    drop(store);

    Ok(Json(category))
}

/// Handler for GET `/api/admin/products` endpoint.
///
/// Admin listing: soft-deleted products are included.
async fn handle_admin_list_products(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<PagedResponse<Product>>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;
    hemline_api::AuthorizationService::authorize_manage_catalog(&user)
        .map_err(|e| HttpError::from(ApiError::from(e)))?;

    let request: PageRequest = page_request(query.page, query.limit);
    let filter: ProductFilter = product_filter(query, None)?;

    let mut store = state.persistence.lock().await;
    let page: PagedResponse<Product> = list_products(&mut store, &filter, request)?;
    drop(store);

    Ok(Json(page))
}

/// Handler for GET `/api/admin/products/{product_id}` endpoint.
async fn handle_admin_product_by_id(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Result<Json<Product>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let product: Product = product_by_id(&mut store, &user, product_id)?;
    drop(store);

    Ok(Json(product))
}

/// Handler for POST `/api/admin/products` endpoint.
async fn handle_create_product(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    info!(slug = %req.slug, "Handling create_product request");

    let mut store = state.persistence.lock().await;
    let product: Product = create_product(&mut store, &user, req)?;
    drop(store);

    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for PUT `/api/admin/products/{product_id}` endpoint.
async fn handle_update_product(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let product: Product = update_product(&mut store, &user, product_id, req)?;
    drop(store);

    Ok(Json(product))
}

/// Handler for DELETE `/api/admin/products/{product_id}` endpoint.
///
/// Soft-deletes the product; historical order snapshots keep referring
/// to it.
async fn handle_delete_product(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Result<Json<Product>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let product: Product = delete_product(&mut store, &user, product_id)?;
    drop(store);

    Ok(Json(product))
}

/// Handler for PATCH `/api/admin/products/{product_id}/active` endpoint.
///
/// Restores or hides the product.
async fn handle_set_product_active(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<Product>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let product: Product = set_product_active(&mut store, &user, product_id, req)?;
    drop(store);

    Ok(Json(product))
}

/// Handler for GET `/api/admin/orders` endpoint.
///
/// Lists every order with owner identities.
async fn handle_all_orders(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResponse<AdminOrderView>>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    let mut store = state.persistence.lock().await;
    let page: PagedResponse<AdminOrderView> =
        all_orders(&mut store, &user, page_request(query.page, query.limit))?;
    drop(store);

    Ok(Json(page))
}

/// Handler for PUT `/api/admin/orders/{order_id}/status` endpoint.
///
/// Advances the order one step through the fulfilment lifecycle.
async fn handle_update_order_status(
    AxumState(state): AxumState<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, HttpError> {
    let user: AuthenticatedUser = bearer_user(&state, &headers)?;

    info!(order_id, status = %req.status, "Handling update_order_status request");

    let mut store = state.persistence.lock().await;
    let order: Order = advance_order_status(&mut store, &user, order_id, req)?;
    drop(store);

    Ok(Json(order))
}

/// Builds the application router with all endpoints.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/auth/register", post(handle_register))
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/me", get(handle_me))
        .route("/api/categories", get(handle_list_categories))
        .route("/api/products", get(handle_list_products))
        .route("/api/products/featured", get(handle_featured_products))
        .route("/api/products/{slug}", get(handle_product_by_slug))
        .route("/api/orders", post(handle_place_order))
        .route("/api/orders", get(handle_my_orders))
        .route("/api/orders/{order_id}", get(handle_order_detail))
        .route("/api/admin/categories", get(handle_admin_list_categories))
        .route("/api/admin/categories", post(handle_create_category))
        .route(
            "/api/admin/categories/{category_id}",
            put(handle_update_category),
        )
        .route(
            "/api/admin/categories/{category_id}",
            delete(handle_delete_category),
        )
        .route(
            "/api/admin/categories/{category_id}/active",
            patch(handle_set_category_active),
        )
        .route("/api/admin/products", get(handle_admin_list_products))
        .route("/api/admin/products", post(handle_create_product))
        .route(
            "/api/admin/products/{product_id}",
            get(handle_admin_product_by_id),
        )
        .route(
            "/api/admin/products/{product_id}",
            put(handle_update_product),
        )
        .route(
            "/api/admin/products/{product_id}",
            delete(handle_delete_product),
        )
        .route(
            "/api/admin/products/{product_id}/active",
            patch(handle_set_product_active),
        )
        .route("/api/admin/orders", get(handle_all_orders))
        .route(
            "/api/admin/orders/{order_id}/status",
            put(handle_update_order_status),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Hemline Server");

    // Initialize persistence (in-memory or file-based based on CLI argument)
    let persistence: StorePersistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        StorePersistence::open(db_path)?
    } else {
        info!("Using in-memory database");
        StorePersistence::new_in_memory()?
    };

    let state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        jwt: Arc::new(JwtService::new(&args.jwt_secret)),
    };

    // Build router
    let app: Router = build_router(state);

    // Bind to address
    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use hemline_api::Role;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Helper to create test app state with in-memory persistence.
    fn create_test_app_state() -> AppState {
        let persistence: StorePersistence =
            StorePersistence::new_in_memory().expect("Failed to create in-memory persistence");
        AppState {
            persistence: Arc::new(Mutex::new(persistence)),
            jwt: Arc::new(JwtService::new("test-secret")),
        }
    }

    /// Seeds an admin account directly and mints a token for it.
    async fn admin_token(state: &AppState) -> String {
        let mut store = state.persistence.lock().await;
        let user = store
            .create_user("Store Admin", "admin@example.com", "$2b$12$unused", "admin")
            .expect("Seed admin");
        drop(store);
        state
            .jwt
            .issue(user.user_id, Role::Admin)
            .expect("Issue admin token")
    }

    /// Sends a JSON request through the router and returns the response.
    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request: Request<Body> = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    /// Reads a response body as JSON.
    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Creates a category and a hoodie product through the admin endpoints.
    async fn seed_catalog(app: &Router, token: &str) -> Value {
        let response = send(
            app,
            "POST",
            "/api/admin/categories",
            Some(token),
            Some(json!({"name": "Outerwear", "slug": "outerwear"})),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::CREATED);
        let category: Value = body_json(response).await;

        let response = send(
            app,
            "POST",
            "/api/admin/products",
            Some(token),
            Some(json!({
                "title": "Fleece Hoodie",
                "slug": "fleece-hoodie",
                "description": "Heavyweight fleece.",
                "price": 59.0,
                "compare_at_price": 79.0,
                "category_id": category["category_id"],
                "images": ["https://img.example.com/hoodie.jpg"],
                "variants": [
                    {"size": "M", "stock": 5},
                    {"size": "L", "stock": 2}
                ],
                "tags": ["fleece"],
                "is_featured": true
            })),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::CREATED);
        body_json(response).await
    }

    /// Registers a customer and returns their bearer token.
    async fn customer_token(app: &Router) -> String {
        let response = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Avery Quinn",
                "email": "avery@example.com",
                "password": "hunter22"
            })),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::CREATED);
        let body: Value = body_json(response).await;
        body["token"].as_str().unwrap().to_string()
    }

    /// Builds a checkout payload for the seeded hoodie.
    fn checkout_body(product: &Value, size: &str, qty: u32) -> Value {
        json!({
            "items": [{
                "product_id": product["product_id"],
                "size": size,
                "qty": qty,
                "price": product["price"]
            }],
            "shipping_address": {
                "full_name": "Avery Quinn",
                "phone": "5551234567",
                "address": "12 Hem Street",
                "city": "Portland",
                "country": "USA"
            }
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app: Router = build_router(create_test_app_state());

        let response = send(&app, "GET", "/health", None, None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let body: Value = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_and_me_round_trip() {
        let app: Router = build_router(create_test_app_state());

        let token: String = customer_token(&app).await;

        let response = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body["email"], "avery@example.com");
        assert_eq!(body["role"], "customer");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_register_short_password_is_bad_request() {
        let app: Router = build_router(create_test_app_state());

        let response = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Avery Quinn",
                "email": "avery@example.com",
                "password": "abc12"
            })),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_management_requires_admin() {
        let app: Router = build_router(create_test_app_state());

        let body: Value = json!({"name": "Outerwear", "slug": "outerwear"});

        // No token at all.
        let response = send(&app, "POST", "/api/admin/categories", None, Some(body.clone())).await;
        assert_eq!(response.status(), HttpStatusCode::UNAUTHORIZED);

        // Customer token.
        let token: String = customer_token(&app).await;
        let response = send(
            &app,
            "POST",
            "/api/admin/categories",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_storefront_listing_and_detail() {
        let state: AppState = create_test_app_state();
        let app: Router = build_router(state.clone());
        let token: String = admin_token(&state).await;
        seed_catalog(&app, &token).await;

        let response = send(&app, "GET", "/api/products?tag=fleece", None, None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["slug"], "fleece-hoodie");

        let response = send(&app, "GET", "/api/products/fleece-hoodie", None, None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        let response = send(&app, "GET", "/api/products/no-such-slug", None, None).await;
        assert_eq!(response.status(), HttpStatusCode::NOT_FOUND);

        let response = send(&app, "GET", "/api/products/featured", None, None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_created_and_out_of_stock() {
        let state: AppState = create_test_app_state();
        let app: Router = build_router(state.clone());
        let admin: String = admin_token(&state).await;
        let product: Value = seed_catalog(&app, &admin).await;
        let customer: String = customer_token(&app).await;

        let response = send(
            &app,
            "POST",
            "/api/orders",
            Some(&customer),
            Some(checkout_body(&product, "M", 2)),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::CREATED);
        let order: Value = body_json(response).await;
        assert_eq!(order["status"], "PLACED");
        assert_eq!(order["total"], 118.0);

        // L only has 2 in stock.
        let response = send(
            &app,
            "POST",
            "/api/orders",
            Some(&customer),
            Some(checkout_body(&product, "L", 3)),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
        let body: Value = body_json(response).await;
        assert_eq!(body["message"], "Out of stock: Fleece Hoodie");
    }

    #[tokio::test]
    async fn test_order_listing_and_detail_visibility() {
        let state: AppState = create_test_app_state();
        let app: Router = build_router(state.clone());
        let admin: String = admin_token(&state).await;
        let product: Value = seed_catalog(&app, &admin).await;
        let customer: String = customer_token(&app).await;

        let response = send(
            &app,
            "POST",
            "/api/orders",
            Some(&customer),
            Some(checkout_body(&product, "M", 1)),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::CREATED);
        let order: Value = body_json(response).await;
        let order_id: i64 = order["order_id"].as_i64().unwrap();

        let response = send(&app, "GET", "/api/orders", Some(&customer), None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body["total"], 1);

        let uri: String = format!("/api/orders/{order_id}");
        let response = send(&app, "GET", &uri, Some(&customer), None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);

        // Admin sees every order with owner identity.
        let response = send(&app, "GET", "/api/admin/orders", Some(&admin), None).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body["items"][0]["customer_email"], "avery@example.com");
    }

    #[tokio::test]
    async fn test_status_advance_endpoint() {
        let state: AppState = create_test_app_state();
        let app: Router = build_router(state.clone());
        let admin: String = admin_token(&state).await;
        let product: Value = seed_catalog(&app, &admin).await;
        let customer: String = customer_token(&app).await;

        let response = send(
            &app,
            "POST",
            "/api/orders",
            Some(&customer),
            Some(checkout_body(&product, "M", 1)),
        )
        .await;
        let order: Value = body_json(response).await;
        let uri: String = format!("/api/admin/orders/{}/status", order["order_id"]);

        // Skipping PACKED is rejected.
        let response = send(&app, "PUT", &uri, Some(&admin), Some(json!({"status": "SHIPPED"}))).await;
        assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);

        let response = send(&app, "PUT", &uri, Some(&admin), Some(json!({"status": "PACKED"}))).await;
        assert_eq!(response.status(), HttpStatusCode::OK);
        let body: Value = body_json(response).await;
        assert_eq!(body["status"], "PACKED");

        // Customers cannot advance status.
        let response = send(
            &app,
            "PUT",
            &uri,
            Some(&customer),
            Some(json!({"status": "SHIPPED"})),
        )
        .await;
        assert_eq!(response.status(), HttpStatusCode::FORBIDDEN);
    }
}
