// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary layer for the Hemline storefront.
//!
//! This crate sits between the HTTP server and the domain/persistence
//! layers. It owns authentication (bcrypt credentials, JWT bearer tokens),
//! role-based authorization, request/response DTOs, and the translation of
//! domain and persistence errors into API errors. Handlers in the server
//! crate call the service functions here and never touch Diesel directly.
//!
//! The checkout path lives in [`place_order`]: a read-only advisory pass
//! over the live catalog (existence, price re-validation, stock preview),
//! then a transactional commit in the persistence layer whose conditional
//! stock decrements are the true admission gate.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use hemline_domain::{
    Category, DomainError, Order, OrderDraft, OrderItem, OrderStatus, Product, ShippingAddress,
    Variant, subtotal, validate_cart, validate_price, validate_shipping_address, validate_slug,
    validate_variants,
};
use hemline_persistence::{
    AdminOrder, CategoryFilter, Page, PageRequest, PersistenceError, ProductDraft, ProductFilter,
    ProductSort, StorePersistence, UserData,
};

mod password_policy;

pub use password_policy::{PasswordPolicy, PasswordPolicyError};

/// Maximum drift allowed between a cart's snapshot price and the live
/// catalog price before checkout is refused.
pub const PRICE_TOLERANCE: f64 = 0.005;

/// How long an issued bearer token stays valid.
const TOKEN_LIFETIME_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Number of products surfaced on the storefront home page.
const FEATURED_LIMIT: u32 = 12;

/// User roles for authorization.
///
/// Customers own their carts and orders; admins additionally manage the
/// catalog and the fulfilment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A storefront customer.
    Customer,
    /// A store operator with catalog and order-management authority.
    Admin,
}

impl Role {
    /// Returns the stored string form of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    /// Parses a stored role string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(Self::Customer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// An authenticated user with an associated role.
///
/// Produced by verifying a bearer token; carried through every service
/// function that needs attribution or authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique identifier for this user.
    pub user_id: i64,
    /// The role assigned to this user.
    pub role: Role,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    #[must_use]
    pub const fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// Authorization failed.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role} role")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// JWT claims carried in a bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The authenticated user's ID.
    sub: i64,
    /// The user's role string.
    role: String,
    /// Issued-at, seconds since the epoch.
    iat: i64,
    /// Expiry, seconds since the epoch.
    exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Creates a token service from a shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a token for a user, valid for seven days.
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails.
    pub fn issue(&self, user_id: i64, role: Role) -> Result<String, ApiError> {
        let now: i64 = OffsetDateTime::now_utc().unix_timestamp();
        let claims: Claims = Claims {
            sub: user_id,
            role: String::from(role.as_str()),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECONDS,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            ApiError::Internal {
                message: format!("Token encoding failed: {e}"),
            }
        })
    }

    /// Verifies a bearer token and returns the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthenticationFailed` if the token is
    /// malformed, expired, carries a bad signature, or names an unknown
    /// role.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AuthError::AuthenticationFailed {
                reason: String::from("Invalid or expired token"),
            })?;

        let role: Role =
            Role::parse(&data.claims.role).ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("Unknown role in token"),
            })?;

        Ok(AuthenticatedUser::new(data.claims.sub, role))
    }
}

/// API-level errors.
///
/// These are distinct from domain and persistence errors and represent the
/// API contract; the server maps each variant onto an HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// Authorization failed - the user does not have permission.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// The requested resource was not found.
    NotFound {
        /// A description of what was not found.
        resource: String,
    },
    /// The request conflicts with existing state.
    Conflict {
        /// A human-readable description of the conflict.
        message: String,
    },
    /// A cart line could not be satisfied from available stock.
    OutOfStock {
        /// The product title, for the customer-facing message.
        title: String,
    },
    /// The live catalog price no longer matches the cart's snapshot.
    PriceChanged {
        /// The product title.
        title: String,
        /// The current catalog price.
        live_price: f64,
    },
    /// An order status transition is not permitted by the lifecycle rules.
    InvalidStatusTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
        /// Why the transition was rejected.
        reason: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the failure.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role} role")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::NotFound { resource } => write!(f, "Not found: {resource}"),
            Self::Conflict { message } => write!(f, "Conflict: {message}"),
            Self::OutOfStock { title } => write!(f, "Out of stock: {title}"),
            Self::PriceChanged { title, live_price } => {
                write!(f, "Price changed for {title}: current price is {live_price}")
            }
            Self::InvalidStatusTransition { from, to, reason } => {
                write!(f, "Invalid status transition {from} -> {to}: {reason}")
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            AuthError::Unauthorized {
                action,
                required_role,
            } => Self::Unauthorized {
                action,
                required_role,
            },
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::DuplicateSlug { slug } => Self::Conflict {
                message: format!("Slug already exists: '{slug}'"),
            },
            PersistenceError::DuplicateEmail { .. } => Self::Conflict {
                message: String::from("Email already registered"),
            },
            PersistenceError::StockConflict { .. } => Self::Conflict {
                message: String::from("Insufficient stock at commit time"),
            },
            PersistenceError::NotFound(msg) => Self::NotFound { resource: msg },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked
/// directly.
fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidTitle(message) => ApiError::InvalidInput {
            field: String::from("title"),
            message,
        },
        DomainError::InvalidSlug(message) => ApiError::InvalidInput {
            field: String::from("slug"),
            message,
        },
        DomainError::InvalidPrice { value } => ApiError::InvalidInput {
            field: String::from("price"),
            message: format!("{value} is not a valid price"),
        },
        DomainError::DuplicateVariantSize { size } => ApiError::InvalidInput {
            field: String::from("variants"),
            message: format!("Duplicate size '{size}'"),
        },
        DomainError::InvalidVariantSize(message) => ApiError::InvalidInput {
            field: String::from("variants"),
            message,
        },
        DomainError::EmptyCart => ApiError::InvalidInput {
            field: String::from("items"),
            message: String::from("Cart must contain at least one item"),
        },
        DomainError::InvalidQuantity { line } => ApiError::InvalidInput {
            field: String::from("items"),
            message: format!("Line {line}: quantity must be at least 1"),
        },
        DomainError::InvalidSnapshotPrice { line, value } => ApiError::InvalidInput {
            field: String::from("items"),
            message: format!("Line {line}: invalid price {value}"),
        },
        DomainError::InvalidAddressField { field, min_length } => ApiError::InvalidInput {
            field: String::from(field),
            message: format!("Must be at least {min_length} characters"),
        },
        DomainError::ProductNotFound { product_id } => ApiError::NotFound {
            resource: format!("Product {product_id}"),
        },
        DomainError::InsufficientStock { title, .. } => ApiError::OutOfStock { title },
        DomainError::PriceChanged {
            title, live_price, ..
        } => ApiError::PriceChanged { title, live_price },
        DomainError::InvalidOrderStatus { status } => ApiError::InvalidInput {
            field: String::from("status"),
            message: format!("'{status}' is not a valid order status"),
        },
        DomainError::InvalidStatusTransition { from, to, reason } => {
            ApiError::InvalidStatusTransition { from, to, reason }
        }
    }
}

/// Authorization service for enforcing role-based access control.
pub struct AuthorizationService;

impl AuthorizationService {
    /// Checks if a user is authorized to manage the catalog.
    ///
    /// Only Admin users may create, edit, or deactivate categories and
    /// products.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not have the Admin role.
    pub fn authorize_manage_catalog(user: &AuthenticatedUser) -> Result<(), AuthError> {
        match user.role {
            Role::Admin => Ok(()),
            Role::Customer => Err(AuthError::Unauthorized {
                action: String::from("manage_catalog"),
                required_role: String::from("Admin"),
            }),
        }
    }

    /// Checks if a user is authorized to list every order in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not have the Admin role.
    pub fn authorize_list_all_orders(user: &AuthenticatedUser) -> Result<(), AuthError> {
        match user.role {
            Role::Admin => Ok(()),
            Role::Customer => Err(AuthError::Unauthorized {
                action: String::from("list_all_orders"),
                required_role: String::from("Admin"),
            }),
        }
    }

    /// Checks if a user is authorized to advance an order's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not have the Admin role.
    pub fn authorize_advance_order_status(user: &AuthenticatedUser) -> Result<(), AuthError> {
        match user.role {
            Role::Admin => Ok(()),
            Role::Customer => Err(AuthError::Unauthorized {
                action: String::from("advance_order_status"),
                required_role: String::from("Admin"),
            }),
        }
    }
}

// ============================================================================
// Request/response DTOs
// ============================================================================

/// API request to register a customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// The customer's display name.
    pub name: String,
    /// The account email. Normalized to lowercase before storage.
    pub email: String,
    /// The plain-text password. Hashed before storage.
    pub password: String,
}

/// API request to log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// The account email.
    pub email: String,
    /// The plain-text password.
    pub password: String,
}

/// A user's public profile. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The unique user identifier.
    pub user_id: i64,
    /// The display name.
    pub name: String,
    /// The account email.
    pub email: String,
    /// The role string ("customer" or "admin").
    pub role: String,
}

impl From<UserData> for UserProfile {
    fn from(data: UserData) -> Self {
        Self {
            user_id: data.user_id,
            name: data.name,
            email: data.email,
            role: data.role,
        }
    }
}

/// API response for a successful registration or login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The issued bearer token.
    pub token: String,
    /// The authenticated user's profile.
    pub user: UserProfile,
}

/// API request to create or update a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRequest {
    /// The display name.
    pub name: String,
    /// The unique slug.
    pub slug: String,
}

/// One size with its stock count, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPayload {
    /// The size label.
    pub size: String,
    /// Units in stock.
    pub stock: u32,
}

/// API request to create or update a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRequest {
    /// The display title.
    pub title: String,
    /// The unique slug.
    pub slug: String,
    /// The long-form description.
    #[serde(default)]
    pub description: String,
    /// The current price.
    pub price: f64,
    /// The strike-through comparison price. Zero when unset.
    #[serde(default)]
    pub compare_at_price: f64,
    /// The owning category.
    pub category_id: i64,
    /// Image URLs, in display order.
    #[serde(default)]
    pub images: Vec<String>,
    /// Size variants, in display order.
    pub variants: Vec<VariantPayload>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the product is surfaced on the home page.
    #[serde(default)]
    pub is_featured: bool,
}

/// API request to flip a category or product's active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetActiveRequest {
    /// The desired active state.
    pub is_active: bool,
}

/// One cart line as submitted at checkout.
///
/// `price` is the unit price the customer saw at add-to-cart time; it is
/// re-validated against the live catalog before the order commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product being ordered.
    pub product_id: i64,
    /// The size ordered.
    pub size: String,
    /// Units ordered.
    pub qty: u32,
    /// The unit price the customer saw.
    pub price: f64,
}

/// API request to place an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// The cart lines, in cart order.
    pub items: Vec<CartLine>,
    /// The shipping address.
    pub shipping_address: ShippingAddress,
}

/// API request to advance an order's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    /// The target status string (e.g. "PACKED").
    pub status: String,
}

/// An order joined with its owner's identity, for the admin view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminOrderView {
    /// The order record.
    pub order: Order,
    /// The owning customer's display name.
    pub customer_name: String,
    /// The owning customer's email.
    pub customer_email: String,
}

impl From<AdminOrder> for AdminOrderView {
    fn from(record: AdminOrder) -> Self {
        Self {
            order: record.order,
            customer_name: record.owner_name,
            customer_email: record.owner_email,
        }
    }
}

/// A page of results, the shape every listing endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total items matching the filter, across all pages.
    pub total: i64,
    /// The 1-based page number served.
    pub page: u32,
    /// Total number of pages.
    pub pages: u32,
}

impl<T> PagedResponse<T> {
    fn from_page<U, F>(page: Page<U>, convert: F) -> Self
    where
        F: Fn(U) -> T,
    {
        Self {
            items: page.items.into_iter().map(convert).collect(),
            total: page.total,
            page: page.page,
            pages: page.pages,
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Normalizes an email for storage and lookup.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a customer account and issues a bearer token.
///
/// The email is normalized to lowercase and must be unique; the password
/// is checked against the policy and stored as a bcrypt hash.
///
/// # Errors
///
/// Returns an error if a field fails validation, the email is already
/// registered, or hashing fails.
pub fn register(
    store: &mut StorePersistence,
    jwt: &JwtService,
    request: RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    let name: &str = request.name.trim();
    if name.chars().count() < 2 {
        return Err(ApiError::InvalidInput {
            field: String::from("name"),
            message: String::from("Must be at least 2 characters"),
        });
    }

    let email: String = normalize_email(&request.email);
    if !email.contains('@') || email.chars().count() < 3 {
        return Err(ApiError::InvalidInput {
            field: String::from("email"),
            message: String::from("Not a valid email address"),
        });
    }

    PasswordPolicy::default()
        .validate(&request.password, &email)
        .map_err(|e| ApiError::InvalidInput {
            field: String::from("password"),
            message: e.to_string(),
        })?;

    let password_hash: String =
        bcrypt::hash(&request.password, bcrypt::DEFAULT_COST).map_err(|e| ApiError::Internal {
            message: format!("Password hashing failed: {e}"),
        })?;

    let user: UserData =
        store.create_user(name, &email, &password_hash, Role::Customer.as_str())?;
    let token: String = jwt.issue(user.user_id, Role::Customer)?;

    info!(user_id = user.user_id, "Registered customer account");

    Ok(AuthResponse {
        token,
        user: UserProfile::from(user),
    })
}

/// Authenticates a customer or admin and issues a bearer token.
///
/// Unknown emails and wrong passwords fail with the same message, so the
/// response does not reveal which accounts exist.
///
/// # Errors
///
/// Returns `ApiError::AuthenticationFailed` on bad credentials, or
/// another error if the store or hasher fails.
pub fn login(
    store: &mut StorePersistence,
    jwt: &JwtService,
    request: LoginRequest,
) -> Result<AuthResponse, ApiError> {
    let email: String = normalize_email(&request.email);

    let Some(user) = store.get_user_by_email(&email)? else {
        warn!(email = %email, "Login attempt for unknown email");
        return Err(ApiError::AuthenticationFailed {
            reason: String::from("Invalid email or password"),
        });
    };

    let verified: bool =
        bcrypt::verify(&request.password, &user.password_hash).map_err(|e| ApiError::Internal {
            message: format!("Password verification failed: {e}"),
        })?;
    if !verified {
        warn!(user_id = user.user_id, "Login attempt with wrong password");
        return Err(ApiError::AuthenticationFailed {
            reason: String::from("Invalid email or password"),
        });
    }

    let role: Role = Role::parse(&user.role).ok_or_else(|| ApiError::Internal {
        message: format!("Stored role '{}' is not recognized", user.role),
    })?;
    let token: String = jwt.issue(user.user_id, role)?;

    info!(user_id = user.user_id, "User logged in");

    Ok(AuthResponse {
        token,
        user: UserProfile::from(user),
    })
}

/// Returns the authenticated user's profile.
///
/// # Errors
///
/// Returns `ApiError::NotFound` if the account behind the token no longer
/// exists.
pub fn current_user(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
) -> Result<UserProfile, ApiError> {
    let data: UserData = store.get_user_by_id(user.user_id)?.ok_or_else(|| {
        ApiError::NotFound {
            resource: format!("User {}", user.user_id),
        }
    })?;
    Ok(UserProfile::from(data))
}

// ============================================================================
// Catalog
// ============================================================================

/// Lists categories matching a filter.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn list_categories(
    store: &mut StorePersistence,
    filter: &CategoryFilter,
    page: PageRequest,
) -> Result<PagedResponse<Category>, ApiError> {
    let result: Page<Category> = store.list_categories(filter, page)?;
    Ok(PagedResponse::from_page(result, |c| c))
}

/// Creates a category. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin, a field fails
/// validation, or the slug is taken.
pub fn create_category(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    request: CategoryRequest,
) -> Result<Category, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;

    let name: &str = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("name"),
            message: String::from("Name cannot be empty"),
        });
    }
    validate_slug(&request.slug).map_err(translate_domain_error)?;

    Ok(store.create_category(name, &request.slug)?)
}

/// Updates a category's name and slug. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin, a field fails
/// validation, the category does not exist, or the slug belongs to a
/// different category.
pub fn update_category(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    category_id: i64,
    request: CategoryRequest,
) -> Result<Category, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;

    let name: &str = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("name"),
            message: String::from("Name cannot be empty"),
        });
    }
    validate_slug(&request.slug).map_err(translate_domain_error)?;

    store
        .update_category(category_id, name, &request.slug)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Category {category_id}"),
        })
}

/// Soft-deletes a category. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin or the category does not
/// exist.
pub fn delete_category(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    category_id: i64,
) -> Result<Category, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;

    store
        .set_category_active(category_id, false)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Category {category_id}"),
        })
}

/// Sets a category's active flag, restoring or hiding it. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin or the category does not
/// exist.
pub fn set_category_active(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    category_id: i64,
    request: SetActiveRequest,
) -> Result<Category, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;

    store
        .set_category_active(category_id, request.is_active)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Category {category_id}"),
        })
}

/// Validates a product request and builds the store draft from it.
fn build_product_draft(
    store: &mut StorePersistence,
    request: ProductRequest,
) -> Result<ProductDraft, ApiError> {
    let title: String = request.title.trim().to_string();
    if title.is_empty() {
        return Err(translate_domain_error(DomainError::InvalidTitle(
            String::from("title cannot be empty"),
        )));
    }
    validate_slug(&request.slug).map_err(translate_domain_error)?;
    validate_price(request.price).map_err(translate_domain_error)?;
    validate_price(request.compare_at_price).map_err(translate_domain_error)?;

    if request.variants.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("variants"),
            message: String::from("At least one size is required"),
        });
    }
    let variants: Vec<Variant> = request
        .variants
        .into_iter()
        .map(|v| Variant::new(v.size, v.stock))
        .collect();
    validate_variants(&variants).map_err(translate_domain_error)?;

    if store.get_category_by_id(request.category_id)?.is_none() {
        return Err(ApiError::NotFound {
            resource: format!("Category {}", request.category_id),
        });
    }

    Ok(ProductDraft {
        title,
        slug: request.slug,
        description: request.description,
        price: request.price,
        compare_at_price: request.compare_at_price,
        category_id: request.category_id,
        images: request.images,
        variants,
        tags: request.tags,
        is_featured: request.is_featured,
    })
}

/// Creates a product. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin, a field fails
/// validation, the category does not exist, or the slug is taken.
pub fn create_product(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    request: ProductRequest,
) -> Result<Product, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;
    let draft: ProductDraft = build_product_draft(store, request)?;
    Ok(store.create_product(&draft)?)
}

/// Replaces a product's editable fields and variant set. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin, a field fails
/// validation, the product does not exist, or the slug belongs to a
/// different product.
pub fn update_product(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    product_id: i64,
    request: ProductRequest,
) -> Result<Product, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;
    let draft: ProductDraft = build_product_draft(store, request)?;
    store
        .update_product(product_id, &draft)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Product {product_id}"),
        })
}

/// Soft-deletes a product. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin or the product does not
/// exist.
pub fn delete_product(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    product_id: i64,
) -> Result<Product, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;

    store
        .set_product_active(product_id, false)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Product {product_id}"),
        })
}

/// Sets a product's active flag, restoring or hiding it. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin or the product does not
/// exist.
pub fn set_product_active(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    product_id: i64,
    request: SetActiveRequest,
) -> Result<Product, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;

    store
        .set_product_active(product_id, request.is_active)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Product {product_id}"),
        })
}

/// Lists products matching a filter.
///
/// The caller controls the `active` filter: the public storefront passes
/// `Some(true)`, the admin view passes `None` to include soft-deleted
/// products.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn list_products(
    store: &mut StorePersistence,
    filter: &ProductFilter,
    page: PageRequest,
) -> Result<PagedResponse<Product>, ApiError> {
    let result: Page<Product> = store.list_products(filter, page)?;
    Ok(PagedResponse::from_page(result, |p| p))
}

/// Returns up to twelve featured, active products for the home page.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn featured_products(store: &mut StorePersistence) -> Result<Vec<Product>, ApiError> {
    let filter: ProductFilter = ProductFilter {
        featured: Some(true),
        active: Some(true),
        sort: ProductSort::New,
        ..ProductFilter::default()
    };
    let page: Page<Product> = store.list_products(&filter, PageRequest::new(1, FEATURED_LIMIT))?;
    Ok(page.items)
}

/// Retrieves an active product by slug. Storefront detail view.
///
/// # Errors
///
/// Returns `ApiError::NotFound` if no active product carries the slug.
pub fn product_by_slug(
    store: &mut StorePersistence,
    slug: &str,
) -> Result<Product, ApiError> {
    store
        .get_active_product_by_slug(slug)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Product '{slug}'"),
        })
}

/// Retrieves a product by ID regardless of its active flag. Admin view.
///
/// # Errors
///
/// Returns `ApiError::NotFound` if the product does not exist.
pub fn product_by_id(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    product_id: i64,
) -> Result<Product, ApiError> {
    AuthorizationService::authorize_manage_catalog(user)?;
    store
        .get_product_by_id(product_id)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Product {product_id}"),
        })
}

// ============================================================================
// Orders
// ============================================================================

/// Places an order for the authenticated user.
///
/// Two passes over the cart:
///
/// 1. **Advisory pass** (read-only): every line's product must exist and
///    be active, carry the requested size, show enough stock, and still be
///    priced within [`PRICE_TOLERANCE`] of the price the customer saw.
///    Snapshots (title, live price, primary image) are captured here.
/// 2. **Commit pass** (transactional): the persistence layer conditionally
///    decrements stock per line and inserts the order atomically. A line
///    that lost its stock between the passes aborts the whole order.
///
/// # Errors
///
/// Returns an error if validation fails, a product is missing, stock is
/// insufficient at either pass, or a price moved beyond tolerance.
pub fn place_order(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    request: PlaceOrderRequest,
) -> Result<Order, ApiError> {
    validate_shipping_address(&request.shipping_address).map_err(translate_domain_error)?;
    if request.items.is_empty() {
        return Err(translate_domain_error(DomainError::EmptyCart));
    }

    // Advisory pass: build snapshots from the live catalog.
    let mut items: Vec<OrderItem> = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let product: Product = store
            .get_product_by_id(line.product_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                translate_domain_error(DomainError::ProductNotFound {
                    product_id: line.product_id,
                })
            })?;

        let Some(variant) = product.variant(&line.size) else {
            return Err(ApiError::OutOfStock {
                title: product.title,
            });
        };
        if variant.stock < line.qty {
            return Err(ApiError::OutOfStock {
                title: product.title,
            });
        }

        if (product.price - line.price).abs() > PRICE_TOLERANCE {
            return Err(ApiError::PriceChanged {
                title: product.title,
                live_price: product.price,
            });
        }

        items.push(OrderItem {
            product_id: product.product_id,
            title_snapshot: product.title.clone(),
            price_snapshot: product.price,
            image_snapshot: product.images.first().cloned(),
            size: line.size.clone(),
            qty: line.qty,
        });
    }

    validate_cart(&items).map_err(translate_domain_error)?;

    let items_subtotal: f64 = subtotal(&items);
    let shipping_cost: f64 = 0.0;
    let draft: OrderDraft = OrderDraft {
        user_id: user.user_id,
        items,
        shipping_address: request.shipping_address,
        subtotal: items_subtotal,
        shipping_cost,
        total: items_subtotal + shipping_cost,
    };

    // Commit pass: the conditional decrements inside the transaction are
    // the true gate; the advisory pass above may already be stale.
    let order: Order = match store.commit_order(&draft) {
        Ok(order) => order,
        Err(PersistenceError::StockConflict { product_id, size }) => {
            let title: String = draft
                .items
                .iter()
                .find(|item| item.product_id == product_id && item.size == size)
                .map_or_else(|| format!("Product {product_id}"), |item| {
                    item.title_snapshot.clone()
                });
            return Err(ApiError::OutOfStock { title });
        }
        Err(e) => return Err(ApiError::from(e)),
    };

    info!(
        order_id = order.order_id,
        user_id = user.user_id,
        total = order.total,
        "Order placed"
    );

    Ok(order)
}

/// Lists the authenticated user's orders, newest first.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn my_orders(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    page: PageRequest,
) -> Result<PagedResponse<Order>, ApiError> {
    let result: Page<Order> = store.list_orders_by_user(user.user_id, page)?;
    Ok(PagedResponse::from_page(result, |o| o))
}

/// Retrieves one order.
///
/// Customers see only their own orders; admins see any. A customer asking
/// for someone else's order gets the same not-found answer as for a
/// nonexistent one.
///
/// # Errors
///
/// Returns `ApiError::NotFound` if the order does not exist or is not
/// visible to this user.
pub fn order_detail(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    order_id: i64,
) -> Result<Order, ApiError> {
    let order: Option<Order> = store.get_order_by_id(order_id)?;
    match order {
        Some(order) if order.user_id == user.user_id || user.role == Role::Admin => Ok(order),
        _ => Err(ApiError::NotFound {
            resource: format!("Order {order_id}"),
        }),
    }
}

/// Lists every order with owner identities. Admin only.
///
/// # Errors
///
/// Returns an error if the user is not an admin or the store fails.
pub fn all_orders(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    page: PageRequest,
) -> Result<PagedResponse<AdminOrderView>, ApiError> {
    AuthorizationService::authorize_list_all_orders(user)?;
    let result: Page<AdminOrder> = store.list_all_orders(page)?;
    Ok(PagedResponse::from_page(result, AdminOrderView::from))
}

/// Advances an order's status one step. Admin only.
///
/// The lifecycle is strictly forward and one step at a time: PLACED to
/// PACKED to SHIPPED to DELIVERED. The store update is conditional on the
/// status still being what this function read, so two admins advancing
/// the same order concurrently cannot double-apply a step.
///
/// # Errors
///
/// Returns an error if the user is not an admin, the status string is
/// invalid, the transition is not permitted, the order does not exist, or
/// the status moved concurrently.
pub fn advance_order_status(
    store: &mut StorePersistence,
    user: &AuthenticatedUser,
    order_id: i64,
    request: UpdateOrderStatusRequest,
) -> Result<Order, ApiError> {
    AuthorizationService::authorize_advance_order_status(user)?;

    let target: OrderStatus = request
        .status
        .parse::<OrderStatus>()
        .map_err(translate_domain_error)?;

    let order: Order = store
        .get_order_by_id(order_id)?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("Order {order_id}"),
        })?;

    order
        .status
        .validate_transition(target)
        .map_err(translate_domain_error)?;

    let applied: bool = store.update_order_status(order_id, order.status, target)?;
    if !applied {
        return Err(ApiError::Conflict {
            message: String::from("Order status changed concurrently"),
        });
    }

    info!(
        order_id,
        from = order.status.as_str(),
        to = target.as_str(),
        "Order status advanced"
    );

    store
        .get_order_by_id(order_id)?
        .ok_or_else(|| ApiError::Internal {
            message: format!("Order {order_id} vanished after status update"),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn test_store() -> StorePersistence {
        StorePersistence::new_in_memory().expect("In-memory store")
    }

    fn test_jwt() -> JwtService {
        JwtService::new("test-secret")
    }

    fn register_customer(store: &mut StorePersistence, jwt: &JwtService) -> AuthResponse {
        register(
            store,
            jwt,
            RegisterRequest {
                name: String::from("Avery Quinn"),
                email: String::from("Avery@Example.com"),
                password: String::from("hunter22"),
            },
        )
        .expect("Register customer")
    }

    fn seed_admin(store: &mut StorePersistence) -> AuthenticatedUser {
        let hash: String = bcrypt::hash("adminpass", 4).expect("Hash");
        let data: UserData = store
            .create_user("Store Admin", "admin@example.com", &hash, "admin")
            .expect("Seed admin");
        AuthenticatedUser::new(data.user_id, Role::Admin)
    }

    fn seed_catalog(store: &mut StorePersistence, admin: &AuthenticatedUser) -> Product {
        let category: Category = create_category(
            store,
            admin,
            CategoryRequest {
                name: String::from("Outerwear"),
                slug: String::from("outerwear"),
            },
        )
        .expect("Create category");

        create_product(
            store,
            admin,
            ProductRequest {
                title: String::from("Fleece Hoodie"),
                slug: String::from("fleece-hoodie"),
                description: String::from("Heavyweight fleece."),
                price: 59.0,
                compare_at_price: 79.0,
                category_id: category.category_id,
                images: vec![String::from("https://img.example.com/hoodie.jpg")],
                variants: vec![
                    VariantPayload {
                        size: String::from("M"),
                        stock: 5,
                    },
                    VariantPayload {
                        size: String::from("L"),
                        stock: 2,
                    },
                ],
                tags: vec![String::from("fleece")],
                is_featured: true,
            },
        )
        .expect("Create product")
    }

    fn checkout_request(product: &Product, size: &str, qty: u32) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items: vec![CartLine {
                product_id: product.product_id,
                size: size.to_string(),
                qty,
                price: product.price,
            }],
            shipping_address: ShippingAddress {
                full_name: String::from("Avery Quinn"),
                phone: String::from("5551234567"),
                address: String::from("12 Hem Street"),
                city: String::from("Portland"),
                country: String::from("USA"),
            },
        }
    }

    #[test]
    fn test_register_normalizes_email_and_issues_token() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();

        let response: AuthResponse = register_customer(&mut store, &jwt);
        assert_eq!(response.user.email, "avery@example.com");
        assert_eq!(response.user.role, "customer");

        let verified: AuthenticatedUser = jwt.verify(&response.token).expect("Verify token");
        assert_eq!(verified.user_id, response.user.user_id);
        assert_eq!(verified.role, Role::Customer);
    }

    #[test]
    fn test_register_rejects_short_password() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();

        let error: ApiError = register(
            &mut store,
            &jwt,
            RegisterRequest {
                name: String::from("Avery Quinn"),
                email: String::from("avery@example.com"),
                password: String::from("abc12"),
            },
        )
        .expect_err("Short password must be rejected");

        assert!(matches!(error, ApiError::InvalidInput { field, .. } if field == "password"));
    }

    #[test]
    fn test_register_duplicate_email_conflicts() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();
        register_customer(&mut store, &jwt);

        let error: ApiError = register(
            &mut store,
            &jwt,
            RegisterRequest {
                name: String::from("Other Avery"),
                email: String::from("AVERY@example.com"),
                password: String::from("different1"),
            },
        )
        .expect_err("Duplicate email must conflict");

        assert!(matches!(error, ApiError::Conflict { .. }));
    }

    #[test]
    fn test_login_round_trip_and_bad_credentials() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();
        register_customer(&mut store, &jwt);

        let response: AuthResponse = login(
            &mut store,
            &jwt,
            LoginRequest {
                email: String::from("avery@example.com"),
                password: String::from("hunter22"),
            },
        )
        .expect("Login");
        assert_eq!(response.user.name, "Avery Quinn");

        let error: ApiError = login(
            &mut store,
            &jwt,
            LoginRequest {
                email: String::from("avery@example.com"),
                password: String::from("wrongpass"),
            },
        )
        .expect_err("Wrong password must fail");
        assert!(matches!(error, ApiError::AuthenticationFailed { .. }));

        let error: ApiError = login(
            &mut store,
            &jwt,
            LoginRequest {
                email: String::from("ghost@example.com"),
                password: String::from("whatever1"),
            },
        )
        .expect_err("Unknown email must fail");
        assert!(matches!(error, ApiError::AuthenticationFailed { .. }));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let jwt: JwtService = test_jwt();
        let token: String = jwt.issue(7, Role::Customer).expect("Issue token");

        let mut tampered: String = token;
        tampered.push('x');
        assert!(jwt.verify(&tampered).is_err());

        let other: JwtService = JwtService::new("other-secret");
        let foreign: String = other.issue(7, Role::Admin).expect("Issue token");
        assert!(jwt.verify(&foreign).is_err());
    }

    #[test]
    fn test_customer_cannot_manage_catalog() {
        let mut store: StorePersistence = test_store();
        let customer: AuthenticatedUser = AuthenticatedUser::new(1, Role::Customer);

        let error: ApiError = create_category(
            &mut store,
            &customer,
            CategoryRequest {
                name: String::from("Outerwear"),
                slug: String::from("outerwear"),
            },
        )
        .expect_err("Customer must not manage catalog");

        assert!(matches!(error, ApiError::Unauthorized { .. }));
    }

    #[test]
    fn test_create_product_validates_slug_and_category() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);

        let request = ProductRequest {
            title: String::from("Fleece Hoodie"),
            slug: String::from("Bad Slug!"),
            description: String::new(),
            price: 59.0,
            compare_at_price: 0.0,
            category_id: 1,
            images: vec![],
            variants: vec![VariantPayload {
                size: String::from("M"),
                stock: 1,
            }],
            tags: vec![],
            is_featured: false,
        };
        let error: ApiError = create_product(&mut store, &admin, request.clone())
            .expect_err("Bad slug must be rejected");
        assert!(matches!(error, ApiError::InvalidInput { field, .. } if field == "slug"));

        let request = ProductRequest {
            slug: String::from("fleece-hoodie"),
            category_id: 404,
            ..request
        };
        let error: ApiError =
            create_product(&mut store, &admin, request).expect_err("Missing category");
        assert!(matches!(error, ApiError::NotFound { .. }));
    }

    #[test]
    fn test_product_slug_conflict() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);

        let error: ApiError = create_product(
            &mut store,
            &admin,
            ProductRequest {
                title: String::from("Another Hoodie"),
                slug: String::from("fleece-hoodie"),
                description: String::new(),
                price: 10.0,
                compare_at_price: 0.0,
                category_id: product.category_id,
                images: vec![],
                variants: vec![VariantPayload {
                    size: String::from("M"),
                    stock: 1,
                }],
                tags: vec![],
                is_featured: false,
            },
        )
        .expect_err("Duplicate slug must conflict");
        assert!(matches!(error, ApiError::Conflict { .. }));
    }

    #[test]
    fn test_storefront_hides_soft_deleted_products() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);

        assert!(product_by_slug(&mut store, "fleece-hoodie").is_ok());

        delete_product(&mut store, &admin, product.product_id).expect("Soft delete");

        let error: ApiError =
            product_by_slug(&mut store, "fleece-hoodie").expect_err("Hidden after delete");
        assert!(matches!(error, ApiError::NotFound { .. }));

        // Admin ID lookup still sees it.
        let fetched: Product =
            product_by_id(&mut store, &admin, product.product_id).expect("Admin lookup");
        assert!(!fetched.is_active);

        // Restoring the flag brings it back to the storefront.
        let restored: Product = set_product_active(
            &mut store,
            &admin,
            product.product_id,
            SetActiveRequest { is_active: true },
        )
        .expect("Restore");
        assert!(restored.is_active);
        assert!(product_by_slug(&mut store, "fleece-hoodie").is_ok());
    }

    #[test]
    fn test_featured_products_listing() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        seed_catalog(&mut store, &admin);

        let featured: Vec<Product> = featured_products(&mut store).expect("Featured listing");
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].slug, "fleece-hoodie");
    }

    #[test]
    fn test_place_order_happy_path() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let auth: AuthResponse = register_customer(&mut store, &jwt);
        let customer: AuthenticatedUser =
            AuthenticatedUser::new(auth.user.user_id, Role::Customer);

        let order: Order = place_order(&mut store, &customer, checkout_request(&product, "M", 2))
            .expect("Place order");

        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.items[0].title_snapshot, "Fleece Hoodie");
        assert_eq!(order.subtotal, 118.0);
        assert_eq!(order.shipping_cost, 0.0);
        assert_eq!(order.total, 118.0);
    }

    #[test]
    fn test_place_order_out_of_stock_message() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let customer: AuthenticatedUser = AuthenticatedUser::new(99, Role::Customer);

        let error: ApiError = place_order(&mut store, &customer, checkout_request(&product, "L", 3))
            .expect_err("Oversized line must fail");

        assert_eq!(
            error,
            ApiError::OutOfStock {
                title: String::from("Fleece Hoodie"),
            }
        );
        assert_eq!(error.to_string(), "Out of stock: Fleece Hoodie");
    }

    #[test]
    fn test_place_order_rejects_stale_price() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let customer: AuthenticatedUser = AuthenticatedUser::new(99, Role::Customer);

        let mut request: PlaceOrderRequest = checkout_request(&product, "M", 1);
        request.items[0].price = 49.0;

        let error: ApiError =
            place_order(&mut store, &customer, request).expect_err("Stale price must fail");
        assert!(matches!(error, ApiError::PriceChanged { ref title, .. } if title == "Fleece Hoodie"));
    }

    #[test]
    fn test_place_order_tolerates_rounding_drift() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let customer: AuthenticatedUser = AuthenticatedUser::new(99, Role::Customer);

        let mut request: PlaceOrderRequest = checkout_request(&product, "M", 1);
        request.items[0].price = 59.004;

        assert!(place_order(&mut store, &customer, request).is_ok());
    }

    #[test]
    fn test_place_order_validates_address_and_cart() {
        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let customer: AuthenticatedUser = AuthenticatedUser::new(99, Role::Customer);

        let mut request: PlaceOrderRequest = checkout_request(&product, "M", 1);
        request.shipping_address.phone = String::from("555");
        let error: ApiError =
            place_order(&mut store, &customer, request).expect_err("Short phone must fail");
        assert!(matches!(error, ApiError::InvalidInput { field, .. } if field == "phone"));

        let mut request: PlaceOrderRequest = checkout_request(&product, "M", 1);
        request.items.clear();
        let error: ApiError =
            place_order(&mut store, &customer, request).expect_err("Empty cart must fail");
        assert!(matches!(error, ApiError::InvalidInput { field, .. } if field == "items"));

        let mut request: PlaceOrderRequest = checkout_request(&product, "M", 1);
        request.items[0].qty = 0;
        let error: ApiError =
            place_order(&mut store, &customer, request).expect_err("Zero qty must fail");
        assert!(matches!(error, ApiError::InvalidInput { field, .. } if field == "items"));
    }

    #[test]
    fn test_order_visibility() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let auth: AuthResponse = register_customer(&mut store, &jwt);
        let owner: AuthenticatedUser = AuthenticatedUser::new(auth.user.user_id, Role::Customer);
        let stranger: AuthenticatedUser = AuthenticatedUser::new(12345, Role::Customer);

        let order: Order = place_order(&mut store, &owner, checkout_request(&product, "M", 1))
            .expect("Place order");

        assert!(order_detail(&mut store, &owner, order.order_id).is_ok());
        assert!(order_detail(&mut store, &admin, order.order_id).is_ok());
        let error: ApiError = order_detail(&mut store, &stranger, order.order_id)
            .expect_err("Strangers get not-found");
        assert!(matches!(error, ApiError::NotFound { .. }));
    }

    #[test]
    fn test_all_orders_requires_admin() {
        let mut store: StorePersistence = test_store();
        let customer: AuthenticatedUser = AuthenticatedUser::new(1, Role::Customer);

        let error: ApiError = all_orders(&mut store, &customer, PageRequest::default())
            .expect_err("Customer must not list all orders");
        assert!(matches!(error, ApiError::Unauthorized { .. }));
    }

    #[test]
    fn test_status_advances_one_step_only() {
        let mut store: StorePersistence = test_store();
        let jwt: JwtService = test_jwt();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let product: Product = seed_catalog(&mut store, &admin);
        let auth: AuthResponse = register_customer(&mut store, &jwt);
        let owner: AuthenticatedUser = AuthenticatedUser::new(auth.user.user_id, Role::Customer);
        let order: Order = place_order(&mut store, &owner, checkout_request(&product, "M", 1))
            .expect("Place order");

        // Skipping a step is rejected.
        let error: ApiError = advance_order_status(
            &mut store,
            &admin,
            order.order_id,
            UpdateOrderStatusRequest {
                status: String::from("SHIPPED"),
            },
        )
        .expect_err("Skip must be rejected");
        assert!(matches!(error, ApiError::InvalidStatusTransition { .. }));

        // The full forward chain works.
        for status in ["PACKED", "SHIPPED", "DELIVERED"] {
            let updated: Order = advance_order_status(
                &mut store,
                &admin,
                order.order_id,
                UpdateOrderStatusRequest {
                    status: String::from(status),
                },
            )
            .expect("Forward step");
            assert_eq!(updated.status.as_str(), status);
        }

        // DELIVERED is terminal.
        let error: ApiError = advance_order_status(
            &mut store,
            &admin,
            order.order_id,
            UpdateOrderStatusRequest {
                status: String::from("PLACED"),
            },
        )
        .expect_err("Terminal state admits no transitions");
        assert!(matches!(error, ApiError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_status_update_requires_admin_and_valid_status() {
        let mut store: StorePersistence = test_store();
        let customer: AuthenticatedUser = AuthenticatedUser::new(1, Role::Customer);

        let error: ApiError = advance_order_status(
            &mut store,
            &customer,
            1,
            UpdateOrderStatusRequest {
                status: String::from("PACKED"),
            },
        )
        .expect_err("Customer must not advance status");
        assert!(matches!(error, ApiError::Unauthorized { .. }));

        let mut store: StorePersistence = test_store();
        let admin: AuthenticatedUser = seed_admin(&mut store);
        let error: ApiError = advance_order_status(
            &mut store,
            &admin,
            1,
            UpdateOrderStatusRequest {
                status: String::from("CANCELLED"),
            },
        )
        .expect_err("Unknown status string must be rejected");
        assert!(matches!(error, ApiError::InvalidInput { field, .. } if field == "status"));
    }
}
