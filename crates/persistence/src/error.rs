// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A database error occurred.
    DatabaseError(String),
    /// Database connection failed.
    DatabaseConnectionFailed(String),
    /// Schema initialization failed.
    InitializationError(String),
    /// Serialization/deserialization of a stored JSON column failed.
    SerializationError(String),
    /// Stored data could not be reconstructed into valid domain values.
    ReconstructionError(String),
    /// A slug is already taken.
    DuplicateSlug {
        /// The conflicting slug.
        slug: String,
    },
    /// An email address is already registered.
    DuplicateEmail {
        /// The conflicting email address.
        email: String,
    },
    /// A conditional stock decrement found insufficient stock at commit time.
    StockConflict {
        /// The product whose variant could not cover the decrement.
        product_id: i64,
        /// The variant size.
        size: String,
    },
    /// The requested resource was not found.
    NotFound(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::DatabaseConnectionFailed(msg) => {
                write!(f, "Database connection failed: {msg}")
            }
            Self::InitializationError(msg) => write!(f, "Initialization error: {msg}"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::ReconstructionError(msg) => write!(f, "State reconstruction error: {msg}"),
            Self::DuplicateSlug { slug } => write!(f, "Slug already exists: '{slug}'"),
            Self::DuplicateEmail { email } => {
                write!(f, "Email already registered: '{email}'")
            }
            Self::StockConflict { product_id, size } => write!(
                f,
                "Insufficient stock for product {product_id}, size '{size}' at commit time"
            ),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound("Record not found".to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
