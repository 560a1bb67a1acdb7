// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! User account mutations.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::info;

use crate::data_models::UserData;
use crate::diesel_schema::users;
use crate::error::PersistenceError;
use crate::queries::accounts::get_user_by_id;

/// Diesel Insertable struct for new user rows.
#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    name: &'a str,
    email: &'a str,
    password_hash: &'a str,
    role: &'a str,
    created_at: &'a str,
}

/// Creates a user account.
///
/// The caller supplies an already-hashed password and a lowercased email.
/// The unique constraint on `email` is the authoritative duplicate check;
/// a violation surfaces as `DuplicateEmail` rather than a raw database
/// error.
///
/// # Errors
///
/// Returns `PersistenceError::DuplicateEmail` if the email is already
/// registered, or another error if the insert fails.
pub fn create_user(
    conn: &mut SqliteConnection,
    name: &str,
    email: &str,
    password_hash: &str,
    role: &str,
    created_at: &str,
) -> Result<UserData, PersistenceError> {
    let record: NewUser<'_> = NewUser {
        name,
        email,
        password_hash,
        role,
        created_at,
    };

    let insert_result: Result<i64, DieselError> = diesel::insert_into(users::table)
        .values(&record)
        .returning(users::user_id)
        .get_result(conn);

    let user_id: i64 = match insert_result {
        Ok(id) => id,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(PersistenceError::DuplicateEmail {
                email: email.to_string(),
            });
        }
        Err(e) => return Err(PersistenceError::from(e)),
    };

    info!(user_id, email, role, "Created user");

    get_user_by_id(conn, user_id)?.ok_or_else(|| {
        PersistenceError::ReconstructionError(format!("User {user_id} vanished after insert"))
    })
}
