use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

// --- Core Entities (Mapped to Database) ---

/// User
///
/// The stored identity record from the `users` table, including the password
/// credential. Deliberately not `Serialize`: anything leaving the process goes
/// through [`PublicUser`].
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    // Login name, unique across all users.
    pub username: String,
    // Argon2 PHC string.
    pub password_hash: String,
}

/// PublicUser
///
/// The wire projection of [`User`]. It has no credential field at all, so a
/// response can never leak one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            name: user.name,
            username: user.username,
        }
    }
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Acronym
///
/// An owned content record from the `acronyms` table. `creator_id` must name
/// an existing user at write time; after a user is deleted it may dangle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Acronym {
    pub id: i64,
    pub short: String,
    pub long: String,
    #[serde(rename = "creatorID")]
    pub creator_id: Uuid,
}

/// Category
///
/// A tag record from the `categories` table. Names are not unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// AcronymCategoryPivot
///
/// One row of the many-to-many association between acronyms and categories.
/// Nothing prevents two rows with the same pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct AcronymCategoryPivot {
    pub id: Uuid,
    #[serde(rename = "acronymID")]
    pub acronym_id: i64,
    #[serde(rename = "categoryID")]
    pub category_id: i64,
}

/// Token
///
/// An API bearer credential owned by one user. `value` is the opaque string
/// the client presents; `id` is embedded in it as the JWT `jti`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Token {
    pub id: Uuid,
    pub value: String,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "expiresAt")]
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

// --- Insert Payloads (Store Input) ---

/// Fields of a user to be created or replaced. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password_hash: String,
}

/// Fields of an acronym to be created or replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAcronym {
    pub short: String,
    pub long: String,
    pub creator_id: Uuid,
}

// --- Request Payloads (Input Schemas) ---

/// AcronymInput
///
/// Body for `POST /api/acronyms` and `PUT /api/acronyms/{id}`, and the form
/// for the create/edit pages. There is no creator field: attribution always
/// comes from the authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AcronymInput {
    #[schema(example = "OMG")]
    pub short: String,
    #[schema(example = "Oh My God")]
    pub long: String,
}

impl AcronymInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.short.trim().is_empty() {
            return Err(AppError::Validation("short must not be empty".to_string()));
        }
        if self.long.trim().is_empty() {
            return Err(AppError::Validation("long must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Body for `POST /api/categories`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryInput {
    pub name: String,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// CreateUserRequest
///
/// Body for `POST /api/users`. The password is hashed before it reaches the
/// store and never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.username.trim().is_empty() {
            return Err(AppError::Validation(
                "name and username must not be empty".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password must not be empty".to_string()));
        }
        Ok(())
    }
}

/// SearchQuery
///
/// Query string of `GET /api/acronyms/search`. `term` is optional here so a
/// missing term can be reported as a validation error rather than a rejection.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Exact short or long form to look for.
    pub term: Option<String>,
}
