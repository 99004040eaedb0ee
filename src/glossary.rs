//! The query/command surface shared by the JSON API and the web pages.
//!
//! Every operation takes the store handle explicitly. Mutations that need an
//! author take an [`Identity`] resolved by authentication and never read one
//! from the request body.

use uuid::Uuid;

use crate::auth::Identity;
use crate::error::{AppError, StoreError};
use crate::models::{
    Acronym, AcronymCategoryPivot, AcronymInput, Category, CategoryInput, CreateUserRequest,
    NewAcronym, NewUser, PublicUser,
};
use crate::password;
use crate::relations;
use crate::repository::Repository;

// --- Acronym Queries ---

pub async fn list_acronyms(store: &dyn Repository) -> Result<Vec<Acronym>, AppError> {
    Ok(store.get_all_acronyms().await?)
}

pub async fn get_acronym(store: &dyn Repository, id: i64) -> Result<Acronym, AppError> {
    Ok(store.get_acronym(id).await?)
}

/// Exact match on the short or the long form; a term that only occurs inside
/// a longer string matches nothing. Only an absent `term` is rejected; an
/// empty one is searched like any other and matches no stored acronym.
pub async fn search_acronyms(
    store: &dyn Repository,
    term: Option<&str>,
) -> Result<Vec<Acronym>, AppError> {
    let term = term.ok_or_else(|| AppError::Validation("Missing search term".to_string()))?;
    Ok(store.search_acronyms(term).await?)
}

// --- Acronym Commands ---

pub async fn create_acronym(
    store: &dyn Repository,
    input: AcronymInput,
    identity: Identity,
) -> Result<Acronym, AppError> {
    input.validate()?;
    let acronym = store
        .create_acronym(NewAcronym {
            short: input.short,
            long: input.long,
            creator_id: identity.user_id(),
        })
        .await?;
    tracing::info!(acronym_id = acronym.id, user_id = %identity.user_id(), "acronym created");
    Ok(acronym)
}

/// Replaces the short and long forms and hands ownership to `identity`,
/// whoever created the acronym originally.
pub async fn update_acronym(
    store: &dyn Repository,
    id: i64,
    input: AcronymInput,
    identity: Identity,
) -> Result<Acronym, AppError> {
    input.validate()?;
    let acronym = store
        .update_acronym(
            id,
            NewAcronym {
                short: input.short,
                long: input.long,
                creator_id: identity.user_id(),
            },
        )
        .await?;
    tracing::info!(acronym_id = id, user_id = %identity.user_id(), "acronym updated");
    Ok(acronym)
}

/// Any authenticated user may delete any acronym; `identity` is only recorded.
pub async fn delete_acronym(
    store: &dyn Repository,
    id: i64,
    identity: Identity,
) -> Result<(), AppError> {
    store.delete_acronym(id).await?;
    tracing::info!(acronym_id = id, user_id = %identity.user_id(), "acronym deleted");
    Ok(())
}

/// Links an acronym to a category. Both must exist; the pair may already be
/// linked, in which case a second pivot row is added.
pub async fn tag_acronym(
    store: &dyn Repository,
    acronym_id: i64,
    category_id: i64,
) -> Result<AcronymCategoryPivot, AppError> {
    let acronym = store.get_acronym(acronym_id).await?;
    let category = store.get_category(category_id).await?;
    let pivot = relations::tag(store, &acronym, &category).await?;
    tracing::info!(acronym_id, category_id, pivot_id = %pivot.id, "acronym tagged");
    Ok(pivot)
}

// --- Relationship Reads ---

pub async fn get_creator_of(store: &dyn Repository, acronym_id: i64) -> Result<PublicUser, AppError> {
    let acronym = store.get_acronym(acronym_id).await?;
    let creator = relations::creator_of(store, &acronym).await?;
    Ok(creator.into())
}

pub async fn get_categories_of(
    store: &dyn Repository,
    acronym_id: i64,
) -> Result<Vec<Category>, AppError> {
    let acronym = store.get_acronym(acronym_id).await?;
    Ok(relations::categories_of(store, &acronym).await?)
}

pub async fn get_acronyms_of_category(
    store: &dyn Repository,
    category_id: i64,
) -> Result<Vec<Acronym>, AppError> {
    let category = store.get_category(category_id).await?;
    Ok(relations::acronyms_in(store, &category).await?)
}

pub async fn get_acronyms_of_user(
    store: &dyn Repository,
    user_id: Uuid,
) -> Result<Vec<Acronym>, AppError> {
    let user = store.get_user(user_id).await?;
    Ok(relations::acronyms_created_by(store, &user).await?)
}

// --- Users ---

pub async fn list_users(store: &dyn Repository) -> Result<Vec<PublicUser>, AppError> {
    let users = store.get_all_users().await?;
    Ok(users.into_iter().map(PublicUser::from).collect())
}

pub async fn get_user(store: &dyn Repository, id: Uuid) -> Result<PublicUser, AppError> {
    Ok(store.get_user(id).await?.into())
}

/// Registers a user on behalf of an already authenticated one.
pub async fn create_user(
    store: &dyn Repository,
    request: CreateUserRequest,
    identity: Identity,
) -> Result<PublicUser, AppError> {
    request.validate()?;
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing aborted: {e}")))??;

    let user = store
        .create_user(NewUser {
            name: request.name,
            username: request.username,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = %user.id, created_by = %identity.user_id(), "user created");
    Ok(user.into())
}

/// ensure_admin_user
///
/// Seeds the `admin` account on first start so there is someone to log in as.
/// An existing `admin` is left untouched.
pub async fn ensure_admin_user(store: &dyn Repository, password: &str) -> Result<(), AppError> {
    match store.get_user_by_username("admin").await {
        Ok(_) => return Ok(()),
        Err(StoreError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let password_hash = password::hash_password(password)?;
    let admin = store
        .create_user(NewUser {
            name: "Admin".to_string(),
            username: "admin".to_string(),
            password_hash,
        })
        .await?;
    tracing::info!(user_id = %admin.id, "seeded admin user");
    Ok(())
}

// --- Categories ---

pub async fn list_categories(store: &dyn Repository) -> Result<Vec<Category>, AppError> {
    Ok(store.get_all_categories().await?)
}

pub async fn get_category(store: &dyn Repository, id: i64) -> Result<Category, AppError> {
    Ok(store.get_category(id).await?)
}

pub async fn create_category(
    store: &dyn Repository,
    input: CategoryInput,
    identity: Identity,
) -> Result<Category, AppError> {
    input.validate()?;
    let category = store.create_category(input.name).await?;
    tracing::info!(category_id = category.id, user_id = %identity.user_id(), "category created");
    Ok(category)
}
