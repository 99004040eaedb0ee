//! Relationship resolution over the entity store.
//!
//! Each function takes the entity and an explicit store handle and issues its
//! own queries. Nothing is cached: callers that need several relationships
//! call several functions.

use crate::error::StoreError;
use crate::models::{Acronym, AcronymCategoryPivot, Category, User};
use crate::repository::Repository;

/// The user referenced by `acronym.creator_id`.
///
/// Users can be deleted without touching their acronyms, so a dangling
/// reference is reported as `NotFound` for the user.
pub async fn creator_of(store: &dyn Repository, acronym: &Acronym) -> Result<User, StoreError> {
    store.get_user(acronym.creator_id).await
}

/// Categories the acronym is tagged with. Duplicate pivots collapse to one entry.
pub async fn categories_of(
    store: &dyn Repository,
    acronym: &Acronym,
) -> Result<Vec<Category>, StoreError> {
    store.get_categories_for_acronym(acronym.id).await
}

/// Acronyms tagged with the category.
pub async fn acronyms_in(
    store: &dyn Repository,
    category: &Category,
) -> Result<Vec<Acronym>, StoreError> {
    store.get_acronyms_for_category(category.id).await
}

/// Acronyms whose `creator_id` is the user.
pub async fn acronyms_created_by(
    store: &dyn Repository,
    user: &User,
) -> Result<Vec<Acronym>, StoreError> {
    store.get_acronyms_by_creator(user.id).await
}

/// Attach a category to an acronym. Every call adds a new pivot row, even for
/// a pair that is already linked.
pub async fn tag(
    store: &dyn Repository,
    acronym: &Acronym,
    category: &Category,
) -> Result<AcronymCategoryPivot, StoreError> {
    store.create_pivot(acronym.id, category.id).await
}
