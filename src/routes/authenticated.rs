use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// JSON API mutations that require `Authorization: Bearer <token>`.
///
/// The `auth_middleware` layer rejects anonymous requests with 401 before any
/// handler runs; each handler then takes `AuthUser` again to get the identity
/// it attributes the change to.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/acronyms
        // Creates an acronym owned by the token's user.
        .route("/api/acronyms", post(handlers::create_acronym))
        // PUT/DELETE /api/acronyms/{id}
        // Update transfers ownership to the caller. Delete has no ownership check.
        .route(
            "/api/acronyms/{id}",
            put(handlers::update_acronym).delete(handlers::delete_acronym),
        )
        // POST /api/users
        // Only an existing user can register another one.
        .route("/api/users", post(handlers::create_user))
        .route("/api/categories", post(handlers::create_category))
}
