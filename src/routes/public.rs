use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no credentials. Everything here is a read, except
/// tagging (which the glossary leaves open) and the login that hands out
/// tokens in the first place.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers. Returns "ok".
        .route("/health", get(|| async { "ok" }))
        // --- Acronyms ---
        .route("/api/acronyms", get(handlers::get_acronyms))
        // GET /api/acronyms/search?term=...
        // Exact match on the short or long form. The static segment wins over `{id}`.
        .route("/api/acronyms/search", get(handlers::search_acronyms))
        .route("/api/acronyms/{id}", get(handlers::get_acronym))
        .route("/api/acronyms/{id}/creator", get(handlers::get_acronym_creator))
        .route(
            "/api/acronyms/{id}/categories",
            get(handlers::get_acronym_categories),
        )
        // POST /api/acronyms/{id}/category/{category_id}
        // Links an acronym to a category. No token required.
        .route(
            "/api/acronyms/{id}/category/{category_id}",
            post(handlers::add_acronym_category),
        )
        // --- Users ---
        .route("/api/users", get(handlers::get_users))
        // POST /api/users/login
        // HTTP Basic credentials in, bearer token out.
        .route("/api/users/login", post(handlers::login))
        .route("/api/users/{id}", get(handlers::get_user))
        .route("/api/users/{id}/acronyms", get(handlers::get_user_acronyms))
        // --- Categories ---
        .route("/api/categories", get(handlers::get_categories))
        .route("/api/categories/{id}", get(handlers::get_category))
        .route(
            "/api/categories/{id}/acronyms",
            get(handlers::get_category_acronyms),
        )
}
