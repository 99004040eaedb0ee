use crate::{AppState, website};
use axum::{
    Router,
    routing::{get, post},
};

/// Public pages: browsing plus the login/logout pair.
pub fn web_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(website::index))
        .route("/acronyms/{id}", get(website::acronym_page))
        .route("/users", get(website::all_users_page))
        .route("/users/{id}", get(website::user_page))
        .route("/categories", get(website::all_categories_page))
        .route("/categories/{id}", get(website::category_page))
        .route("/login", get(website::login_page).post(website::login_post))
        .route("/logout", post(website::logout))
}

/// Session-gated pages.
///
/// Wrapped in `session_middleware`, which redirects anonymous browsers to
/// `/login` instead of returning a 401.
pub fn protected_web_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/acronyms/create",
            get(website::create_acronym_page).post(website::create_acronym_post),
        )
        .route(
            "/acronyms/{id}/edit",
            get(website::edit_acronym_page).post(website::edit_acronym_post),
        )
        .route("/acronyms/{id}/delete", post(website::delete_acronym_post))
}
