use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Entity store and the rules around it.
pub mod error;
pub mod memory;
pub mod models;
pub mod relations;
pub mod repository;

// Identity: credentials, tokens, browser sessions.
pub mod auth;
pub mod password;
pub mod session;

// Query/command surface and the two HTTP faces over it.
pub mod config;
pub mod glossary;
pub mod handlers;
pub mod views;
pub mod website;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public, web};
use session::SessionUser;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, StoreError};
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use session::SessionStore;
pub use views::{PlainHtmlRenderer, ViewState};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
/// The web pages are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_acronyms, handlers::get_acronym, handlers::search_acronyms,
        handlers::get_acronym_creator, handlers::get_acronym_categories,
        handlers::add_acronym_category, handlers::create_acronym, handlers::update_acronym,
        handlers::delete_acronym, handlers::get_users, handlers::get_user,
        handlers::get_user_acronyms, handlers::create_user, handlers::login,
        handlers::get_categories, handlers::get_category, handlers::get_category_acronyms,
        handlers::create_category
    ),
    components(
        schemas(
            models::Acronym, models::Category, models::AcronymCategoryPivot, models::PublicUser,
            models::Token, models::AcronymInput, models::CategoryInput,
            models::CreateUserRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "til-glossary", description = "Acronym glossary API")
    )
)]
struct ApiDoc;

/// Registers the `bearer` scheme referenced by the token routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// AppState
///
/// The single shared container handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Entity store, Postgres or in-memory.
    pub repo: RepositoryState,
    /// Server-side browser sessions.
    pub sessions: SessionStore,
    /// Page renderer for the web surface.
    pub views: ViewState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> SessionStore {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for ViewState {
    fn from_ref(app_state: &AppState) -> ViewState {
        app_state.views.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gate for the token routes. Extracting `AuthUser` validates the bearer
/// token; on failure the extractor rejects with 401 and the handler never
/// runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// session_middleware
///
/// Gate for the session-only pages. A missing or stale session turns into a
/// redirect to `/login`.
async fn session_middleware(_session_user: SessionUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the JSON API, the web pages and the Swagger UI, then wraps the
/// whole thing in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(web::web_routes())
        .merge(
            web::protected_web_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            )),
        )
        .with_state(state);

    // Observability layers, outermost first: assign an id, trace under it,
    // echo it back to the client.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id`, so all
/// log lines of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
