use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use til_glossary::{
    AppState,
    config::{AppConfig, Env},
    create_router, glossary,
    memory::MemoryRepository,
    repository::{PostgresRepository, RepositoryState},
    session::SessionStore,
    views::{PlainHtmlRenderer, ViewState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, opens the entity store, seeds the
/// admin account and serves the router until the process is stopped.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging. RUST_LOG wins over the defaults below.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "til_glossary=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Entity store. Without DATABASE_URL (local only) everything lives in memory.
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let postgres = PostgresRepository::new(pool);
            postgres
                .migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            Arc::new(postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Arc::new(MemoryRepository::new())
        }
    };

    // 4. Seed the admin account so there is always someone to log in as.
    glossary::ensure_admin_user(repo.as_ref(), &config.admin_password)
        .await
        .expect("FATAL: Failed to seed the admin user.");

    // 5. Unified state
    let sessions = SessionStore::new(config.session_ttl_secs);
    let views = Arc::new(PlainHtmlRenderer) as ViewState;
    let bind_addr = config.bind_addr.clone();

    let app_state = AppState {
        repo,
        sessions,
        views,
        config,
    };

    // 6. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
