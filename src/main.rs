use lawly_admin::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRecordStore, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: loads configuration, initializes logging, connects to Postgres and
/// serves the admin console.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lawly_admin=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Admin console starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db.url())
        .await
        .expect("FATAL: Failed to connect to Postgres. Check the db_* settings.");

    let repo = Arc::new(PostgresRecordStore::new(pool)) as RepositoryState;

    // 5. State Assembly and Router
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, repo);
    tracing::info!(
        record_types = app_state.registry.len(),
        "Admin surface bound to record types"
    );
    let app = create_router(app_state);

    // 6. Server Startup
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the listen address. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("Admin console available at http://{}/admin", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
