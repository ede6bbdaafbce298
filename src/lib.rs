use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Session gate, session storage and the generic record store.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod templates;

// Module for routing segregation (Public, Admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use auth::{AdminCredentials, AuthError, LoginForm, SessionGate};
pub use config::AppConfig;
pub use models::{Registry, RecordType};
pub use repository::{MemoryRecordStore, PostgresRecordStore, RecordStore, RepositoryState};
pub use session::{CookieSession, MemorySession, Session};

/// AppState
///
/// The single immutable container shared by every request: the record store, the
/// explicit record type registry, the session gate and the cookie signing key.
/// Per-caller state lives only in the caller's signed session cookie.
#[derive(Clone)]
pub struct AppState {
    /// Store behind the admin screens (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Record types bound to the admin surface.
    pub registry: Arc<Registry>,
    /// Login/logout transitions and the configured admin identity.
    pub gate: Arc<SessionGate>,
    /// Key used to sign and verify the session cookie.
    pub cookie_key: Key,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Assembles the state from the configuration, binding the default Lawly registry.
    pub fn new(config: AppConfig, repo: RepositoryState) -> Self {
        Self::with_registry(config, repo, Registry::lawly())
    }

    pub fn with_registry(config: AppConfig, repo: RepositoryState, registry: Registry) -> Self {
        Self {
            repo,
            registry: Arc::new(registry),
            gate: Arc::new(SessionGate::from_config(&config)),
            cookie_key: session::signing_key(&config.secret_key),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These let handlers and extractors pull single components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for Arc<SessionGate> {
    fn from_ref(app_state: &AppState) -> Arc<SessionGate> {
        app_state.gate.clone()
    }
}

// Required by the `SignedCookieJar` extractor.
impl FromRef<AppState> for Key {
    fn from_ref(app_state: &AppState) -> Key {
        app_state.cookie_key.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing table, installs the session gate in front of everything
/// under `/admin`, and wraps the result in the observability layers.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(admin::admin_routes())
        .fallback(handlers::not_found)
        // The gate is a plain `layer`, not a `route_layer`, so it also covers the
        // fallback: an unrouted /admin URL redirects anonymous callers too.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ))
        .with_state(state);

    // Observability and Correlation Layers (Applied outermost/first)
    base_router.layer(
        ServiceBuilder::new()
            // Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                MakeRequestUuid,
            ))
            // Request Tracing: one span per request, tagged with the request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id` header so
/// every log line of one request is correlated.
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
