use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable by anonymous callers. Only the login transitions live
/// here; none of them touch the record store.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /login renders the form, POST /login runs the credential check.
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        // GET /logout
        // Clears the session flag and redirects to /login.
        .route("/logout", get(handlers::logout))
}
