use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// The generic CRUD screens, one set per registered record type. `{record}` is the
/// registry slug and `{id}` the primary key rendered as text.
///
/// Access Control:
/// Nothing here checks the session. The `require_login` middleware installed in
/// `create_router` redirects every unauthenticated `/admin` request before it is
/// routed.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Index of all registered record types.
        .route("/admin", get(handlers::admin_index))
        .route("/admin/", get(handlers::admin_index))
        // GET /admin/{record}/?page=N
        // Paginated grid.
        .route("/admin/{record}", get(handlers::list_records))
        .route("/admin/{record}/", get(handlers::list_records))
        // GET/POST /admin/{record}/new
        // Create form and submission.
        .route(
            "/admin/{record}/new",
            get(handlers::new_record_form).post(handlers::create_record),
        )
        // GET /admin/{record}/{id}
        // Details view.
        .route("/admin/{record}/{id}", get(handlers::record_details))
        // GET/POST /admin/{record}/{id}/edit
        // Edit form and submission.
        .route(
            "/admin/{record}/{id}/edit",
            get(handlers::edit_record_form).post(handlers::update_record),
        )
        // POST /admin/{record}/{id}/delete
        .route("/admin/{record}/{id}/delete", post(handlers::delete_record))
}
