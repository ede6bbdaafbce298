//! Router Module Index
//!
//! Splits the routing table by access level. The admin gate itself is a
//! router-wide middleware (`auth::require_login`) keyed on the `/admin` prefix, so
//! an admin route cannot be added without it.

/// Login entry point; unauthenticated admin requests are redirected here.
pub const LOGIN_PATH: &str = "/login";

/// Root of the admin surface; successful logins are redirected here.
pub const ADMIN_ROOT: &str = "/admin";

/// Routes reachable without a session: health check, login and logout.
pub mod public;

/// The generated CRUD screens under `/admin`.
pub mod admin;
