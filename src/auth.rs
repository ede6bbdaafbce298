use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::{
    config::AppConfig,
    routes::{ADMIN_ROOT, LOGIN_PATH},
    session::{CookieSession, Session},
};

/// Session key holding the authentication flag.
pub const LOGGED_IN: &str = "logged_in";

/// Message shown on the login form after a credential mismatch.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Неверный логин или пароль";

/// AuthError
///
/// Failures of the login transition. Recovered locally by re-rendering the login
/// form; the `Display` text is what the user sees.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Неверный логин или пароль")]
    InvalidCredentials,
}

/// LoginForm
///
/// The `username`/`password` fields posted by the login page. Both are optional so
/// that a malformed submission is treated as a mismatch instead of a 422.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginForm {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }
}

/// AdminCredentials
///
/// The single privileged identity, fixed at process start.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        // Both comparisons always run so timing does not reveal which field failed.
        let username_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        (username_ok & password_ok).into()
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SessionGate
///
/// Owns the two-state machine guarding the admin surface:
///
/// - `ANONYMOUS --attempt_login(valid)--> AUTHENTICATED`
/// - `ANONYMOUS --attempt_login(invalid)--> ANONYMOUS`
/// - `AUTHENTICATED --logout--> ANONYMOUS`
/// - `AUTHENTICATED --attempt_login(any)--> AUTHENTICATED`
///
/// The state itself lives in the caller's `Session`; the gate only holds the
/// configured credentials.
#[derive(Debug, Clone)]
pub struct SessionGate {
    credentials: AdminCredentials,
}

impl SessionGate {
    pub fn new(credentials: AdminCredentials) -> Self {
        Self { credentials }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(AdminCredentials::new(
            config.admin_username.clone(),
            config.admin_password.clone(),
        ))
    }

    /// check_authenticated
    ///
    /// Pure read of the `logged_in` flag. Anything other than boolean `true` counts
    /// as anonymous.
    pub fn check_authenticated<S: Session + ?Sized>(session: &S) -> bool {
        matches!(session.get(LOGGED_IN), Some(Value::Bool(true)))
    }

    /// attempt_login
    ///
    /// On an exact credential match marks the session authenticated and returns the
    /// redirect to the admin root. On mismatch the session is left exactly as it
    /// was, so an already authenticated caller stays authenticated.
    ///
    /// No attempt counting or lockout is performed.
    pub fn attempt_login<S: Session + ?Sized>(
        &self,
        form: &LoginForm,
        session: &mut S,
    ) -> Result<Redirect, AuthError> {
        let (Some(username), Some(password)) = (&form.username, &form.password) else {
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.matches(username, password) {
            return Err(AuthError::InvalidCredentials);
        }

        session.set(LOGGED_IN, Value::Bool(true));
        Ok(Redirect::to(ADMIN_ROOT))
    }

    /// logout
    ///
    /// Removes the flag unconditionally. Calling it on an anonymous session is a no-op.
    pub fn logout<S: Session + ?Sized>(session: &mut S) {
        session.remove(LOGGED_IN);
    }
}

/// is_admin_path
///
/// True for `/admin` and everything below it. Matching on the raw path keeps
/// unrouted admin URLs behind the gate as well.
pub fn is_admin_path(path: &str) -> bool {
    path == ADMIN_ROOT
        || path
            .strip_prefix(ADMIN_ROOT)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// require_login
///
/// Middleware applied to the whole router. Requests outside the admin surface pass
/// straight through; admin requests from an unauthenticated session are redirected
/// to the login page before any handler (and therefore any store call) runs.
pub async fn require_login(jar: SignedCookieJar, request: Request, next: Next) -> Response {
    if !is_admin_path(request.uri().path()) {
        return next.run(request).await;
    }

    let session = CookieSession::load(&jar);
    if !SessionGate::check_authenticated(&session) {
        tracing::debug!(path = %request.uri().path(), "unauthenticated admin request redirected");
        return Redirect::to(LOGIN_PATH).into_response();
    }

    next.run(request).await
}
