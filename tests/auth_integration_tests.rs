use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};
use lawly_admin::{
    AdminCredentials, AppConfig, AuthError, LoginForm, MemorySession, Session, SessionGate,
    auth::{INVALID_CREDENTIALS_MESSAGE, LOGGED_IN, is_admin_path},
};
use serde_json::Value;

// --- Helper Functions ---

fn default_gate() -> SessionGate {
    SessionGate::from_config(&AppConfig::default())
}

fn authenticated_session(gate: &SessionGate) -> MemorySession {
    let mut session = MemorySession::new();
    gate.attempt_login(&LoginForm::new("admin", "admin"), &mut session)
        .expect("default credentials must log in");
    session
}

// --- check_authenticated ---

#[test]
fn test_fresh_session_is_anonymous() {
    let session = MemorySession::new();
    assert!(!SessionGate::check_authenticated(&session));
}

#[test]
fn test_only_boolean_true_counts_as_authenticated() {
    let mut session = MemorySession::new();

    session.set(LOGGED_IN, Value::Bool(false));
    assert!(!SessionGate::check_authenticated(&session));

    session.set(LOGGED_IN, Value::String("true".to_string()));
    assert!(!SessionGate::check_authenticated(&session));

    session.set(LOGGED_IN, Value::from(1));
    assert!(!SessionGate::check_authenticated(&session));

    session.set(LOGGED_IN, Value::Bool(true));
    assert!(SessionGate::check_authenticated(&session));
}

#[test]
fn test_check_authenticated_has_no_side_effects() {
    let gate = default_gate();
    let session = authenticated_session(&gate);
    let before = session.clone();

    for _ in 0..3 {
        assert!(SessionGate::check_authenticated(&session));
    }
    assert_eq!(session, before);

    let anonymous = MemorySession::new();
    assert!(!SessionGate::check_authenticated(&anonymous));
    assert!(anonymous.is_empty());
}

// --- attempt_login ---

#[test]
fn test_valid_credentials_authenticate_and_redirect_to_admin() {
    let gate = default_gate();
    let mut session = MemorySession::new();

    let redirect = gate
        .attempt_login(&LoginForm::new("admin", "admin"), &mut session)
        .expect("login should succeed");

    assert!(SessionGate::check_authenticated(&session));
    assert_eq!(session.get(LOGGED_IN), Some(&Value::Bool(true)));

    let response = redirect.into_response();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin");
}

#[test]
fn test_invalid_credentials_leave_session_anonymous() {
    let gate = default_gate();

    for (username, password) in [("admin", "wrong"), ("root", "admin"), ("", ""), ("Admin", "admin")] {
        let mut session = MemorySession::new();
        let result = gate.attempt_login(&LoginForm::new(username, password), &mut session);

        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
        assert!(!SessionGate::check_authenticated(&session));
        assert!(session.is_empty(), "failed login must not write to the session");
    }
}

#[test]
fn test_missing_fields_are_a_mismatch() {
    let gate = default_gate();
    let mut session = MemorySession::new();

    let form = LoginForm {
        username: Some("admin".to_string()),
        password: None,
    };
    assert!(gate.attempt_login(&form, &mut session).is_err());
    assert!(gate.attempt_login(&LoginForm::default(), &mut session).is_err());
    assert!(!SessionGate::check_authenticated(&session));
}

#[test]
fn test_failure_message_is_user_facing_text() {
    assert_eq!(
        AuthError::InvalidCredentials.to_string(),
        "Неверный логин или пароль"
    );
    assert_eq!(INVALID_CREDENTIALS_MESSAGE, "Неверный логин или пароль");
}

#[test]
fn test_configured_credentials_replace_defaults() {
    let gate = SessionGate::new(AdminCredentials::new("lawly", "p@ss"));
    let mut session = MemorySession::new();

    assert!(gate
        .attempt_login(&LoginForm::new("admin", "admin"), &mut session)
        .is_err());
    assert!(gate
        .attempt_login(&LoginForm::new("lawly", "p@ss"), &mut session)
        .is_ok());
    assert!(SessionGate::check_authenticated(&session));
}

#[test]
fn test_authenticated_session_survives_any_login_attempt() {
    let gate = default_gate();
    let mut session = authenticated_session(&gate);

    // A bad re-login does not log the caller out.
    assert!(gate
        .attempt_login(&LoginForm::new("admin", "nope"), &mut session)
        .is_err());
    assert!(SessionGate::check_authenticated(&session));

    // A good re-login is allowed.
    assert!(gate
        .attempt_login(&LoginForm::new("admin", "admin"), &mut session)
        .is_ok());
    assert!(SessionGate::check_authenticated(&session));
}

// --- logout ---

#[test]
fn test_logout_returns_to_anonymous() {
    let gate = default_gate();
    let mut session = authenticated_session(&gate);

    SessionGate::logout(&mut session);

    assert!(!SessionGate::check_authenticated(&session));
    assert_eq!(session.get(LOGGED_IN), None);
}

#[test]
fn test_logout_is_idempotent() {
    let gate = default_gate();
    let mut session = authenticated_session(&gate);

    SessionGate::logout(&mut session);
    let after_first = session.clone();
    SessionGate::logout(&mut session);

    assert_eq!(session, after_first);
    assert!(!SessionGate::check_authenticated(&session));

    // Logging out a session that never logged in is a no-op as well.
    let mut anonymous = MemorySession::new();
    SessionGate::logout(&mut anonymous);
    assert!(anonymous.is_empty());
}

#[test]
fn test_logout_keeps_unrelated_session_keys() {
    let gate = default_gate();
    let mut session = authenticated_session(&gate);
    session.set("locale", Value::String("ru".to_string()));

    SessionGate::logout(&mut session);

    assert_eq!(session.get("locale"), Some(&Value::String("ru".to_string())));
}

#[test]
fn test_full_cycle_can_repeat() {
    let gate = default_gate();
    let mut session = MemorySession::new();

    for _ in 0..3 {
        assert!(gate
            .attempt_login(&LoginForm::new("admin", "admin"), &mut session)
            .is_ok());
        assert!(SessionGate::check_authenticated(&session));
        SessionGate::logout(&mut session);
        assert!(!SessionGate::check_authenticated(&session));
    }
}

// --- Admin path matching ---

#[test]
fn test_admin_path_matching() {
    for path in ["/admin", "/admin/", "/admin/user/", "/admin/payment/7/edit", "/admin/nope/x/y"] {
        assert!(is_admin_path(path), "{path} must be gated");
    }
    for path in ["/", "/login", "/logout", "/health", "/administrator", "/adminx/user"] {
        assert!(!is_admin_path(path), "{path} must not be gated");
    }
}

#[test]
fn test_redirect_status_is_see_other() {
    let gate = default_gate();
    let mut session = MemorySession::new();
    let response = gate
        .attempt_login(&LoginForm::new("admin", "admin"), &mut session)
        .unwrap()
        .into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
