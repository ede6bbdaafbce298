use crate::{
    AppState,
    auth::{LoginForm, SessionGate},
    models::{PageRequest, Record, RecordType},
    repository::StoreError,
    routes::LOGIN_PATH,
    session::CookieSession,
    templates::{
        DetailsTemplate, FormTemplate, IndexTemplate, ListTemplate, LoginTemplate, nav_items,
        path_segment,
    },
};
use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

// --- Error Mapping ---

/// AdminError
///
/// Everything an admin or login handler can fail with, mapped onto an HTTP status
/// by `IntoResponse`. Store and template failures are logged here, once.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),
    #[error("record not found")]
    RecordNotFound,
    #[error("action not allowed for {0}")]
    ActionNotAllowed(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::UnknownRecordType(_) | AdminError::RecordNotFound => StatusCode::NOT_FOUND,
            AdminError::ActionNotAllowed(_) => StatusCode::FORBIDDEN,
            AdminError::Store(e) => {
                tracing::error!("store error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AdminError::Template(e) => {
                tracing::error!("template error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

fn render<T: Template>(template: &T) -> Result<Html<String>, AdminError> {
    Ok(Html(template.render()?))
}

/// Resolves the `{record}` path segment against the registry.
fn resolve(state: &AppState, slug: &str) -> Result<RecordType, AdminError> {
    state
        .registry
        .lookup(slug)
        .cloned()
        .ok_or_else(|| AdminError::UnknownRecordType(slug.to_string()))
}

fn ensure(allowed: bool, record_type: &RecordType) -> Result<(), AdminError> {
    if allowed {
        Ok(())
    } else {
        Err(AdminError::ActionNotAllowed(record_type.slug))
    }
}

/// Form submissions arrive as strings; the store converts them to column types.
fn form_to_record(form: HashMap<String, String>) -> Record {
    form.into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect()
}

// --- Login Handlers ---

/// login_page
///
/// [Public Route] Renders the empty login form. Shown even to authenticated
/// callers; logging in again is allowed.
pub async fn login_page() -> Result<Html<String>, AdminError> {
    render(&LoginTemplate { error: None })
}

/// login_submit
///
/// [Public Route] Runs the gate's login transition against the caller's cookie
/// session. Success commits the session and redirects to the admin root; a mismatch
/// re-renders the form with the error and leaves the cookie untouched.
pub async fn login_submit(
    State(gate): State<Arc<SessionGate>>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AdminError> {
    let mut session = CookieSession::load(&jar);

    match gate.attempt_login(&form, &mut session) {
        Ok(redirect) => {
            tracing::info!(username = ?form.username, "admin login succeeded");
            Ok((session.commit(jar), redirect).into_response())
        }
        Err(e) => {
            tracing::warn!(username = ?form.username, "admin login failed");
            let page = render(&LoginTemplate {
                error: Some(e.to_string()),
            })?;
            Ok(page.into_response())
        }
    }
}

/// logout
///
/// [Public Route] Clears the authentication flag and sends the caller back to the
/// login page. Safe to call repeatedly.
pub async fn logout(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    let mut session = CookieSession::load(&jar);
    SessionGate::logout(&mut session);
    tracing::info!("admin logged out");
    (session.commit(jar), Redirect::to(LOGIN_PATH))
}

// --- Admin Surface Handlers ---
//
// Every handler below is only reachable through the `require_login` middleware.

/// admin_index
///
/// [Admin Route] Landing page listing every registered record type.
pub async fn admin_index(State(state): State<AppState>) -> Result<Html<String>, AdminError> {
    render(&IndexTemplate {
        nav: nav_items(&state.registry),
    })
}

/// list_records
///
/// [Admin Route] Paginated grid over one record type (`?page=N`, zero-based).
pub async fn list_records(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Html<String>, AdminError> {
    let record_type = resolve(&state, &slug)?;
    let columns = state.repo.columns(&record_type).await?;
    let page = state.repo.list(&record_type, page).await?;

    render(&ListTemplate::new(
        nav_items(&state.registry),
        &record_type,
        &columns,
        &page,
    ))
}

/// record_details
///
/// [Admin Route] Read-only view of a single record.
pub async fn record_details(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Html<String>, AdminError> {
    let record_type = resolve(&state, &slug)?;
    ensure(record_type.capabilities.can_view_details, &record_type)?;

    let record = state
        .repo
        .get(&record_type, &id)
        .await?
        .ok_or(AdminError::RecordNotFound)?;
    let columns = state.repo.columns(&record_type).await?;

    render(&DetailsTemplate::new(
        nav_items(&state.registry),
        &record_type,
        &id,
        &columns,
        &record,
    ))
}

/// new_record_form
///
/// [Admin Route] Empty create form.
pub async fn new_record_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AdminError> {
    let record_type = resolve(&state, &slug)?;
    ensure(record_type.capabilities.can_create, &record_type)?;

    let columns = state.repo.columns(&record_type).await?;
    render(&FormTemplate::create(
        nav_items(&state.registry),
        &record_type,
        &columns,
    ))
}

/// create_record
///
/// [Admin Route] Inserts a record from the submitted form and returns to the grid.
pub async fn create_record(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, AdminError> {
    let record_type = resolve(&state, &slug)?;
    ensure(record_type.capabilities.can_create, &record_type)?;

    state.repo.create(&record_type, form_to_record(form)).await?;
    tracing::info!(record_type = record_type.slug, "record created");

    Ok(Redirect::to(&format!("/admin/{}/", record_type.slug)))
}

/// edit_record_form
///
/// [Admin Route] Edit form prefilled with the current record.
pub async fn edit_record_form(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Html<String>, AdminError> {
    let record_type = resolve(&state, &slug)?;
    ensure(record_type.capabilities.can_edit, &record_type)?;

    let record = state
        .repo
        .get(&record_type, &id)
        .await?
        .ok_or(AdminError::RecordNotFound)?;
    let columns = state.repo.columns(&record_type).await?;

    render(&FormTemplate::edit(
        nav_items(&state.registry),
        &record_type,
        &id,
        &columns,
        &record,
    ))
}

/// update_record
///
/// [Admin Route] Applies the submitted form to an existing record and shows it.
pub async fn update_record(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, AdminError> {
    let record_type = resolve(&state, &slug)?;
    ensure(record_type.capabilities.can_edit, &record_type)?;

    state
        .repo
        .update(&record_type, &id, form_to_record(form))
        .await?
        .ok_or(AdminError::RecordNotFound)?;
    tracing::info!(record_type = record_type.slug, id = %id, "record updated");

    Ok(Redirect::to(&format!(
        "/admin/{}/{}",
        record_type.slug,
        path_segment(&id)
    )))
}

/// delete_record
///
/// [Admin Route] Deletes a record and returns to the grid.
pub async fn delete_record(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Redirect, AdminError> {
    let record_type = resolve(&state, &slug)?;
    ensure(record_type.capabilities.can_delete, &record_type)?;

    if !state.repo.delete(&record_type, &id).await? {
        return Err(AdminError::RecordNotFound);
    }
    tracing::info!(record_type = record_type.slug, id = %id, "record deleted");

    Ok(Redirect::to(&format!("/admin/{}/", record_type.slug)))
}

/// not_found
///
/// Router fallback. Registered before the gate layer so unrouted `/admin` URLs are
/// still redirected for anonymous callers.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
