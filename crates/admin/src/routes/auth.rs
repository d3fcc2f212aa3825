//! Admin sign-in, sign-out and session lookup.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::SessionStorage;
use crate::models::SessionUser;
use crate::state::AppState;

/// Sign-in (and sign-up) request body.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

/// Body returned by the auth endpoints on success.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl AuthResponse {
    const fn signed_in(user: SessionUser) -> Self {
        Self {
            success: true,
            user: Some(user),
        }
    }

    const fn signed_out() -> Self {
        Self {
            success: true,
            user: None,
        }
    }
}

/// Current session state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// `POST /auth/login`
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CredentialsForm>,
) -> Result<Json<AuthResponse>> {
    // A fresh id on privilege change
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session cycle failed: {e}")))?;

    let storage = SessionStorage::new(&session);
    let mut guard = state.guard(&storage);
    let user = guard.sign_in(&form.email, &form.password).await?;

    set_sentry_user(&user);
    Ok(Json(AuthResponse::signed_in(user)))
}

/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>, session: Session) -> Json<AuthResponse> {
    let storage = SessionStorage::new(&session);
    state.guard(&storage).sign_out().await;
    clear_sentry_user();
    Json(AuthResponse::signed_out())
}

/// `POST /auth/signup`: registration is provisioned through the CLI.
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CredentialsForm>,
) -> Response {
    let storage = SessionStorage::new(&session);
    match state.guard(&storage).sign_up(&form.email, &form.password) {
        Ok(user) => (StatusCode::CREATED, Json(AuthResponse::signed_in(user))).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

/// `GET /auth/session`
pub async fn current(State(state): State<AppState>, session: Session) -> Json<SessionResponse> {
    let storage = SessionStorage::new(&session);
    let mut guard = state.guard(&storage);
    let user = guard.check_auth_state().await.user().cloned();

    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    })
}
