//! Authentication extractor for admin routes.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use super::SessionStorage;
use crate::models::SessionUser;
use crate::state::AppState;

/// Extractor that requires a live admin session.
///
/// Runs the guard's session check on every request, so an expired session is
/// purged the first time it is presented.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(admin): RequireAdmin) -> String {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdmin(pub SessionUser);

/// Rejection for requests without a live admin session.
#[derive(Debug)]
pub struct AdminAuthRejection;

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Authentication required" })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection)?;
        let storage = SessionStorage::new(&session);

        let mut guard = state.guard(&storage);
        let user = guard
            .check_auth_state()
            .await
            .user()
            .cloned()
            .ok_or(AdminAuthRejection)?;

        crate::error::set_sentry_user(&user);
        Ok(Self(user))
    }
}
