//! Storefront error responses.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured to
//! Sentry and answered with a generic message; the cart page turns
//! `MenuUnavailable` into its loading state.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::cart::CartError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart storage or catalog failure.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// The menu could not be read; the request may be retried.
    #[error("Menu unavailable")]
    MenuUnavailable,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Cart(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MenuUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() && !matches!(self, Self::MenuUnavailable) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request error");
            "Internal server error"
        } else {
            "The menu is loading, please try again"
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Leave a Sentry breadcrumb for a customer action.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use dar_sellami_core::StorageError;

    use super::*;

    #[test]
    fn test_menu_unavailable_is_retryable() {
        assert_eq!(
            AppError::MenuUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_cart_storage_failure_is_server_error() {
        let err = AppError::from(CartError::Storage(StorageError::Backend(
            "session store down".to_string(),
        )));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
