//! Order notification endpoint.
//!
//! `POST /api/email` with `{ "orderDetails": { ... } }` mails the customer a
//! confirmation and the restaurant an alert.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, instrument};

use crate::services::notifier::{NotifyRequest, NotifyResponse};
use crate::state::AppState;

/// Send the mails for one order.
#[instrument(skip_all)]
pub async fn send_order_email(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> Response {
    let Some(order) = request.order_details else {
        return (
            StatusCode::BAD_REQUEST,
            Json(NotifyResponse::failed("Order details are required")),
        )
            .into_response();
    };

    let Some(mailer) = state.mailer() else {
        error!("Order mail requested but SMTP is not configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(NotifyResponse::failed("Email service is not configured")),
        )
            .into_response();
    };

    let response = mailer.send_order_mail(&order).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response)).into_response()
}
