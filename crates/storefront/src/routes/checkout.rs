//! Checkout route handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::SessionStorage;
use crate::services::cart::{CartService, CartView};
use crate::services::checkout::{
    CheckoutForm, OrderSubmission, SubmissionReport, SubmitError, SubmitTicket,
};
use crate::state::AppState;

fn status_for(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::EmptyCart | SubmitError::InvalidForm(_) => StatusCode::BAD_REQUEST,
        SubmitError::AlreadySubmitting => StatusCode::CONFLICT,
        SubmitError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn rejected(err: &SubmitError) -> Response {
    (status_for(err), Json(SubmissionReport::from(err))).into_response()
}

/// Claim the session for one submission.
///
/// A session that was never saved has no id and no cart either, so it needs
/// no claim.
fn claim(
    state: &AppState,
    session: &Session,
) -> std::result::Result<Option<SubmitTicket>, SubmitError> {
    session.id().map_or(Ok(None), |id| {
        state
            .submit_guard()
            .try_begin(&id.to_string())
            .map(Some)
            .ok_or(SubmitError::AlreadySubmitting)
    })
}

/// Place the order held in the session's cart.
#[instrument(skip_all, fields(delivery_type = %form.delivery_type))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<Response> {
    let _ticket = match claim(&state, &session) {
        Ok(ticket) => ticket,
        Err(err) => {
            warn!("Checkout already in progress for this session");
            return Ok(rejected(&err));
        }
    };

    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = carts.load().await?;
    if cart.is_empty() {
        return Ok(rejected(&SubmitError::EmptyCart));
    }

    let fulfillment = match form.into_selection() {
        Ok(selection) => selection,
        Err(err) => return Ok(rejected(&err)),
    };

    let view = carts.view(&cart, state.catalog()).await;
    if matches!(view, CartView::Loading { .. }) {
        return Err(AppError::MenuUnavailable);
    }

    let orders = OrderRepository::new(state.pool());
    let mut submission = OrderSubmission::new(
        &orders,
        state.notifier(),
        &storage,
        state.config().delivery_fee,
    );
    let result = submission
        .submit(view.order_items(), fulfillment, |outcome| {
            add_breadcrumb("checkout", "Order placed", Some(&[("outcome", outcome.code())]));
        })
        .await;

    Ok(match result {
        Ok(outcome) => {
            info!(outcome = outcome.code(), "Checkout complete");
            (StatusCode::OK, Json(SubmissionReport::from(&outcome))).into_response()
        }
        Err(err) => rejected(&err),
    })
}
