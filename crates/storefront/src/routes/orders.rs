//! Order list handler.

use axum::{Json, extract::State};
use tracing::instrument;

use dar_sellami_core::Order;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::state::AppState;

/// Stored orders, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list().await?;
    Ok(Json(orders))
}
