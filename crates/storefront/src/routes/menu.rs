//! Menu route handler.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::Result;
use crate::models::Product;
use crate::state::AppState;

/// Every product currently available, by name.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().fetch_products().await?))
}
