//! Restaurant profile handler.

use axum::{Json, extract::State};

use crate::config::RestaurantProfile;
use crate::state::AppState;

/// Name, address, phone and opening hours.
pub async fn profile(State(state): State<AppState>) -> Json<RestaurantProfile> {
    Json(state.config().restaurant.clone())
}
