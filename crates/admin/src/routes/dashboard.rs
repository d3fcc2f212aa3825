//! Order dashboard.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::dashboard::DashboardView;
use crate::state::AppState;

/// Query parameters for the dashboard.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub page: Option<usize>,
}

/// `GET /dashboard`
#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardView>> {
    let orders = OrderRepository::new(state.pool()).list().await?;
    let config = state.config();

    Ok(Json(DashboardView::build(
        &config.dashboard_title,
        orders,
        query.page.unwrap_or(1),
        config.items_per_page,
    )))
}
