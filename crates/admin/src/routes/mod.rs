//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health          - Liveness
//! GET  /health/ready    - Readiness (database)
//!
//! # Auth
//! POST /auth/login      - Sign in (rate limited)
//! POST /auth/logout     - Sign out
//! POST /auth/signup     - Always refused
//! GET  /auth/session    - Current session, if any
//!
//! # Guarded
//! GET  /dashboard       - Orders page plus statistics (?page=N)
//! GET  /api/orders      - All orders as JSON
//! ```

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes(max_login_attempts: u32) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(auth::login).layer(login_rate_limiter(max_login_attempts)),
        )
        .route("/logout", post(auth::logout))
        .route("/signup", post(auth::signup))
        .route("/session", get(auth::current))
}

/// Create all routes for admin.
pub fn routes(max_login_attempts: u32) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes(max_login_attempts))
        .route("/dashboard", get(dashboard::index))
        .route("/api/orders", get(orders::list))
}
