//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database)
//! GET  /menu                   - Available products
//! GET  /restaurant             - Restaurant profile
//! GET  /orders                 - Stored orders, newest first
//!
//! # Cart (JSON, session-backed)
//! GET  /cart                   - Cart view; ?cart=<encoded> replaces the cart
//! POST /cart/add               - Add a product
//! POST /cart/increment         - Quantity +1
//! POST /cart/decrement         - Quantity -1 (1 removes)
//! POST /cart/quantity          - Raw quantity field edit
//! POST /cart/blur              - Quantity field lost focus
//! POST /cart/remove            - Remove a product
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Item count badge
//! GET  /cart/share             - Shareable cart link
//!
//! # Orders (rate limited)
//! POST /checkout               - Submit the cart as an order
//! POST /api/email              - Send order confirmation and alert
//! ```

pub mod api;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod menu;
pub mod orders;
pub mod restaurant;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/quantity", post(cart::set_quantity))
        .route("/blur", post(cart::blur))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .route("/share", get(cart::share))
}

/// Create the order-placing routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::submit))
        .route("/api/email", post(api::email::send_order_email))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/menu", get(menu::index))
        .route("/restaurant", get(restaurant::profile))
        .route("/orders", get(orders::index))
        .nest("/cart", cart_routes().layer(api_rate_limiter()))
        .merge(order_routes().layer(checkout_rate_limiter()))
}
