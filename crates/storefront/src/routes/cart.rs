//! Cart route handlers.
//!
//! The cart lives in the customer's session. Every mutating endpoint returns
//! the refreshed cart view so the page can re-render in one round trip.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use dar_sellami_core::{Cart, ProductId, QuantityEdit};

use crate::error::Result;
use crate::middleware::SessionStorage;
use crate::services::cart::{CartService, CartView, share_link};
use crate::state::AppState;

/// Cart page payload.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: CartView,
    pub total_items: u64,
    /// Present after a quantity edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit: Option<EditResponse>,
}

/// Outcome of a quantity edit.
#[derive(Debug, Serialize)]
pub struct EditResponse {
    /// `pending`, `committed` or `removed`.
    pub status: &'static str,
    /// What the field should show now.
    pub display: String,
}

impl EditResponse {
    fn from_edit(edit: &QuantityEdit) -> Self {
        match edit {
            QuantityEdit::Pending(raw) => Self {
                status: "pending",
                display: raw.clone(),
            },
            QuantityEdit::Committed(quantity) => Self {
                status: "committed",
                display: quantity.to_string(),
            },
            QuantityEdit::Removed => Self {
                status: "removed",
                display: String::new(),
            },
        }
    }
}

/// `?cart=` hand-off parameter.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub cart: Option<String>,
}

/// Add to cart body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<i64>,
}

/// Body naming one product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub product_id: ProductId,
}

/// Raw quantity field text.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityForm {
    pub product_id: ProductId,
    pub value: String,
}

async fn respond(
    state: &AppState,
    carts: &CartService<'_, SessionStorage<'_>>,
    cart: &Cart,
) -> CartResponse {
    CartResponse {
        cart: carts.view(cart, state.catalog()).await,
        total_items: cart.total_items(),
        edit: None,
    }
}

/// Show the cart. A `cart` query parameter replaces the stored cart first.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CartQuery>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = match query.cart.as_deref() {
        Some(encoded) => carts.replace_from_url(encoded).await?,
        None => carts.load().await?,
    };
    Ok(Json(respond(&state, &carts, &cart).await))
}

/// Add a product (default one unit).
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = carts.add(form.product_id, form.quantity.unwrap_or(1)).await?;
    Ok(Json(respond(&state, &carts, &cart).await))
}

/// Step a quantity up.
#[instrument(skip(state, session))]
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ProductForm>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = carts.increment(form.product_id).await?;
    Ok(Json(respond(&state, &carts, &cart).await))
}

/// Step a quantity down; one becomes removal.
#[instrument(skip(state, session))]
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ProductForm>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = carts.decrement(&form.product_id).await?;
    Ok(Json(respond(&state, &carts, &cart).await))
}

/// Apply the raw text of a quantity field.
#[instrument(skip(state, session))]
pub async fn set_quantity(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<QuantityForm>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let (cart, edit) = carts.set_quantity(form.product_id, &form.value).await?;
    let mut response = respond(&state, &carts, &cart).await;
    response.edit = Some(EditResponse::from_edit(&edit));
    Ok(Json(response))
}

/// The quantity field lost focus.
#[instrument(skip(state, session))]
pub async fn blur(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ProductForm>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = carts.end_edit(&form.product_id).await?;
    Ok(Json(respond(&state, &carts, &cart).await))
}

/// Remove a product.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ProductForm>,
) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    let carts = CartService::new(&storage);
    let cart = carts.remove(&form.product_id).await?;
    Ok(Json(respond(&state, &carts, &cart).await))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartResponse>> {
    let storage = SessionStorage::new(&session);
    CartService::new(&storage).clear().await?;
    Ok(Json(CartResponse {
        cart: CartView::Empty,
        total_items: 0,
        edit: None,
    }))
}

/// Badge count.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Total item count for the header badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<CountResponse>> {
    let storage = SessionStorage::new(&session);
    let cart = CartService::new(&storage).load().await?;
    Ok(Json(CountResponse {
        count: cart.total_items(),
    }))
}

/// Shareable cart link.
#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub url: String,
}

/// A `/cart?cart=...` link reproducing the current cart.
#[instrument(skip(state, session))]
pub async fn share(State(state): State<AppState>, session: Session) -> Result<Json<ShareResponse>> {
    let storage = SessionStorage::new(&session);
    let cart = CartService::new(&storage).load().await?;
    Ok(Json(ShareResponse {
        url: share_link(&state.config().base_url, &cart),
    }))
}
