//! Cart lifecycle and line item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartId, CartItemId, CustomerId, ProductId, StoreId};
use domain::NotificationService;
use serde::{Deserialize, Serialize};
use storage::CommerceStore;

use crate::AppState;
use crate::auth::AuthClaims;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct OpenCartRequest {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub cart_id: CartId,
}

#[derive(Serialize)]
pub struct CartItemCreatedResponse {
    pub item_id: CartItemId,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
}

// -- Handlers --

/// POST /cart — return the pair's active cart, creating or
/// reactivating one. 201 when a new row was inserted, 200 otherwise.
#[tracing::instrument(skip(state, claims, req))]
pub async fn open<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Json(req): Json<OpenCartRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let customer_id = claims.customer()?;
    if customer_id != req.customer_id {
        return Err(ApiError::Forbidden(
            "token does not match the requested customer".to_string(),
        ));
    }

    let handle = state.carts.open_cart(req.store_id, req.customer_id).await?;
    let status = if handle.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(CartResponse {
            cart_id: handle.cart_id,
        }),
    ))
}

/// POST /cart-items — add a product to a cart. 201 for a new line,
/// 200 when the quantity was accumulated onto an existing line.
#[tracing::instrument(skip(state, claims, req))]
pub async fn add_item<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItemCreatedResponse>), ApiError> {
    claims.customer()?;

    let upsert = state
        .carts
        .add_item(req.cart_id, req.product_id, req.quantity)
        .await?;
    let status = if upsert.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(CartItemCreatedResponse {
            item_id: upsert.item_id,
        }),
    ))
}

/// GET /carts/:store_id/:customer_id/items — list the active cart's
/// line items with product display data; empty when there is none.
#[tracing::instrument(skip(state, claims))]
pub async fn list_items<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Path((store_id, customer_id)): Path<(StoreId, CustomerId)>,
) -> Result<Json<Vec<CartItemResponse>>, ApiError> {
    if claims.customer()? != customer_id {
        return Err(ApiError::Forbidden(
            "token does not match the requested customer".to_string(),
        ));
    }

    let items = state.carts.list_items(store_id, customer_id).await?;
    let responses = items
        .into_iter()
        .map(|item| CartItemResponse {
            item_id: item.item_id,
            product_id: item.product_id,
            quantity: item.quantity,
            name: item.name,
            price_cents: item.unit_price.cents(),
            image_url: item.image_url,
        })
        .collect();
    Ok(Json(responses))
}

/// PUT /cart-items/:item_id — replace a line's quantity. Only lines in
/// the caller's own carts are touched.
#[tracing::instrument(skip(state, claims, req))]
pub async fn update_item<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Path(item_id): Path<CartItemId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<StatusCode, ApiError> {
    let customer_id = claims.customer()?;

    state
        .carts
        .update_item_quantity(customer_id, item_id, req.quantity)
        .await?;
    Ok(StatusCode::OK)
}

/// DELETE /cart-items/:item_id — remove a line from one of the
/// caller's carts. Idempotent, 200 always.
#[tracing::instrument(skip(state, claims))]
pub async fn remove_item<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Path(item_id): Path<CartItemId>,
) -> Result<StatusCode, ApiError> {
    let customer_id = claims.customer()?;

    state.carts.remove_item(customer_id, item_id).await?;
    Ok(StatusCode::OK)
}
