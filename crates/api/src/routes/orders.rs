//! Checkout and order status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};
use domain::{CheckoutRequest, DomainError, NotificationService};
use serde::{Deserialize, Serialize};
use storage::{CommerceStore, OrderLine};

use crate::AppState;
use crate::auth::AuthClaims;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CheckoutRequestBody {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub total_amount_cents: i64,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub store_id: StoreId,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub store_id: StoreId,
    pub status: OrderStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: OrderId,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

#[derive(Serialize)]
pub struct StatusUpdatedResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub sales_recorded: usize,
}

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub order_id: OrderId,
    pub date_ordered: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub customer_name: String,
}

fn lines_of(items: &[OrderLineRequest]) -> Vec<OrderLine> {
    items
        .iter()
        .map(|i| OrderLine {
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .collect()
}

// -- Handlers --

/// POST /cart/orders — run the atomic checkout: decrement stock,
/// insert the order, clear and complete the cart.
#[tracing::instrument(skip(state, claims, req))]
pub async fn checkout<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Json(req): Json<CheckoutRequestBody>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>), ApiError> {
    if claims.customer()? != req.customer_id {
        return Err(ApiError::Forbidden(
            "token does not match the requested customer".to_string(),
        ));
    }

    let placed = state
        .checkout
        .checkout(CheckoutRequest {
            store_id: req.store_id,
            customer_id: req.customer_id,
            status: req.status.unwrap_or_default(),
            declared_total: Money::from_cents(req.total_amount_cents),
            lines: lines_of(&req.items),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            order_id: placed.order_id,
            total_cents: placed.total.cents(),
        }),
    ))
}

/// POST /cart/orders/validate — side-effect-free stock pre-flight.
/// A short line is a client problem here, so it reports as 400 rather
/// than the checkout's 409.
#[tracing::instrument(skip(state, claims, req))]
pub async fn validate<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    claims.customer()?;

    let lines = lines_of(&req.items);
    match state.checkout.validate_stock(req.store_id, &lines).await {
        Ok(()) => Ok(Json(ValidateResponse { valid: true })),
        Err(err @ DomainError::InsufficientStock { .. }) => {
            Err(ApiError::BadRequest(err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// PUT /orders/:order_id/status — move an order through the status
/// machine on behalf of a store owner. Delivered records sales and
/// triggers the review notification.
#[tracing::instrument(skip(state, claims, req))]
pub async fn update_status<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
    Path(order_id): Path<OrderId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<StatusUpdatedResponse>, ApiError> {
    let store_id = claims.owner_store()?;
    if store_id != req.store_id {
        return Err(ApiError::Forbidden(
            "token does not match the requested store".to_string(),
        ));
    }

    let outcome = state
        .fulfillment
        .transition(order_id, store_id, req.status)
        .await?;

    Ok(Json(StatusUpdatedResponse {
        order_id: outcome.order_id,
        status: outcome.status,
        sales_recorded: outcome.sales_recorded,
    }))
}

/// GET /orders — list the owner's store orders, newest first.
#[tracing::instrument(skip(state, claims))]
pub async fn list<S: CommerceStore + Clone + 'static, N: NotificationService + 'static>(
    State(state): State<Arc<AppState<S, N>>>,
    claims: AuthClaims,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let store_id = claims.owner_store()?;

    let orders = state
        .store
        .orders_for_store(store_id)
        .await
        .map_err(DomainError::from)?;
    let responses = orders
        .into_iter()
        .map(|o| OrderSummaryResponse {
            order_id: o.order_id,
            date_ordered: o.date_ordered.to_rfc3339(),
            total_cents: o.total.cents(),
            status: o.status,
            customer_name: o.customer_name,
        })
        .collect();
    Ok(Json(responses))
}
