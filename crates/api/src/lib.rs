//! HTTP surface for the multi-tenant commerce checkout core.
//!
//! Exposes the cart lifecycle, the atomic checkout, and order status
//! transitions as JSON endpoints, with bearer-token authentication,
//! structured logging (tracing), and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, post, put};
use domain::{CartManager, CheckoutCoordinator, FulfillmentService, NotificationService};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::CommerceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AuthKeys;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CommerceStore, N: NotificationService> {
    pub carts: CartManager<S>,
    pub checkout: CheckoutCoordinator<S>,
    pub fulfillment: FulfillmentService<S, N>,
    pub store: S,
    pub auth: AuthKeys,
}

impl<S, N> FromRef<Arc<AppState<S, N>>> for AuthKeys
where
    S: CommerceStore,
    N: NotificationService,
{
    fn from_ref(state: &Arc<AppState<S, N>>) -> Self {
        state.auth.clone()
    }
}

/// Builds the application state over a store and a notification
/// channel.
pub fn create_state<S, N>(
    store: S,
    notifier: Arc<N>,
    auth: AuthKeys,
    checkout_timeout: Duration,
) -> Arc<AppState<S, N>>
where
    S: CommerceStore + Clone + 'static,
    N: NotificationService + 'static,
{
    Arc::new(AppState {
        carts: CartManager::new(store.clone()),
        checkout: CheckoutCoordinator::with_timeout(store.clone(), checkout_timeout),
        fulfillment: FulfillmentService::new(store.clone(), notifier),
        store,
        auth,
    })
}

/// Creates the axum application router with all routes and shared state.
pub fn create_app<S, N>(state: Arc<AppState<S, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: CommerceStore + Clone + 'static,
    N: NotificationService + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", post(routes::carts::open::<S, N>))
        .route("/cart-items", post(routes::carts::add_item::<S, N>))
        .route(
            "/cart-items/{item_id}",
            put(routes::carts::update_item::<S, N>).delete(routes::carts::remove_item::<S, N>),
        )
        .route(
            "/carts/{store_id}/{customer_id}/items",
            get(routes::carts::list_items::<S, N>),
        )
        .route("/cart/orders", post(routes::orders::checkout::<S, N>))
        .route(
            "/cart/orders/validate",
            post(routes::orders::validate::<S, N>),
        )
        .route("/orders", get(routes::orders::list::<S, N>))
        .route(
            "/orders/{order_id}/status",
            put(routes::orders::update_status::<S, N>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
