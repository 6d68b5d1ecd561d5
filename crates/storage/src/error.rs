use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};
use thiserror::Error;

/// Errors that can occur when interacting with the commerce store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A product has less stock than the requested quantity (or does
    /// not exist for the store). Aborts the whole checkout.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Checkout found no active cart for the (customer, store) pair.
    #[error("no active cart for customer {customer_id} in store {store_id}")]
    NoActiveCart {
        store_id: StoreId,
        customer_id: CustomerId,
    },

    /// The declared order total does not match the total computed from
    /// the authoritative product prices.
    #[error("declared total {declared} does not match computed total {computed}")]
    TotalMismatch { declared: Money, computed: Money },

    /// The order does not belong to a customer of the given store.
    #[error("order {order_id} is not visible to store {store_id}")]
    OrderNotForStore {
        order_id: OrderId,
        store_id: StoreId,
    },

    /// The requested status change is not allowed by the state machine.
    #[error("order status cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A persisted status string failed to parse as a known status.
    #[error("unknown order status in storage: {value}")]
    UnknownStatus { value: String },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
