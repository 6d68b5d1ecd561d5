//! Domain error taxonomy.

use std::time::Duration;

use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A product is missing or short on stock; recoverable by the
    /// caller (adjust the quantity).
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Checkout requested without an active cart; a caller contract
    /// violation, not recoverable.
    #[error("no active cart for customer {customer_id} in store {store_id}")]
    NoActiveCart {
        store_id: StoreId,
        customer_id: CustomerId,
    },

    /// Quantity below 1 or beyond what the schema can hold; rejected
    /// before any side effect.
    #[error("quantity {quantity} is outside the accepted range")]
    InvalidQuantity { quantity: u32 },

    /// Checkout requested with no line items.
    #[error("order must contain at least one item")]
    EmptyOrder,

    /// The declared order total diverges from the total computed from
    /// authoritative product prices.
    #[error("declared total {declared} does not match computed total {computed}")]
    TotalMismatch { declared: Money, computed: Money },

    /// Cross-store order access; no mutation performed.
    #[error("order {order_id} does not belong to store {store_id}")]
    Forbidden {
        order_id: OrderId,
        store_id: StoreId,
    },

    /// The closed status state machine rejected the move.
    #[error("order status cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The checkout transaction exceeded its explicit bound.
    #[error("checkout did not complete within {timeout:?}")]
    CheckoutTimeout { timeout: Duration },

    /// An error occurred in the storage layer.
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InsufficientStock { product_id } => {
                DomainError::InsufficientStock { product_id }
            }
            StorageError::NoActiveCart {
                store_id,
                customer_id,
            } => DomainError::NoActiveCart {
                store_id,
                customer_id,
            },
            StorageError::TotalMismatch { declared, computed } => {
                DomainError::TotalMismatch { declared, computed }
            }
            StorageError::OrderNotForStore { order_id, store_id } => DomainError::Forbidden {
                order_id,
                store_id,
            },
            StorageError::InvalidTransition { from, to } => {
                DomainError::InvalidTransition { from, to }
            }
            other => DomainError::Storage(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
