//! Relational store for the commerce system.
//!
//! Exposes the [`CommerceStore`] trait with two implementations: a
//! PostgreSQL store used in production and an in-memory store used by
//! unit and API tests. All multi-step mutations (checkout, delivery)
//! are atomic in both implementations.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use common::{CartId, CartItemId, CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};
pub use error::{Result, StorageError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::CommerceStore;
pub use types::{
    CartHandle, CartItemUpsert, CartLineItem, CartStatus, CustomerContact, CustomerRecord,
    DeliveryOutcome, OrderDraft, OrderLine, OrderSummary, PlacedOrder, ProductRecord, SalesRecord,
    MAX_LINE_QUANTITY,
};
