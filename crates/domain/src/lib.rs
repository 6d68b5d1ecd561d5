//! Domain layer for the commerce system.
//!
//! Four services over a [`CommerceStore`]: the cart manager, the
//! inventory ledger, the checkout coordinator, and the fulfillment
//! service that records sales and triggers the delivery notification.
//!
//! [`CommerceStore`]: storage::CommerceStore

pub mod cart;
pub mod checkout;
pub mod error;
pub mod fulfillment;
pub mod inventory;

pub use cart::CartManager;
pub use checkout::{CheckoutCoordinator, CheckoutRequest};
pub use error::{DomainError, Result};
pub use fulfillment::{
    DeliveryNotice, FulfillmentService, InMemoryNotificationService, LoggingNotificationService,
    NotificationError, NotificationService,
};
pub use inventory::{InventoryLedger, StockCheck};

pub use common::{CartId, CartItemId, CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};
pub use storage::OrderLine;
