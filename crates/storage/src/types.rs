//! Row and request types exchanged with the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{CartId, CartItemId, CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};

/// Lifecycle status of a cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartStatus {
    /// The cart is being filled; at most one per (store, customer).
    Active,
    /// The cart went through checkout. Reactivated on the next open.
    Completed,
}

impl CartStatus {
    /// Returns the status as the string persisted in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Completed => "completed",
        }
    }

    /// Parses a persisted status string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CartStatus::Active),
            "completed" => Some(CartStatus::Completed),
            _ => None,
        }
    }
}

/// Result of opening a cart for a (store, customer) pair.
#[derive(Debug, Clone, Copy)]
pub struct CartHandle {
    /// The active cart's id.
    pub cart_id: CartId,
    /// True if a new row was inserted, false if an existing cart was
    /// returned or reactivated.
    pub created: bool,
}

/// Result of upserting a cart line item.
#[derive(Debug, Clone, Copy)]
pub struct CartItemUpsert {
    /// The line item's id.
    pub item_id: CartItemId,
    /// True for a new line, false when an existing line's quantity was
    /// accumulated.
    pub created: bool,
}

/// A cart line joined with product display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineItem {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: String,
    pub unit_price: Money,
    pub image_url: Option<String>,
}

/// Largest line quantity the schema can hold; the quantity columns are
/// 32-bit signed integers.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// One requested order line at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Everything the store needs to place an order atomically.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    /// Initial workflow status supplied by the caller.
    pub status: OrderStatus,
    /// Client-supplied total, verified against the computed total.
    pub declared_total: Money,
    pub lines: Vec<OrderLine>,
}

/// A committed order.
#[derive(Debug, Clone, Copy)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    /// Total recomputed from authoritative product prices.
    pub total: Money,
}

/// Contact data for the post-delivery notification.
#[derive(Debug, Clone)]
pub struct CustomerContact {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
}

/// Result of an order status transition.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Number of sales rows written; zero unless the transition entered
    /// `Delivered`.
    pub sales_recorded: usize,
    /// Present only when the order was delivered.
    pub contact: Option<CustomerContact>,
}

/// An order row joined with the customer name, for the owner listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub date_ordered: DateTime<Utc>,
    pub total: Money,
    pub status: OrderStatus,
    pub customer_name: String,
}

/// A catalog product row.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub unit_price: Money,
    pub image_url: Option<String>,
    pub stock_quantity: i64,
}

/// An append-only sales ledger row, written at delivery confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct SalesRecord {
    pub sale_date: DateTime<Utc>,
    pub sale_type: String,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
}

/// A customer row; the slice of the customer table the core needs for
/// ownership checks and notifications.
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub store_id: StoreId,
    pub name: String,
    pub email: String,
}
