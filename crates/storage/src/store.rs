use async_trait::async_trait;

use common::{CartId, CartItemId, CustomerId, OrderId, OrderStatus, ProductId, StoreId};

use crate::types::{
    CartHandle, CartItemUpsert, CartLineItem, CustomerRecord, DeliveryOutcome, OrderDraft,
    OrderSummary, PlacedOrder, ProductRecord, SalesRecord,
};
use crate::Result;

/// Core trait for commerce store implementations.
///
/// The store owns the transactional boundaries: [`place_order`] and
/// [`transition_order`] are atomic — either every step commits or none
/// does — and no implementation ever persists negative stock. All
/// implementations must be thread-safe (Send + Sync).
///
/// [`place_order`]: CommerceStore::place_order
/// [`transition_order`]: CommerceStore::transition_order
#[async_trait]
pub trait CommerceStore: Send + Sync {
    // -- Carts --

    /// Returns the cart for a (store, customer) pair, creating or
    /// reactivating as needed. Never produces a second row for the
    /// same pair, even under concurrent calls.
    async fn get_or_create_cart(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<CartHandle>;

    /// Adds a product to a cart. If the (cart, product) line already
    /// exists its quantity is incremented, never duplicated.
    async fn upsert_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItemUpsert>;

    /// Sets the quantity of a line in one of the customer's own carts.
    /// A missing line, or a line in another customer's cart, is a
    /// no-op.
    async fn set_cart_item_quantity(
        &self,
        customer_id: CustomerId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()>;

    /// Removes a line from one of the customer's own carts. Idempotent;
    /// a foreign line is left untouched.
    async fn remove_cart_item(&self, customer_id: CustomerId, item_id: CartItemId) -> Result<()>;

    /// Lists the line items of the pair's *active* cart, joined with
    /// product name, price, and image. Empty when no active cart.
    async fn active_cart_items(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<Vec<CartLineItem>>;

    // -- Inventory --

    /// Returns the available stock for a product scoped to a store, or
    /// None if the product does not exist there. Read-only.
    async fn stock_level(&self, product_id: ProductId, store_id: StoreId) -> Result<Option<i64>>;

    // -- Checkout --

    /// Places an order as a single atomic unit: conditionally decrement
    /// stock for every line, verify the declared total against current
    /// prices, insert the order and its items, then clear and close the
    /// active cart. Any failure rolls the whole unit back.
    async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder>;

    // -- Fulfillment --

    /// Transitions an order's status, enforcing store ownership and the
    /// closed state machine. Entering `Delivered` also writes one sales
    /// row per order item, atomically with the status update, and
    /// returns the customer contact for the follow-up notification.
    async fn transition_order(
        &self,
        order_id: OrderId,
        store_id: StoreId,
        status: OrderStatus,
    ) -> Result<DeliveryOutcome>;

    // -- Reporting & catalog glue --

    /// Lists a store's orders joined with customer names, newest first.
    async fn orders_for_store(&self, store_id: StoreId) -> Result<Vec<OrderSummary>>;

    /// Reads back the append-only sales ledger for a store.
    async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<SalesRecord>>;

    /// Inserts a catalog product.
    async fn insert_product(&self, product: ProductRecord) -> Result<()>;

    /// Inserts a customer.
    async fn insert_customer(&self, customer: CustomerRecord) -> Result<()>;
}
