//! Cart manager: cart lifecycle and line items per (store, customer).

use common::{CartId, CartItemId, CustomerId, ProductId, StoreId};
use storage::{CartHandle, CartItemUpsert, CartLineItem, CommerceStore, MAX_LINE_QUANTITY};

use crate::error::{DomainError, Result};

/// Service owning the cart lifecycle.
///
/// A (store, customer) pair has at most one cart row; checkout flips it
/// to completed and the next open reactivates it.
pub struct CartManager<S: CommerceStore> {
    store: S,
}

impl<S: CommerceStore> CartManager<S> {
    /// Creates a new cart manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the pair's active cart, creating or reactivating as
    /// needed.
    #[tracing::instrument(skip(self))]
    pub async fn open_cart(&self, store_id: StoreId, customer_id: CustomerId) -> Result<CartHandle> {
        let handle = self.store.get_or_create_cart(store_id, customer_id).await?;
        tracing::debug!(cart_id = %handle.cart_id, created = handle.created, "cart opened");
        Ok(handle)
    }

    /// Adds a product to a cart, accumulating quantity onto an existing
    /// line. Rejects out-of-range quantities before any write.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItemUpsert> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        Ok(self
            .store
            .upsert_cart_item(cart_id, product_id, quantity)
            .await?)
    }

    /// Replaces a line's quantity. Rejects out-of-range quantities, and
    /// only touches lines in the customer's own carts.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        customer_id: CustomerId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        Ok(self
            .store
            .set_cart_item_quantity(customer_id, item_id, quantity)
            .await?)
    }

    /// Removes a line from one of the customer's carts. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, customer_id: CustomerId, item_id: CartItemId) -> Result<()> {
        Ok(self.store.remove_cart_item(customer_id, item_id).await?)
    }

    /// Lists the active cart's line items joined with product display
    /// data; empty when the pair has no active cart.
    #[tracing::instrument(skip(self))]
    pub async fn list_items(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<Vec<CartLineItem>> {
        Ok(self.store.active_cart_items(store_id, customer_id).await?)
    }
}
