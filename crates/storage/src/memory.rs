use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use common::{CartId, CartItemId, CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};

use crate::store::CommerceStore;
use crate::types::{
    CartHandle, CartItemUpsert, CartLineItem, CartStatus, CustomerContact, CustomerRecord,
    DeliveryOutcome, OrderDraft, OrderSummary, PlacedOrder, ProductRecord, SalesRecord,
};
use crate::{Result, StorageError};

#[derive(Debug, Clone)]
struct CartRow {
    cart_id: CartId,
    store_id: StoreId,
    customer_id: CustomerId,
    status: CartStatus,
}

#[derive(Debug, Clone)]
struct CartItemRow {
    item_id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct OrderRow {
    order_id: OrderId,
    customer_id: CustomerId,
    date_ordered: DateTime<Utc>,
    status: OrderStatus,
    total: Money,
}

#[derive(Debug, Clone)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    store_id: StoreId,
}

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, ProductRecord>,
    customers: HashMap<CustomerId, CustomerRecord>,
    carts: Vec<CartRow>,
    cart_items: Vec<CartItemRow>,
    orders: Vec<OrderRow>,
    order_items: Vec<OrderItemRow>,
    sales: Vec<SalesRecord>,
}

/// In-memory commerce store for testing.
///
/// Provides the same interface and atomicity guarantees as the
/// PostgreSQL implementation; multi-step mutations run under a single
/// write lock and validate every precondition before touching state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of order rows stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Reads a cart's lifecycle status, or None if the cart does not
    /// exist. Test support; the API surface never needs it.
    pub async fn cart_status(&self, cart_id: CartId) -> Result<Option<CartStatus>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .iter()
            .find(|c| c.cart_id == cart_id)
            .map(|c| c.status))
    }

    fn customer_owns_cart(state: &State, customer_id: CustomerId, cart_id: CartId) -> bool {
        state
            .carts
            .iter()
            .any(|c| c.cart_id == cart_id && c.customer_id == customer_id)
    }
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn get_or_create_cart(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<CartHandle> {
        let mut state = self.state.write().await;

        if let Some(cart) = state
            .carts
            .iter_mut()
            .find(|c| c.store_id == store_id && c.customer_id == customer_id)
        {
            cart.status = CartStatus::Active;
            return Ok(CartHandle {
                cart_id: cart.cart_id,
                created: false,
            });
        }

        let cart_id = CartId::new();
        state.carts.push(CartRow {
            cart_id,
            store_id,
            customer_id,
            status: CartStatus::Active,
        });
        Ok(CartHandle {
            cart_id,
            created: true,
        })
    }

    async fn upsert_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItemUpsert> {
        let mut state = self.state.write().await;

        if let Some(item) = state
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        {
            item.quantity += quantity;
            return Ok(CartItemUpsert {
                item_id: item.item_id,
                created: false,
            });
        }

        let item_id = CartItemId::new();
        state.cart_items.push(CartItemRow {
            item_id,
            cart_id,
            product_id,
            quantity,
        });
        Ok(CartItemUpsert {
            item_id,
            created: true,
        })
    }

    async fn set_cart_item_quantity(
        &self,
        customer_id: CustomerId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(cart_id) = state
            .cart_items
            .iter()
            .find(|i| i.item_id == item_id)
            .map(|i| i.cart_id)
        else {
            return Ok(());
        };
        if !Self::customer_owns_cart(&state, customer_id, cart_id) {
            return Ok(());
        }
        if let Some(item) = state.cart_items.iter_mut().find(|i| i.item_id == item_id) {
            item.quantity = quantity;
        }
        Ok(())
    }

    async fn remove_cart_item(&self, customer_id: CustomerId, item_id: CartItemId) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(cart_id) = state
            .cart_items
            .iter()
            .find(|i| i.item_id == item_id)
            .map(|i| i.cart_id)
        else {
            return Ok(());
        };
        if Self::customer_owns_cart(&state, customer_id, cart_id) {
            state.cart_items.retain(|i| i.item_id != item_id);
        }
        Ok(())
    }

    async fn active_cart_items(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<Vec<CartLineItem>> {
        let state = self.state.read().await;

        let Some(cart) = state.carts.iter().find(|c| {
            c.store_id == store_id
                && c.customer_id == customer_id
                && c.status == CartStatus::Active
        }) else {
            return Ok(Vec::new());
        };

        let items = state
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart.cart_id)
            .filter_map(|i| {
                let product = state.products.get(&i.product_id)?;
                Some(CartLineItem {
                    item_id: i.item_id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                    name: product.name.clone(),
                    unit_price: product.unit_price,
                    image_url: product.image_url.clone(),
                })
            })
            .collect();
        Ok(items)
    }

    async fn stock_level(&self, product_id: ProductId, store_id: StoreId) -> Result<Option<i64>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .get(&product_id)
            .filter(|p| p.store_id == store_id)
            .map(|p| p.stock_quantity))
    }

    async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder> {
        let mut state = self.state.write().await;

        // Validate every precondition before mutating anything, so a
        // failure leaves the state untouched (all-or-nothing).
        let mut computed_total = Money::zero();
        for line in &draft.lines {
            let available = state
                .products
                .get(&line.product_id)
                .filter(|p| p.store_id == draft.store_id)
                .map(|p| (p.stock_quantity, p.unit_price));
            match available {
                Some((stock, price)) if stock >= i64::from(line.quantity) => {
                    computed_total += price.multiply(line.quantity);
                }
                _ => {
                    return Err(StorageError::InsufficientStock {
                        product_id: line.product_id,
                    });
                }
            }
        }

        if computed_total != draft.declared_total {
            return Err(StorageError::TotalMismatch {
                declared: draft.declared_total,
                computed: computed_total,
            });
        }

        let cart_id = state
            .carts
            .iter()
            .find(|c| {
                c.store_id == draft.store_id
                    && c.customer_id == draft.customer_id
                    && c.status == CartStatus::Active
            })
            .map(|c| c.cart_id)
            .ok_or(StorageError::NoActiveCart {
                store_id: draft.store_id,
                customer_id: draft.customer_id,
            })?;

        // Commit: decrement stock, insert order + items, clear and
        // close the cart.
        let order_id = OrderId::new();
        for line in &draft.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock_quantity -= i64::from(line.quantity);
            }
            state.order_items.push(OrderItemRow {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                store_id: draft.store_id,
            });
        }
        state.orders.push(OrderRow {
            order_id,
            customer_id: draft.customer_id,
            date_ordered: Utc::now(),
            status: draft.status,
            total: computed_total,
        });
        state.cart_items.retain(|i| i.cart_id != cart_id);
        if let Some(cart) = state.carts.iter_mut().find(|c| c.cart_id == cart_id) {
            cart.status = CartStatus::Completed;
        }

        Ok(PlacedOrder {
            order_id,
            total: computed_total,
        })
    }

    async fn transition_order(
        &self,
        order_id: OrderId,
        store_id: StoreId,
        status: OrderStatus,
    ) -> Result<DeliveryOutcome> {
        let mut state = self.state.write().await;

        let current = state
            .orders
            .iter()
            .find(|o| o.order_id == order_id)
            .filter(|o| {
                state
                    .customers
                    .get(&o.customer_id)
                    .is_some_and(|c| c.store_id == store_id)
            })
            .map(|o| (o.status, o.customer_id, o.date_ordered))
            .ok_or(StorageError::OrderNotForStore { order_id, store_id })?;
        let (from, customer_id, date_ordered) = current;

        if !from.can_transition_to(status) {
            return Err(StorageError::InvalidTransition { from, to: status });
        }

        if let Some(order) = state.orders.iter_mut().find(|o| o.order_id == order_id) {
            order.status = status;
        }

        if status != OrderStatus::Delivered {
            return Ok(DeliveryOutcome {
                order_id,
                status,
                sales_recorded: 0,
                contact: None,
            });
        }

        let sales: Vec<SalesRecord> = state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id && i.store_id == store_id)
            .filter_map(|i| {
                let price = state.products.get(&i.product_id)?.unit_price;
                Some(SalesRecord {
                    sale_date: date_ordered,
                    sale_type: "online".to_string(),
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: price,
                    total: price.multiply(i.quantity),
                    store_id,
                    customer_id,
                })
            })
            .collect();
        let sales_recorded = sales.len();
        state.sales.extend(sales);

        let contact = state.customers.get(&customer_id).map(|c| CustomerContact {
            customer_id: c.customer_id,
            name: c.name.clone(),
            email: c.email.clone(),
        });

        Ok(DeliveryOutcome {
            order_id,
            status,
            sales_recorded,
            contact,
        })
    }

    async fn orders_for_store(&self, store_id: StoreId) -> Result<Vec<OrderSummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<OrderSummary> = state
            .orders
            .iter()
            .filter_map(|o| {
                let customer = state
                    .customers
                    .get(&o.customer_id)
                    .filter(|c| c.store_id == store_id)?;
                Some(OrderSummary {
                    order_id: o.order_id,
                    date_ordered: o.date_ordered,
                    total: o.total,
                    status: o.status,
                    customer_name: customer.name.clone(),
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.date_ordered.cmp(&a.date_ordered));
        Ok(summaries)
    }

    async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<SalesRecord>> {
        let state = self.state.read().await;
        Ok(state
            .sales
            .iter()
            .filter(|s| s.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: ProductRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.products.insert(product.product_id, product);
        Ok(())
    }

    async fn insert_customer(&self, customer: CustomerRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.customers.insert(customer.customer_id, customer);
        Ok(())
    }
}
