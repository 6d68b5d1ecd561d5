//! Order transaction coordinator: the atomic cart-to-order transition.

use std::time::Duration;

use common::{CustomerId, Money, OrderStatus, StoreId};
use storage::{CommerceStore, OrderDraft, OrderLine, PlacedOrder, MAX_LINE_QUANTITY};

use crate::error::{DomainError, Result};
use crate::inventory::InventoryLedger;

/// Default bound on the checkout transaction.
pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// A checkout request as supplied by the client.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    /// Initial workflow status for the new order.
    pub status: OrderStatus,
    /// Client-computed total; treated as a display hint and verified
    /// against the authoritative prices inside the transaction.
    pub declared_total: Money,
    pub lines: Vec<OrderLine>,
}

/// Coordinates the checkout protocol.
///
/// Input validation happens here with no side effects; the store then
/// executes stock decrement, order insertion, and cart close-out as one
/// transaction. The whole unit runs under an explicit timeout.
pub struct CheckoutCoordinator<S: CommerceStore> {
    store: S,
    ledger: InventoryLedger<S>,
    timeout: Duration,
}

impl<S: CommerceStore + Clone> CheckoutCoordinator<S> {
    /// Creates a coordinator with the default checkout timeout.
    pub fn new(store: S) -> Self {
        Self::with_timeout(store, DEFAULT_CHECKOUT_TIMEOUT)
    }

    /// Creates a coordinator with an explicit checkout timeout.
    pub fn with_timeout(store: S, timeout: Duration) -> Self {
        Self {
            ledger: InventoryLedger::new(store.clone()),
            store,
            timeout,
        }
    }

    /// Converts a cart's contents into a persisted order.
    ///
    /// All-or-nothing: if any line is short on stock, the declared
    /// total diverges, or the customer has no active cart, nothing is
    /// persisted and the cart keeps its items.
    #[tracing::instrument(skip(self, request), fields(store_id = %request.store_id, customer_id = %request.customer_id))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<PlacedOrder> {
        if request.lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        if let Some(line) = request
            .lines
            .iter()
            .find(|l| !(1..=MAX_LINE_QUANTITY).contains(&l.quantity))
        {
            return Err(DomainError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        metrics::counter!("checkouts_total").increment(1);

        let draft = OrderDraft {
            store_id: request.store_id,
            customer_id: request.customer_id,
            status: request.status,
            declared_total: request.declared_total,
            lines: request.lines,
        };

        let placed = match tokio::time::timeout(self.timeout, self.store.place_order(draft)).await {
            Ok(result) => result.map_err(|e| {
                metrics::counter!("checkouts_failed").increment(1);
                DomainError::from(e)
            })?,
            Err(_elapsed) => {
                metrics::counter!("checkouts_timed_out").increment(1);
                return Err(DomainError::CheckoutTimeout {
                    timeout: self.timeout,
                });
            }
        };

        tracing::info!(order_id = %placed.order_id, total = %placed.total, "order placed");
        Ok(placed)
    }

    /// Side-effect-free stock pre-validation for a prospective
    /// checkout.
    #[tracing::instrument(skip(self, lines))]
    pub async fn validate_stock(&self, store_id: StoreId, lines: &[OrderLine]) -> Result<()> {
        self.ledger.validate(store_id, lines).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{CartId, CartItemId, OrderId, ProductId};
    use storage::{
        CartHandle, CartItemUpsert, CartLineItem, CustomerRecord, DeliveryOutcome, InMemoryStore,
        OrderSummary, ProductRecord, SalesRecord,
    };

    /// A store whose checkout never returns; everything else is off
    /// limits.
    #[derive(Clone, Copy)]
    struct StalledStore;

    #[async_trait]
    impl CommerceStore for StalledStore {
        async fn get_or_create_cart(
            &self,
            _store_id: StoreId,
            _customer_id: CustomerId,
        ) -> storage::Result<CartHandle> {
            unreachable!()
        }

        async fn upsert_cart_item(
            &self,
            _cart_id: CartId,
            _product_id: ProductId,
            _quantity: u32,
        ) -> storage::Result<CartItemUpsert> {
            unreachable!()
        }

        async fn set_cart_item_quantity(
            &self,
            _customer_id: CustomerId,
            _item_id: CartItemId,
            _quantity: u32,
        ) -> storage::Result<()> {
            unreachable!()
        }

        async fn remove_cart_item(
            &self,
            _customer_id: CustomerId,
            _item_id: CartItemId,
        ) -> storage::Result<()> {
            unreachable!()
        }

        async fn active_cart_items(
            &self,
            _store_id: StoreId,
            _customer_id: CustomerId,
        ) -> storage::Result<Vec<CartLineItem>> {
            unreachable!()
        }

        async fn stock_level(
            &self,
            _product_id: ProductId,
            _store_id: StoreId,
        ) -> storage::Result<Option<i64>> {
            unreachable!()
        }

        async fn place_order(&self, _draft: OrderDraft) -> storage::Result<PlacedOrder> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("the checkout timeout should fire first")
        }

        async fn transition_order(
            &self,
            _order_id: OrderId,
            _store_id: StoreId,
            _status: OrderStatus,
        ) -> storage::Result<DeliveryOutcome> {
            unreachable!()
        }

        async fn orders_for_store(
            &self,
            _store_id: StoreId,
        ) -> storage::Result<Vec<OrderSummary>> {
            unreachable!()
        }

        async fn sales_for_store(&self, _store_id: StoreId) -> storage::Result<Vec<SalesRecord>> {
            unreachable!()
        }

        async fn insert_product(&self, _product: ProductRecord) -> storage::Result<()> {
            unreachable!()
        }

        async fn insert_customer(&self, _customer: CustomerRecord) -> storage::Result<()> {
            unreachable!()
        }
    }

    struct Fixture {
        store: InMemoryStore,
        coordinator: CheckoutCoordinator<InMemoryStore>,
        store_id: StoreId,
        customer_id: CustomerId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let store_id = StoreId::new();
        let customer_id = CustomerId::new();
        store
            .insert_customer(CustomerRecord {
                customer_id,
                store_id,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            })
            .await
            .unwrap();
        Fixture {
            coordinator: CheckoutCoordinator::new(store.clone()),
            store,
            store_id,
            customer_id,
        }
    }

    async fn seed_product(fx: &Fixture, price: i64, stock: i64) -> ProductId {
        let product_id = ProductId::new();
        fx.store
            .insert_product(ProductRecord {
                product_id,
                store_id: fx.store_id,
                name: "Widget".to_string(),
                unit_price: Money::from_cents(price),
                image_url: None,
                stock_quantity: stock,
            })
            .await
            .unwrap();
        product_id
    }

    async fn fill_cart(fx: &Fixture, items: &[(ProductId, u32)]) {
        let cart = fx
            .store
            .get_or_create_cart(fx.store_id, fx.customer_id)
            .await
            .unwrap();
        for (product_id, quantity) in items {
            fx.store
                .upsert_cart_item(cart.cart_id, *product_id, *quantity)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn checkout_places_order_and_clears_cart() {
        let fx = fixture().await;
        let product_a = seed_product(&fx, 100, 5).await;
        let product_b = seed_product(&fx, 50, 5).await;
        fill_cart(&fx, &[(product_a, 2), (product_b, 1)]).await;

        let placed = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(250),
                lines: vec![
                    OrderLine {
                        product_id: product_a,
                        quantity: 2,
                    },
                    OrderLine {
                        product_id: product_b,
                        quantity: 1,
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(placed.total, Money::from_cents(250));
        assert_eq!(
            fx.store.stock_level(product_a, fx.store_id).await.unwrap(),
            Some(3)
        );
        assert_eq!(
            fx.store.stock_level(product_b, fx.store_id).await.unwrap(),
            Some(4)
        );
        assert!(fx
            .store
            .active_cart_items(fx.store_id, fx.customer_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn short_stock_aborts_whole_checkout() {
        let fx = fixture().await;
        let product_a = seed_product(&fx, 100, 1).await;
        let product_b = seed_product(&fx, 50, 5).await;
        fill_cart(&fx, &[(product_a, 2), (product_b, 1)]).await;

        let err = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(250),
                lines: vec![
                    OrderLine {
                        product_id: product_a,
                        quantity: 2,
                    },
                    OrderLine {
                        product_id: product_b,
                        quantity: 1,
                    },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock { product_id } if product_id == product_a
        ));
        assert_eq!(
            fx.store.stock_level(product_a, fx.store_id).await.unwrap(),
            Some(1)
        );
        assert_eq!(
            fx.store.stock_level(product_b, fx.store_id).await.unwrap(),
            Some(5)
        );
        assert_eq!(fx.store.order_count().await, 0);
        assert_eq!(
            fx.store
                .active_cart_items(fx.store_id, fx.customer_id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn empty_order_is_rejected() {
        let fx = fixture().await;
        let err = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::zero(),
                lines: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::EmptyOrder));
    }

    #[tokio::test]
    async fn zero_quantity_line_is_rejected() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 100, 5).await;
        let err = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(100),
                lines: vec![OrderLine {
                    product_id,
                    quantity: 0,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { quantity: 0 }));
        assert_eq!(
            fx.store.stock_level(product_id, fx.store_id).await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn oversized_quantity_line_is_rejected() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 100, 5).await;
        fill_cart(&fx, &[(product_id, 1)]).await;

        // Wider than the schema's 32-bit quantity columns; must be
        // rejected up front instead of reaching the store.
        let err = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(100),
                lines: vec![OrderLine {
                    product_id,
                    quantity: u32::MAX,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidQuantity { quantity: u32::MAX }
        ));
        assert_eq!(
            fx.store.stock_level(product_id, fx.store_id).await.unwrap(),
            Some(5)
        );
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn slow_store_hits_the_checkout_timeout() {
        let coordinator = CheckoutCoordinator::with_timeout(StalledStore, Duration::from_millis(5));

        let err = coordinator
            .checkout(CheckoutRequest {
                store_id: StoreId::new(),
                customer_id: CustomerId::new(),
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(100),
                lines: vec![OrderLine {
                    product_id: ProductId::new(),
                    quantity: 1,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CheckoutTimeout { .. }));
    }

    #[tokio::test]
    async fn checkout_without_cart_is_a_contract_violation() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 100, 5).await;

        let err = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(100),
                lines: vec![OrderLine {
                    product_id,
                    quantity: 1,
                }],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NoActiveCart { .. }));
    }

    #[tokio::test]
    async fn divergent_declared_total_is_rejected() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 100, 5).await;
        fill_cart(&fx, &[(product_id, 2)]).await;

        let err = fx
            .coordinator
            .checkout(CheckoutRequest {
                store_id: fx.store_id,
                customer_id: fx.customer_id,
                status: OrderStatus::Processing,
                declared_total: Money::from_cents(199),
                lines: vec![OrderLine {
                    product_id,
                    quantity: 2,
                }],
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, DomainError::TotalMismatch { computed, .. } if computed == Money::from_cents(200))
        );
    }

    #[tokio::test]
    async fn validate_stock_has_no_side_effects() {
        let fx = fixture().await;
        let product_id = seed_product(&fx, 100, 1).await;

        let lines = [OrderLine {
            product_id,
            quantity: 2,
        }];
        let err = fx
            .coordinator
            .validate_stock(fx.store_id, &lines)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(
            fx.store.stock_level(product_id, fx.store_id).await.unwrap(),
            Some(1)
        );
    }
}
