use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use common::{CartId, CartItemId, CustomerId, Money, OrderId, OrderStatus, ProductId, StoreId};

use crate::store::CommerceStore;
use crate::types::{
    CartHandle, CartItemUpsert, CartLineItem, CartStatus, CustomerContact, CustomerRecord,
    DeliveryOutcome, OrderDraft, OrderSummary, PlacedOrder, ProductRecord, SalesRecord,
};
use crate::{Result, StorageError};

/// PostgreSQL-backed commerce store.
///
/// Checkout and delivery run inside a single transaction; the stock
/// decrement is a conditional `UPDATE ... WHERE stock_quantity >= $qty`
/// so two concurrent checkouts can never both decrement past zero.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL commerce store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Reads a cart's lifecycle status, or None if the cart does not
    /// exist. Test support; the API surface never needs it.
    pub async fn cart_status(&self, cart_id: CartId) -> Result<Option<CartStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM carts WHERE cart_id = $1")
                .bind(cart_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match status {
            Some(value) => CartStatus::parse(&value)
                .map(Some)
                .ok_or(StorageError::UnknownStatus { value }),
            None => Ok(None),
        }
    }

    fn parse_status(value: String) -> Result<OrderStatus> {
        value
            .parse()
            .map_err(|_| StorageError::UnknownStatus { value })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLineItem> {
        Ok(CartLineItem {
            item_id: CartItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("price_cents")?),
            image_url: row.try_get("image_url")?,
        })
    }
}

#[async_trait]
impl CommerceStore for PostgresStore {
    async fn get_or_create_cart(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<CartHandle> {
        // Single upsert so concurrent opens for the same pair cannot
        // insert duplicate rows; the unique (store_id, customer_id)
        // constraint arbitrates.
        let fresh_id = CartId::new();
        let returned: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO carts (cart_id, store_id, customer_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', now(), now())
            ON CONFLICT (store_id, customer_id)
            DO UPDATE SET status = 'active', updated_at = now()
            RETURNING cart_id
            "#,
        )
        .bind(fresh_id.as_uuid())
        .bind(store_id.as_uuid())
        .bind(customer_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(CartHandle {
            cart_id: CartId::from_uuid(returned),
            created: returned == fresh_id.as_uuid(),
        })
    }

    async fn upsert_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItemUpsert> {
        let fresh_id = CartItemId::new();
        let returned: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO cart_items (item_id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING item_id
            "#,
        )
        .bind(fresh_id.as_uuid())
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_one(&self.pool)
        .await?;

        Ok(CartItemUpsert {
            item_id: CartItemId::from_uuid(returned),
            created: returned == fresh_id.as_uuid(),
        })
    }

    async fn set_cart_item_quantity(
        &self,
        customer_id: CustomerId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<()> {
        // The carts join scopes the write to the caller's own carts; a
        // foreign line simply matches no rows.
        sqlx::query(
            r#"
            UPDATE cart_items ci
            SET quantity = $1
            FROM carts c
            WHERE ci.item_id = $2 AND ci.cart_id = c.cart_id AND c.customer_id = $3
            "#,
        )
        .bind(i64::from(quantity))
        .bind(item_id.as_uuid())
        .bind(customer_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_cart_item(&self, customer_id: CustomerId, item_id: CartItemId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM cart_items ci
            USING carts c
            WHERE ci.item_id = $1 AND ci.cart_id = c.cart_id AND c.customer_id = $2
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(customer_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_cart_items(
        &self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<Vec<CartLineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.item_id, ci.product_id, ci.quantity,
                   p.product_name AS name, p.price_cents, p.image_url
            FROM carts c
            JOIN cart_items ci ON c.cart_id = ci.cart_id
            JOIN products p ON ci.product_id = p.product_id
            WHERE c.store_id = $1 AND c.customer_id = $2 AND c.status = 'active'
            "#,
        )
        .bind(store_id.as_uuid())
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_line).collect()
    }

    async fn stock_level(&self, product_id: ProductId, store_id: StoreId) -> Result<Option<i64>> {
        let stock: Option<i32> = sqlx::query_scalar(
            "SELECT stock_quantity FROM products WHERE product_id = $1 AND store_id = $2",
        )
        .bind(product_id.as_uuid())
        .bind(store_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock.map(i64::from))
    }

    async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder> {
        let mut tx = self.pool.begin().await?;

        // Fused check-and-decrement: zero affected rows means the
        // product is missing or short on stock. An early return drops
        // the transaction and rolls everything back. The quantity binds
        // as BIGINT so a value wider than i32 can never wrap negative
        // and defeat the stock guard.
        let mut computed_total = Money::zero();
        for line in &draft.lines {
            let price: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $1, updated_at = now()
                WHERE product_id = $2 AND store_id = $3 AND stock_quantity >= $1
                RETURNING price_cents
                "#,
            )
            .bind(i64::from(line.quantity))
            .bind(line.product_id.as_uuid())
            .bind(draft.store_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;

            let Some(price_cents) = price else {
                return Err(StorageError::InsufficientStock {
                    product_id: line.product_id,
                });
            };
            computed_total += Money::from_cents(price_cents).multiply(line.quantity);
        }

        if computed_total != draft.declared_total {
            return Err(StorageError::TotalMismatch {
                declared: draft.declared_total,
                computed: computed_total,
            });
        }

        let order_id = OrderId::new();
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, customer_id, date_ordered, status, total_amount_cents)
            VALUES ($1, $2, now(), $3, $4)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(draft.customer_id.as_uuid())
        .bind(draft.status.as_str())
        .bind(computed_total.cents())
        .execute(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_item_id, order_id, product_id, quantity, store_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(draft.store_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        let cart_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT cart_id FROM carts
            WHERE customer_id = $1 AND store_id = $2 AND status = 'active'
            FOR UPDATE
            "#,
        )
        .bind(draft.customer_id.as_uuid())
        .bind(draft.store_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(cart_id) = cart_id else {
            return Err(StorageError::NoActiveCart {
                store_id: draft.store_id,
                customer_id: draft.customer_id,
            });
        };

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE carts SET status = 'completed', updated_at = now() WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

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
        let mut tx = self.pool.begin().await?;

        // Ownership check and current status in one locked read; a miss
        // means the order belongs to a different store (or nobody).
        let current: Option<String> = sqlx::query_scalar(
            r#"
            SELECT o.status
            FROM orders o
            JOIN customers c ON o.customer_id = c.customer_id
            WHERE o.order_id = $1 AND c.store_id = $2
            FOR UPDATE OF o
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(store_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Err(StorageError::OrderNotForStore { order_id, store_id });
        };
        let from = Self::parse_status(current)?;

        if !from.can_transition_to(status) {
            return Err(StorageError::InvalidTransition { from, to: status });
        }

        sqlx::query("UPDATE orders SET status = $1 WHERE order_id = $2")
            .bind(status.as_str())
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        if status != OrderStatus::Delivered {
            tx.commit().await?;
            return Ok(DeliveryOutcome {
                order_id,
                status,
                sales_recorded: 0,
                contact: None,
            });
        }

        let lines = sqlx::query(
            r#"
            SELECT oi.product_id, oi.quantity, p.price_cents,
                   o.customer_id, o.date_ordered
            FROM order_items oi
            JOIN orders o ON oi.order_id = o.order_id
            JOIN products p ON oi.product_id = p.product_id
            WHERE oi.order_id = $1 AND oi.store_id = $2
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(store_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        for row in &lines {
            let quantity: i32 = row.try_get("quantity")?;
            let unit_price = Money::from_cents(row.try_get("price_cents")?);
            sqlx::query(
                r#"
                INSERT INTO sales (sale_id, sale_date, sale_type, product_id,
                                   quantity_sold, unit_price_cents, total_sale_cents,
                                   store_id, customer_id)
                VALUES ($1, $2, 'online', $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.try_get::<DateTime<Utc>, _>("date_ordered")?)
            .bind(row.try_get::<Uuid, _>("product_id")?)
            .bind(quantity)
            .bind(unit_price.cents())
            .bind(unit_price.multiply(quantity as u32).cents())
            .bind(store_id.as_uuid())
            .bind(row.try_get::<Uuid, _>("customer_id")?)
            .execute(&mut *tx)
            .await?;
        }

        let contact = sqlx::query(
            r#"
            SELECT c.customer_id, c.customer_name, c.email
            FROM orders o
            JOIN customers c ON o.customer_id = c.customer_id
            WHERE o.order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| -> Result<CustomerContact> {
            Ok(CustomerContact {
                customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
                name: row.try_get("customer_name")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()?;

        tx.commit().await?;

        Ok(DeliveryOutcome {
            order_id,
            status,
            sales_recorded: lines.len(),
            contact,
        })
    }

    async fn orders_for_store(&self, store_id: StoreId) -> Result<Vec<OrderSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT o.order_id, o.date_ordered, o.total_amount_cents, o.status, c.customer_name
            FROM orders o
            JOIN customers c ON o.customer_id = c.customer_id
            WHERE c.store_id = $1
            ORDER BY o.date_ordered DESC
            "#,
        )
        .bind(store_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderSummary {
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    date_ordered: row.try_get("date_ordered")?,
                    total: Money::from_cents(row.try_get("total_amount_cents")?),
                    status: Self::parse_status(row.try_get("status")?)?,
                    customer_name: row.try_get("customer_name")?,
                })
            })
            .collect()
    }

    async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<SalesRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT sale_date, sale_type, product_id, quantity_sold,
                   unit_price_cents, total_sale_cents, store_id, customer_id
            FROM sales
            WHERE store_id = $1
            ORDER BY sale_date ASC
            "#,
        )
        .bind(store_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(SalesRecord {
                    sale_date: row.try_get("sale_date")?,
                    sale_type: row.try_get("sale_type")?,
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity_sold")? as u32,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                    total: Money::from_cents(row.try_get("total_sale_cents")?),
                    store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
                    customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
                })
            })
            .collect()
    }

    async fn insert_product(&self, product: ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, store_id, product_name, price_cents,
                                  image_url, stock_quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            "#,
        )
        .bind(product.product_id.as_uuid())
        .bind(product.store_id.as_uuid())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(&product.image_url)
        .bind(product.stock_quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_customer(&self, customer: CustomerRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, store_id, customer_name, email)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(customer.customer_id.as_uuid())
        .bind(customer.store_id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
