//! Inventory ledger: read-only stock checks.
//!
//! The decrement itself happens only inside the checkout transaction
//! (a conditional update in the store), so this service never mutates
//! stock.

use common::{ProductId, StoreId};
use storage::{CommerceStore, OrderLine};

use crate::error::{DomainError, Result};

/// Result of a single stock check.
#[derive(Debug, Clone, Copy)]
pub struct StockCheck {
    /// True if the available stock covers the requested quantity.
    pub sufficient: bool,
    /// Currently available stock; zero for an unknown product.
    pub available: i64,
}

/// Read-only view over per-product, per-store stock counts.
pub struct InventoryLedger<S: CommerceStore> {
    store: S,
}

impl<S: CommerceStore> InventoryLedger<S> {
    /// Creates a new inventory ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Checks whether a store has enough stock of a product. A product
    /// missing from the store reports zero availability.
    #[tracing::instrument(skip(self))]
    pub async fn check_stock(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        requested: u32,
    ) -> Result<StockCheck> {
        let available = self
            .store
            .stock_level(product_id, store_id)
            .await?
            .unwrap_or(0);
        Ok(StockCheck {
            sufficient: available >= i64::from(requested),
            available,
        })
    }

    /// Pre-flights a set of order lines without side effects; the first
    /// insufficient line aborts with `InsufficientStock` naming the
    /// product.
    #[tracing::instrument(skip(self, lines))]
    pub async fn validate(&self, store_id: StoreId, lines: &[OrderLine]) -> Result<()> {
        for line in lines {
            let check = self
                .check_stock(line.product_id, store_id, line.quantity)
                .await?;
            if !check.sufficient {
                return Err(DomainError::InsufficientStock {
                    product_id: line.product_id,
                });
            }
        }
        Ok(())
    }
}
