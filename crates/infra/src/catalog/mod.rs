//! Catalog Stock Adjuster boundary.
//!
//! The POS catalog owns its stock counts; the ledger only asks it to apply a
//! signed delta inside the ledger's unit of work. Adjusters clamp at zero and
//! write their own audit row.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use drillstore_core::CatalogItemId;
use drillstore_ledger::LedgerError;

use crate::store::StoreError;

pub use in_memory::InMemoryCatalogAdjuster;
pub use postgres::PostgresCatalogAdjuster;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdjusterError {
    #[error("catalog item {0} not found")]
    UnknownItem(CatalogItemId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AdjusterError> for LedgerError {
    fn from(err: AdjusterError) -> Self {
        match err {
            AdjusterError::UnknownItem(_) => LedgerError::CatalogAdjustment(err.to_string()),
            AdjusterError::Store(e) => e.into(),
        }
    }
}

/// Audit row written for every applied adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStockAdjustment {
    pub catalog_item_id: CatalogItemId,
    pub delta: Decimal,
    pub stock_after: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Applies `GREATEST(0, stock + delta)` to a catalog item within the
/// caller's unit of work `Tx`.
#[async_trait]
pub trait CatalogStockAdjuster<Tx: Send>: Send + Sync {
    /// Returns the stock level after the adjustment.
    async fn adjust_stock(
        &self,
        tx: &mut Tx,
        catalog_item_id: CatalogItemId,
        delta: Decimal,
        reason: &str,
    ) -> Result<Decimal, AdjusterError>;
}

#[async_trait]
impl<Tx, A> CatalogStockAdjuster<Tx> for Arc<A>
where
    Tx: Send,
    A: CatalogStockAdjuster<Tx> + ?Sized,
{
    async fn adjust_stock(
        &self,
        tx: &mut Tx,
        catalog_item_id: CatalogItemId,
        delta: Decimal,
        reason: &str,
    ) -> Result<Decimal, AdjusterError> {
        (**self).adjust_stock(tx, catalog_item_id, delta, reason).await
    }
}

/// Stock after applying `delta`, clamped at zero (and saturating at the top).
pub fn clamped_stock(current: Decimal, delta: Decimal) -> Decimal {
    current.saturating_add(delta).max(Decimal::ZERO)
}
