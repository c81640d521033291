use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use drillstore_core::CatalogItemId;

use super::{AdjusterError, CatalogStockAdjuster, CatalogStockAdjustment, clamped_stock};
use crate::store::InMemoryLedgerTx;

/// Adjusts the catalog stock held by [`crate::store::InMemoryLedgerStore`].
///
/// Changes are staged in the unit of work and vanish on rollback.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryCatalogAdjuster;

#[async_trait]
impl CatalogStockAdjuster<InMemoryLedgerTx> for InMemoryCatalogAdjuster {
    async fn adjust_stock(
        &self,
        tx: &mut InMemoryLedgerTx,
        catalog_item_id: CatalogItemId,
        delta: Decimal,
        reason: &str,
    ) -> Result<Decimal, AdjusterError> {
        let state = tx.state_mut();
        let stock = state
            .catalog_stock
            .get_mut(&catalog_item_id)
            .ok_or(AdjusterError::UnknownItem(catalog_item_id))?;

        *stock = clamped_stock(*stock, delta);
        let stock_after = *stock;

        state.catalog_adjustments.push(CatalogStockAdjustment {
            catalog_item_id,
            delta,
            stock_after,
            reason: reason.to_string(),
            created_at: Utc::now(),
        });

        Ok(stock_after)
    }
}
