use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;
use tracing::instrument;

use drillstore_core::CatalogItemId;

use super::{AdjusterError, CatalogStockAdjuster};
use crate::store::PostgresLedgerTx;
use crate::store::postgres::map_sqlx_error;

/// Adjusts `catalog_items.stock_quantity` inside the ledger's transaction
/// and records the change in `catalog_stock_adjustments`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCatalogAdjuster;

#[async_trait]
impl CatalogStockAdjuster<PostgresLedgerTx> for PostgresCatalogAdjuster {
    #[instrument(skip(self, tx), fields(catalog_item_id = %catalog_item_id, delta = %delta), err)]
    async fn adjust_stock(
        &self,
        tx: &mut PostgresLedgerTx,
        catalog_item_id: CatalogItemId,
        delta: Decimal,
        reason: &str,
    ) -> Result<Decimal, AdjusterError> {
        let row = sqlx::query(
            r#"
            UPDATE catalog_items
            SET stock_quantity = GREATEST(0, stock_quantity + $2)
            WHERE id = $1
            RETURNING stock_quantity
            "#,
        )
        .bind(catalog_item_id.get())
        .bind(delta)
        .fetch_optional(tx.connection())
        .await
        .map_err(|e| map_sqlx_error("adjust_catalog_stock", e))?
        .ok_or(AdjusterError::UnknownItem(catalog_item_id))?;

        let stock_after: Decimal = row
            .try_get("stock_quantity")
            .map_err(|e| map_sqlx_error("adjust_catalog_stock", e))?;

        sqlx::query(
            r#"
            INSERT INTO catalog_stock_adjustments (catalog_item_id, delta, stock_after, reason)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(catalog_item_id.get())
        .bind(delta)
        .bind(stock_after)
        .bind(reason)
        .execute(tx.connection())
        .await
        .map_err(|e| map_sqlx_error("record_catalog_adjustment", e))?;

        Ok(stock_after)
    }
}
