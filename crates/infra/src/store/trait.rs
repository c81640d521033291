use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use drillstore_core::{CatalogItemId, ExpectedVersion, FieldReportId, TransactionId};
use drillstore_ledger::{
    FieldReportMaterials, LedgerError, MaterialCatalogEntry, MaterialStoreBalance, MaterialType,
    NewTransaction, TransactionRecord, UsageAnalytics,
};

use super::query::{AnalyticsFilter, TransactionFilter};

/// Store operation error.
///
/// Infrastructure failures only; business rules live in the ledger domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Compare-and-swap lost (stale `version`, or a concurrent first insert).
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

/// Open unit of work.
///
/// Dropping a unit of work without calling [`LedgerTx::commit`] discards
/// everything written through it.
#[async_trait]
pub trait LedgerTx: Send {
    /// Catalog reference data for a material type.
    async fn material(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialCatalogEntry>, StoreError>;

    /// POS catalog item mapped to a material type, if any.
    async fn pos_mapping(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<CatalogItemId>, StoreError>;

    /// Balance row for a material type, locked for the rest of the unit of work.
    async fn balance_for_update(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError>;

    /// Create a balance row. Fails with `Conflict` if one already exists.
    async fn insert_balance(&mut self, balance: &MaterialStoreBalance) -> Result<(), StoreError>;

    /// Overwrite a balance row if its stored version still matches `expected`.
    async fn update_balance(
        &mut self,
        balance: &MaterialStoreBalance,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// Append one log row.
    ///
    /// A failure here leaves the rest of the unit of work usable.
    async fn append_transaction(&mut self, row: &NewTransaction) -> Result<TransactionId, StoreError>;

    /// Write the material columns of a field report. Returns `false` when the
    /// report does not exist.
    async fn update_field_report(
        &mut self,
        field_report_id: FieldReportId,
        materials: &FieldReportMaterials,
    ) -> Result<bool, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Material store persistence.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// All balances, ordered by material type.
    async fn list_balances(&self) -> Result<Vec<MaterialStoreBalance>, StoreError>;

    async fn get_balance(
        &self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError>;

    /// Filtered log rows, newest first, capped at
    /// [`super::TRANSACTION_QUERY_LIMIT`].
    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    async fn usage_analytics(&self, filter: &AnalyticsFilter) -> Result<UsageAnalytics, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }

    async fn list_balances(&self) -> Result<Vec<MaterialStoreBalance>, StoreError> {
        (**self).list_balances().await
    }

    async fn get_balance(
        &self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError> {
        (**self).get_balance(material_type).await
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        (**self).query_transactions(filter).await
    }

    async fn usage_analytics(&self, filter: &AnalyticsFilter) -> Result<UsageAnalytics, StoreError> {
        (**self).usage_analytics(filter).await
    }
}
