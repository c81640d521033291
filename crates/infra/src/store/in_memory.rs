use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use drillstore_core::{AggregateRoot, CatalogItemId, ExpectedVersion, FieldReportId, TransactionId, UserId};
use drillstore_ledger::{
    FieldReportMaterials, MaterialCatalogEntry, MaterialStoreBalance, MaterialStoreTransaction,
    MaterialType, NewTransaction, TransactionRecord, UsageAnalytics,
};

use super::query::{AnalyticsFilter, TRANSACTION_QUERY_LIMIT, TransactionFilter};
use super::r#trait::{LedgerStore, LedgerTx, StoreError};
use crate::catalog::CatalogStockAdjustment;

/// A field report as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldReportRow {
    pub(crate) report_code: String,
    pub(crate) materials: FieldReportMaterials,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LedgerState {
    pub(crate) materials: BTreeMap<MaterialType, MaterialCatalogEntry>,
    pub(crate) mappings: BTreeMap<MaterialType, CatalogItemId>,
    pub(crate) balances: BTreeMap<MaterialType, MaterialStoreBalance>,
    pub(crate) transactions: Vec<MaterialStoreTransaction>,
    pub(crate) users: HashMap<UserId, String>,
    pub(crate) field_reports: HashMap<FieldReportId, FieldReportRow>,
    pub(crate) catalog_stock: BTreeMap<CatalogItemId, Decimal>,
    pub(crate) catalog_adjustments: Vec<CatalogStockAdjustment>,
    next_transaction_id: i64,
    fail_transaction_log: bool,
}

impl LedgerState {
    fn record(&self, t: &MaterialStoreTransaction) -> TransactionRecord {
        let performed_by_name = self
            .users
            .get(&t.performed_by)
            .cloned()
            .unwrap_or_else(|| TransactionRecord::fallback_user_name(t.performed_by));
        let field_report_code = t
            .field_report_id
            .and_then(|id| self.field_reports.get(&id))
            .map(|r| r.report_code.clone());

        TransactionRecord {
            transaction: t.clone(),
            performed_by_name,
            field_report_code,
        }
    }
}

/// In-memory material store ledger.
///
/// Intended for tests/dev. Units of work are serialised: `begin` waits until
/// the previous unit of work is committed or dropped, and each one works on
/// a private copy of the state that replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_material(&self, entry: MaterialCatalogEntry) {
        let mut state = self.state.lock().await;
        state.materials.insert(entry.material_type.clone(), entry);
    }

    pub async fn seed_pos_mapping(&self, material_type: MaterialType, catalog_item_id: CatalogItemId) {
        self.state.lock().await.mappings.insert(material_type, catalog_item_id);
    }

    pub async fn seed_catalog_item(&self, catalog_item_id: CatalogItemId, stock: Decimal) {
        self.state.lock().await.catalog_stock.insert(catalog_item_id, stock);
    }

    pub async fn seed_user(&self, user_id: UserId, username: impl Into<String>) {
        self.state.lock().await.users.insert(user_id, username.into());
    }

    pub async fn seed_field_report(&self, field_report_id: FieldReportId, report_code: impl Into<String>) {
        self.state.lock().await.field_reports.insert(
            field_report_id,
            FieldReportRow {
                report_code: report_code.into(),
                materials: FieldReportMaterials::default(),
            },
        );
    }

    /// Append a log row with an explicit timestamp, bypassing any unit of work.
    pub async fn seed_transaction(&self, row: NewTransaction, created_at: DateTime<Utc>) -> TransactionId {
        let mut state = self.state.lock().await;
        state.next_transaction_id += 1;
        let id = TransactionId::new(state.next_transaction_id);
        state.transactions.push(row.into_stored(id, created_at));
        id
    }

    /// Make every subsequent log append fail (balance writes still succeed).
    pub async fn fail_transaction_log(&self, fail: bool) {
        self.state.lock().await.fail_transaction_log = fail;
    }

    pub async fn catalog_stock(&self, catalog_item_id: CatalogItemId) -> Option<Decimal> {
        self.state.lock().await.catalog_stock.get(&catalog_item_id).copied()
    }

    pub async fn catalog_adjustments(&self) -> Vec<CatalogStockAdjustment> {
        self.state.lock().await.catalog_adjustments.clone()
    }

    pub async fn field_report(&self, field_report_id: FieldReportId) -> Option<FieldReportMaterials> {
        self.state
            .lock()
            .await
            .field_reports
            .get(&field_report_id)
            .map(|r| r.materials.clone())
    }

    /// Every committed log row, oldest first.
    pub async fn transactions(&self) -> Vec<MaterialStoreTransaction> {
        self.state.lock().await.transactions.clone()
    }
}

/// Unit of work over [`InMemoryLedgerStore`].
pub struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

impl InMemoryLedgerTx {
    pub(crate) fn state_mut(&mut self) -> &mut LedgerState {
        &mut self.working
    }
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn material(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialCatalogEntry>, StoreError> {
        Ok(self.working.materials.get(material_type).cloned())
    }

    async fn pos_mapping(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<CatalogItemId>, StoreError> {
        Ok(self.working.mappings.get(material_type).copied())
    }

    async fn balance_for_update(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError> {
        Ok(self.working.balances.get(material_type).cloned())
    }

    async fn insert_balance(&mut self, balance: &MaterialStoreBalance) -> Result<(), StoreError> {
        if self.working.balances.contains_key(&balance.material_type) {
            return Err(StoreError::Conflict(format!(
                "balance for '{}' already exists",
                balance.material_type
            )));
        }
        self.working
            .balances
            .insert(balance.material_type.clone(), balance.clone());
        Ok(())
    }

    async fn update_balance(
        &mut self,
        balance: &MaterialStoreBalance,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let stored = self
            .working
            .balances
            .get_mut(balance.id())
            .ok_or_else(|| StoreError::Conflict(format!("balance for '{}' vanished", balance.material_type)))?;

        expected
            .check(stored.version)
            .map_err(|e| StoreError::Conflict(format!("balance '{}': {e}", balance.material_type)))?;

        *stored = balance.clone();
        Ok(())
    }

    async fn append_transaction(&mut self, row: &NewTransaction) -> Result<TransactionId, StoreError> {
        if self.working.fail_transaction_log {
            return Err(StoreError::Database(
                "material_store_transactions is not writable".to_string(),
            ));
        }

        self.working.next_transaction_id += 1;
        let id = TransactionId::new(self.working.next_transaction_id);
        self.working.transactions.push(row.clone().into_stored(id, Utc::now()));
        Ok(id)
    }

    async fn update_field_report(
        &mut self,
        field_report_id: FieldReportId,
        materials: &FieldReportMaterials,
    ) -> Result<bool, StoreError> {
        match self.working.field_reports.get_mut(&field_report_id) {
            Some(report) => {
                report.materials = materials.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryLedgerTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Tx = InMemoryLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryLedgerTx { guard, working })
    }

    async fn list_balances(&self) -> Result<Vec<MaterialStoreBalance>, StoreError> {
        Ok(self.state.lock().await.balances.values().cloned().collect())
    }

    async fn get_balance(
        &self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError> {
        Ok(self.state.lock().await.balances.get(material_type).cloned())
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.state.lock().await;

        let mut rows: Vec<&MaterialStoreTransaction> =
            state.transactions.iter().filter(|t| filter.matches(t)).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(rows
            .into_iter()
            .take(TRANSACTION_QUERY_LIMIT)
            .map(|t| state.record(t))
            .collect())
    }

    async fn usage_analytics(&self, filter: &AnalyticsFilter) -> Result<UsageAnalytics, StoreError> {
        let state = self.state.lock().await;
        Ok(UsageAnalytics::from_transactions(
            state.transactions.iter().filter(|t| filter.matches(t)),
        ))
    }
}
