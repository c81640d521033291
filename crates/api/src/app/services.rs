//! Backend wiring: picks the in-memory or Postgres ledger and exposes one
//! facade to the route handlers.
//!
//! ```text
//! AppConfig.database_url ──► Some ──► connect + migrate ──► Postgres backend
//!                        └─► None ──► seeded in-memory store ──► InMemory backend
//! ```

use rust_decimal::Decimal;
use sqlx::PgPool;

use drillstore_core::{FieldReportId, UserId};
use drillstore_infra::{
    AnalyticsFilter, AppConfig, InMemoryCatalogAdjuster, InMemoryLedgerStore,
    InMemoryMaterialStoreService, MaterialStoreService, PostgresCatalogAdjuster,
    PostgresLedgerStore, PostgresMaterialStoreService, StoreError, TransactionFilter, schema,
};
use drillstore_ledger::{
    BulkTransferLine, BulkTransferOutcome, FieldMaterial, FieldUsageOutcome, LedgerResult, LowStockAlert,
    MaterialCatalogEntry, MaterialStoreBalance, MaterialsUsed, MovementOptions,
    OperationResult, ReturnOutcome, TransactionRecord, TransferOutcome, UsageAnalytics,
};

/// The concrete ledger behind the API.
pub enum LedgerBackend {
    InMemory(InMemoryMaterialStoreService),
    Postgres(PostgresMaterialStoreService),
}

pub struct AppServices {
    backend: LedgerBackend,
    low_stock_threshold: Decimal,
}

macro_rules! with_service {
    ($self:expr, $svc:ident => $body:expr) => {
        match &$self.backend {
            LedgerBackend::InMemory($svc) => $body,
            LedgerBackend::Postgres($svc) => $body,
        }
    };
}

impl AppServices {
    pub fn in_memory(store: InMemoryLedgerStore, low_stock_threshold: Decimal) -> Self {
        Self {
            backend: LedgerBackend::InMemory(MaterialStoreService::new(store, InMemoryCatalogAdjuster)),
            low_stock_threshold,
        }
    }

    pub fn postgres(pool: PgPool, low_stock_threshold: Decimal) -> Self {
        Self {
            backend: LedgerBackend::Postgres(MaterialStoreService::new(
                PostgresLedgerStore::new(pool),
                PostgresCatalogAdjuster,
            )),
            low_stock_threshold,
        }
    }

    /// Postgres when a database URL is configured (schema bootstrapped),
    /// otherwise an in-memory store seeded with the field materials.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match &config.database_url {
            Some(url) => {
                let pool = schema::connect(url, config.max_connections).await?;
                Ok(Self::postgres(pool, config.low_stock_threshold))
            }
            None => {
                let store = InMemoryLedgerStore::new();
                seed_field_materials(&store).await;
                Ok(Self::in_memory(store, config.low_stock_threshold))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            LedgerBackend::InMemory(_) => "in_memory",
            LedgerBackend::Postgres(_) => "postgres",
        }
    }

    /// Threshold used when a low-stock request does not name one.
    pub fn low_stock_threshold(&self) -> Decimal {
        self.low_stock_threshold
    }

    pub async fn transfer_from_pos(
        &self,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> OperationResult<TransferOutcome> {
        with_service!(self, svc => svc.transfer_from_pos(material_type, quantity, performed_by, options).await)
    }

    pub async fn return_to_pos(
        &self,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> OperationResult<ReturnOutcome> {
        with_service!(self, svc => svc.return_to_pos(material_type, quantity, performed_by, options).await)
    }

    pub async fn bulk_transfer_from_pos(
        &self,
        lines: &[BulkTransferLine],
        performed_by: UserId,
    ) -> OperationResult<BulkTransferOutcome> {
        with_service!(self, svc => svc.bulk_transfer_from_pos(lines, performed_by).await)
    }

    pub async fn use_in_field_work(
        &self,
        field_report_id: FieldReportId,
        materials_used: &MaterialsUsed,
        performed_by: UserId,
    ) -> OperationResult<FieldUsageOutcome> {
        with_service!(self, svc => svc.use_in_field_work(field_report_id, materials_used, performed_by).await)
    }

    pub async fn get_store_inventory(&self) -> LedgerResult<Vec<MaterialStoreBalance>> {
        with_service!(self, svc => svc.get_store_inventory().await)
    }

    pub async fn get_material_stock(&self, material_type: &str) -> LedgerResult<Option<MaterialStoreBalance>> {
        with_service!(self, svc => svc.get_material_stock(material_type).await)
    }

    pub async fn get_transactions(&self, filter: &TransactionFilter) -> LedgerResult<Vec<TransactionRecord>> {
        with_service!(self, svc => svc.get_transactions(filter).await)
    }

    pub async fn get_low_stock_alerts(&self, threshold_percent: Decimal) -> LedgerResult<Vec<LowStockAlert>> {
        with_service!(self, svc => svc.get_low_stock_alerts(threshold_percent).await)
    }

    pub async fn get_usage_analytics(&self, filter: &AnalyticsFilter) -> LedgerResult<UsageAnalytics> {
        with_service!(self, svc => svc.get_usage_analytics(filter).await)
    }
}

/// Catalog entries for the three field materials (dev mode only).
pub async fn seed_field_materials(store: &InMemoryLedgerStore) {
    for material in FieldMaterial::ALL {
        let (material_name, unit_cost) = match material {
            FieldMaterial::ScreenPipe => ("Screen Pipe", Decimal::new(1500, 2)),
            FieldMaterial::PlainPipe => ("Plain Pipe", Decimal::new(1000, 2)),
            FieldMaterial::Gravel => ("Gravel", Decimal::new(200, 2)),
        };
        store
            .seed_material(MaterialCatalogEntry {
                material_type: material.material_type(),
                material_name: material_name.to_string(),
                unit_cost,
            })
            .await;
    }
}
