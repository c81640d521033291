//! Material store ledger domain.
//!
//! Business rules for moving material quantities between the POS material
//! shop, the material store and field work, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod alerts;
pub mod analytics;
pub mod balance;
pub mod error;
pub mod field_usage;
pub mod material;
pub mod outcome;
pub mod transaction;

pub use alerts::{DEFAULT_LOW_STOCK_THRESHOLD, LowStockAlert, StockStatus, low_stock_alerts};
pub use analytics::{DailyUsage, MaterialUsage, UsageAnalytics};
pub use balance::{Deduction, MaterialStoreBalance, ensure_positive};
pub use error::{LedgerError, LedgerResult};
pub use field_usage::{FieldMaterial, FieldReportMaterials, FieldUsageLine, FieldUsageOutcome, MaterialsUsed};
pub use material::{MaterialCatalogEntry, MaterialType, PosCatalogMapping};
pub use outcome::{
    BulkTransferLine, BulkTransferOutcome, BulkTransferStatus, OperationResult, ReturnOutcome,
    TransferOutcome,
};
pub use transaction::{
    MaterialStoreTransaction, MovementOptions, NewTransaction, TransactionRecord, TransactionType,
};
