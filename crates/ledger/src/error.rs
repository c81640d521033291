//! Ledger error taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;

use drillstore_core::DomainError;

use crate::material::MaterialType;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failure of a ledger operation.
///
/// Business failures (`MaterialNotFound`, `MaterialNotAvailable`,
/// `InsufficientStock`, `InvalidQuantity`, `Overflow`) roll back the enclosing unit of
/// work. `TransactionLog` is never returned to callers: it is logged and the
/// balance mutation it describes is kept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("material type '{0}' not found")]
    MaterialNotFound(MaterialType),

    #[error("material '{0}' not available in material store")]
    MaterialNotAvailable(MaterialType),

    #[error("insufficient {material} in material store (available: {available}, required: {requested})")]
    InsufficientStock {
        material: MaterialType,
        available: Decimal,
        requested: Decimal,
    },

    #[error("quantity must be positive (got {0})")]
    InvalidQuantity(Decimal),

    /// A counter or value would leave the decimal range.
    #[error("quantity too large: {0} would overflow")]
    Overflow(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("concurrent update detected: {0}")]
    Conflict(String),

    #[error("catalog stock adjustment failed: {0}")]
    CatalogAdjustment(String),

    #[error("transaction log write failed: {0}")]
    TransactionLog(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Stable machine-readable code, surfaced as `error_code` in results.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::MaterialNotFound(_) => "material_not_found",
            LedgerError::MaterialNotAvailable(_) => "material_not_available",
            LedgerError::InsufficientStock { .. } => "insufficient_stock",
            LedgerError::InvalidQuantity(_) => "invalid_quantity",
            LedgerError::Overflow(_) => "overflow",
            LedgerError::Domain(_) => "invalid_request",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::CatalogAdjustment(_) => "catalog_adjustment",
            LedgerError::TransactionLog(_) => "transaction_log",
            LedgerError::Storage(_) => "storage",
        }
    }

    /// Whether the failure is a business-rule violation (as opposed to an
    /// infrastructure failure that leaves the unit of work unusable).
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            LedgerError::MaterialNotFound(_)
                | LedgerError::MaterialNotAvailable(_)
                | LedgerError::InsufficientStock { .. }
                | LedgerError::InvalidQuantity(_)
                | LedgerError::Overflow(_)
                | LedgerError::Domain(_)
                | LedgerError::CatalogAdjustment(_)
        )
    }
}
