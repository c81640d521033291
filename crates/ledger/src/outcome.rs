//! Caller-facing result shapes.
//!
//! Every mutating ledger operation reports through [`OperationResult`]:
//! `{ "success": bool, ...fields, "error"?: string, "error_code"?: string }`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::material::MaterialType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn failed(err: &LedgerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            error_code: Some(err.code()),
        }
    }

    /// Failure that still carries operation data (e.g. per-line batch errors).
    pub fn failed_with(data: T, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message.into()),
            error_code: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T> From<Result<T, LedgerError>> for OperationResult<T> {
    fn from(result: Result<T, LedgerError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(&e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub material_type: MaterialType,
    pub quantity_transferred: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOutcome {
    pub material_type: MaterialType,
    pub quantity_returned: Decimal,
}

/// One requested line of a bulk transfer (unvalidated caller input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkTransferLine {
    #[serde(default)]
    pub material_type: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl BulkTransferLine {
    pub fn new(material_type: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            material_type: material_type.into(),
            quantity,
            remarks: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkTransferStatus {
    /// Every line succeeded.
    Completed,
    /// Some lines failed; the successful ones were committed.
    Partial,
    /// Every line failed; nothing was committed.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkTransferOutcome {
    pub status: BulkTransferStatus,
    pub transferred: usize,
    pub results: Vec<TransferOutcome>,
    pub errors: Vec<String>,
}
