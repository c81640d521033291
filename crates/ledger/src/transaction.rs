use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use drillstore_core::{DomainError, FieldReportId, TransactionId, UserId};

use crate::material::MaterialType;

/// Kind of quantity movement recorded in the transaction log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TransferFromPos,
    UsageInField,
    ReturnToPos,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TransferFromPos => "transfer_from_pos",
            TransactionType::UsageInField => "usage_in_field",
            TransactionType::ReturnToPos => "return_to_pos",
        }
    }

    /// Whether the movement brings stock into the material store.
    pub fn is_inbound(&self) -> bool {
        matches!(self, TransactionType::TransferFromPos)
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_from_pos" => Ok(TransactionType::TransferFromPos),
            "usage_in_field" => Ok(TransactionType::UsageInField),
            "return_to_pos" => Ok(TransactionType::ReturnToPos),
            other => Err(DomainError::validation(format!("unknown transaction type '{other}'"))),
        }
    }
}

/// Caller-supplied context for a transfer or return.
///
/// Unset fields fall back to per-operation defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOptions {
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub remarks: Option<String>,
}

impl MovementOptions {
    pub fn with_remarks(remarks: impl Into<String>) -> Self {
        Self {
            remarks: Some(remarks.into()),
            ..Default::default()
        }
    }
}

/// A transaction log row ready to be appended (no id / timestamp yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub material_type: MaterialType,
    /// Signed: positive for inbound, negative for outbound.
    pub quantity: Decimal,
    /// Snapshot of the unit cost at the time of the movement.
    pub unit_cost: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub field_report_id: Option<FieldReportId>,
    pub performed_by: UserId,
    pub remarks: Option<String>,
}

impl NewTransaction {
    /// Build a log row, signing `quantity` according to the movement direction.
    pub fn movement(
        transaction_type: TransactionType,
        material_type: MaterialType,
        quantity: Decimal,
        unit_cost: Decimal,
        performed_by: UserId,
    ) -> Self {
        let magnitude = quantity.abs();
        let quantity = if transaction_type.is_inbound() { magnitude } else { -magnitude };

        Self {
            transaction_type,
            material_type,
            quantity,
            unit_cost,
            reference_type: None,
            reference_id: None,
            field_report_id: None,
            performed_by,
            remarks: None,
        }
    }

    pub fn with_options(mut self, options: MovementOptions) -> Self {
        self.reference_type = options.reference_type;
        self.reference_id = options.reference_id;
        self.remarks = options.remarks;
        self
    }

    pub fn with_field_report(mut self, field_report_id: FieldReportId) -> Self {
        self.field_report_id = Some(field_report_id);
        self
    }

    pub fn into_stored(self, id: TransactionId, created_at: DateTime<Utc>) -> MaterialStoreTransaction {
        MaterialStoreTransaction {
            id,
            transaction_type: self.transaction_type,
            material_type: self.material_type,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            field_report_id: self.field_report_id,
            performed_by: self.performed_by,
            remarks: self.remarks,
            created_at,
        }
    }
}

/// An appended, immutable transaction log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialStoreTransaction {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub material_type: MaterialType,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub field_report_id: Option<FieldReportId>,
    pub performed_by: UserId,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Transaction log row joined with display data for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub transaction: MaterialStoreTransaction,
    pub performed_by_name: String,
    pub field_report_code: Option<String>,
}

impl TransactionRecord {
    /// Display name used when the user has no username on record.
    pub fn fallback_user_name(user_id: UserId) -> String {
        format!("User {user_id}")
    }
}
