use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use drillstore_core::FieldReportId;
use drillstore_infra::{AnalyticsFilter, TransactionFilter};
use drillstore_ledger::{BulkTransferLine, MaterialType, MaterialsUsed, MovementOptions, TransactionType};

/// Default analytics window when no dates are given.
pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;

// -------------------------
// Request DTOs
// -------------------------

/// Body of a transfer or a return.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub material_type: String,
    pub quantity: Decimal,
    pub remarks: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
}

impl MovementRequest {
    pub fn options(&self) -> MovementOptions {
        MovementOptions {
            reference_type: self.reference_type.clone(),
            reference_id: self.reference_id.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkTransferRequest {
    #[serde(default)]
    pub transfers: Vec<BulkTransferLine>,
}

#[derive(Debug, Deserialize)]
pub struct FieldUsageRequest {
    pub field_report_id: FieldReportId,
    #[serde(default)]
    pub materials_used: MaterialsUsed,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub material_type: Option<String>,
    pub transaction_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TransactionsQuery {
    /// Blank parameters are ignored; unknown types are rejected.
    pub fn into_filter(self) -> Result<TransactionFilter, String> {
        let material_type = non_blank(self.material_type)
            .map(MaterialType::new)
            .transpose()
            .map_err(|e| e.to_string())?;
        let transaction_type = non_blank(self.transaction_type)
            .map(|t| t.parse::<TransactionType>())
            .transpose()
            .map_err(|e| e.to_string())?;

        Ok(TransactionFilter {
            material_type,
            transaction_type,
            date_from: self.date_from,
            date_to: self.date_to,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AnalyticsQuery {
    /// Without any date the window is the last [`DEFAULT_ANALYTICS_DAYS`] days.
    pub fn into_filter(self) -> AnalyticsFilter {
        if self.date_from.is_none() && self.date_to.is_none() {
            return AnalyticsFilter::last_days(Utc::now().date_naive(), DEFAULT_ANALYTICS_DAYS);
        }
        AnalyticsFilter {
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
