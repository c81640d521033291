//! Low-stock classification over material store balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::MaterialStoreBalance;

/// Default alert threshold, in percent of quantity received.
pub const DEFAULT_LOW_STOCK_THRESHOLD: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// Severity of a low-stock alert, most severe first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Critical,
    Low,
}

impl StockStatus {
    /// Classify one balance against `threshold_percent`.
    ///
    /// Balances that never received anything are not classified.
    pub fn classify(balance: &MaterialStoreBalance, threshold_percent: Decimal) -> Option<Self> {
        let percent = balance.remaining_percent()?;

        if balance.quantity_remaining.is_zero() {
            Some(StockStatus::OutOfStock)
        } else if percent <= threshold_percent / Decimal::TWO {
            Some(StockStatus::Critical)
        } else if percent <= threshold_percent {
            Some(StockStatus::Low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    #[serde(flatten)]
    pub balance: MaterialStoreBalance,
    pub stock_status: StockStatus,
    pub remaining_percent: Decimal,
}

/// Alerts for every balance at or below the threshold, sorted by severity
/// then by ascending remaining quantity.
pub fn low_stock_alerts(
    balances: impl IntoIterator<Item = MaterialStoreBalance>,
    threshold_percent: Decimal,
) -> Vec<LowStockAlert> {
    let mut alerts: Vec<LowStockAlert> = balances
        .into_iter()
        .filter_map(|balance| {
            let stock_status = StockStatus::classify(&balance, threshold_percent)?;
            let remaining_percent = balance.remaining_percent().unwrap_or(Decimal::ZERO);
            Some(LowStockAlert {
                balance,
                stock_status,
                remaining_percent,
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.stock_status
            .cmp(&b.stock_status)
            .then_with(|| a.balance.quantity_remaining.cmp(&b.balance.quantity_remaining))
    });
    alerts
}
