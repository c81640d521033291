//! Usage analytics over the transaction log.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::material::MaterialType;
use crate::transaction::{MaterialStoreTransaction, TransactionType};

/// Number of most recent days reported in the daily view.
pub const DAILY_WINDOW_DAYS: usize = 30;

/// Per-material totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialUsage {
    pub material_type: MaterialType,
    pub total_used: Decimal,
    pub total_received: Decimal,
    pub total_returned: Decimal,
    pub usage_count: u64,
    pub transfer_count: u64,
}

/// Per-day field consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub daily_used: Decimal,
    pub daily_usage_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAnalytics {
    pub by_material: Vec<MaterialUsage>,
    pub daily: Vec<DailyUsage>,
}

impl UsageAnalytics {
    /// Aggregate already-filtered transactions.
    ///
    /// `by_material` is ordered by material type; `daily` lists the most
    /// recent days first, capped at [`DAILY_WINDOW_DAYS`].
    pub fn from_transactions<'a>(
        transactions: impl IntoIterator<Item = &'a MaterialStoreTransaction>,
    ) -> Self {
        let mut by_material: BTreeMap<MaterialType, MaterialUsage> = BTreeMap::new();
        let mut daily: BTreeMap<NaiveDate, DailyUsage> = BTreeMap::new();

        for t in transactions {
            let usage = by_material
                .entry(t.material_type.clone())
                .or_insert_with(|| MaterialUsage {
                    material_type: t.material_type.clone(),
                    total_used: Decimal::ZERO,
                    total_received: Decimal::ZERO,
                    total_returned: Decimal::ZERO,
                    usage_count: 0,
                    transfer_count: 0,
                });

            let date = t.created_at.date_naive();
            let day = daily.entry(date).or_insert_with(|| DailyUsage {
                date,
                daily_used: Decimal::ZERO,
                daily_usage_count: 0,
            });

            match t.transaction_type {
                TransactionType::UsageInField => {
                    usage.total_used += t.quantity.abs();
                    usage.usage_count += 1;
                    day.daily_used += t.quantity.abs();
                    day.daily_usage_count += 1;
                }
                TransactionType::TransferFromPos => {
                    usage.total_received += t.quantity;
                    usage.transfer_count += 1;
                }
                TransactionType::ReturnToPos => {
                    usage.total_returned += t.quantity.abs();
                }
            }
        }

        Self {
            by_material: by_material.into_values().collect(),
            daily: daily.into_values().rev().take(DAILY_WINDOW_DAYS).collect(),
        }
    }
}
