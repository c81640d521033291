//! Read-side filters for the transaction log.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use drillstore_ledger::{MaterialStoreTransaction, MaterialType, TransactionType};

/// Maximum rows returned by a transaction log query.
pub const TRANSACTION_QUERY_LIMIT: usize = 1000;

/// Filter for transaction log queries. All criteria are optional and ANDed.
///
/// Both date bounds are inclusive whole days (UTC): `date_to` covers the
/// entire day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub material_type: Option<MaterialType>,
    pub transaction_type: Option<TransactionType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    /// Inclusive lower bound on `created_at`.
    pub fn created_from(&self) -> Option<DateTime<Utc>> {
        self.date_from.map(start_of_day)
    }

    /// Exclusive upper bound on `created_at` (start of the day after `date_to`).
    pub fn created_before(&self) -> Option<DateTime<Utc>> {
        self.date_to.map(|d| start_of_day(d) + Duration::days(1))
    }

    pub fn matches(&self, t: &MaterialStoreTransaction) -> bool {
        if self.material_type.as_ref().is_some_and(|m| *m != t.material_type) {
            return false;
        }
        if self.transaction_type.is_some_and(|ty| ty != t.transaction_type) {
            return false;
        }
        within(t.created_at, self.created_from(), self.created_before())
    }
}

/// Date window for usage analytics (inclusive whole days, UTC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AnalyticsFilter {
    /// The `days` whole days ending with (and including) `today`.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self {
            date_from: Some(today - Duration::days(days.max(1) - 1)),
            date_to: Some(today),
        }
    }

    pub fn created_from(&self) -> Option<DateTime<Utc>> {
        self.date_from.map(start_of_day)
    }

    pub fn created_before(&self) -> Option<DateTime<Utc>> {
        self.date_to.map(|d| start_of_day(d) + Duration::days(1))
    }

    pub fn matches(&self, t: &MaterialStoreTransaction) -> bool {
        within(t.created_at, self.created_from(), self.created_before())
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn within(at: DateTime<Utc>, from: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|f| at >= f) && before.is_none_or(|b| at < b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use drillstore_core::{TransactionId, UserId};
    use drillstore_ledger::NewTransaction;
    use rust_decimal_macros::dec;

    fn row(ty: TransactionType, material: &str, at: DateTime<Utc>) -> MaterialStoreTransaction {
        NewTransaction::movement(ty, MaterialType::new(material).unwrap(), dec!(1), dec!(2), UserId::new(1))
            .into_stored(TransactionId::new(1), at)
    }

    #[test]
    fn date_to_covers_the_whole_day() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let filter = TransactionFilter {
            date_to: Some(day),
            ..Default::default()
        };

        let late = Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 59).unwrap();
        let next = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        assert!(filter.matches(&row(TransactionType::TransferFromPos, "gravel", late)));
        assert!(!filter.matches(&row(TransactionType::TransferFromPos, "gravel", next)));
    }

    #[test]
    fn date_from_is_inclusive_from_midnight() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let filter = TransactionFilter {
            date_from: Some(day),
            ..Default::default()
        };

        let midnight = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        assert!(filter.matches(&row(TransactionType::UsageInField, "gravel", midnight)));
        assert!(!filter.matches(&row(TransactionType::UsageInField, "gravel", before)));
    }

    #[test]
    fn last_days_spans_exactly_that_many_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let filter = AnalyticsFilter::last_days(today, 30);

        assert_eq!(filter.date_from, NaiveDate::from_ymd_opt(2025, 3, 2));
        assert_eq!(filter.date_to, Some(today));
        let span = filter.created_before().unwrap() - filter.created_from().unwrap();
        assert_eq!(span, Duration::days(30));

        let first = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let day_before = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap();
        assert!(filter.matches(&row(TransactionType::UsageInField, "gravel", first)));
        assert!(!filter.matches(&row(TransactionType::UsageInField, "gravel", day_before)));

        let today_only = AnalyticsFilter::last_days(today, 1);
        assert_eq!(today_only.date_from, Some(today));
    }

    #[test]
    fn material_and_type_criteria_are_anded() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let filter = TransactionFilter {
            material_type: Some(MaterialType::new("gravel").unwrap()),
            transaction_type: Some(TransactionType::UsageInField),
            ..Default::default()
        };

        assert!(filter.matches(&row(TransactionType::UsageInField, "gravel", at)));
        assert!(!filter.matches(&row(TransactionType::TransferFromPos, "gravel", at)));
        assert!(!filter.matches(&row(TransactionType::UsageInField, "screen_pipe", at)));
    }
}
