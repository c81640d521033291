//! Service-level tests on the in-memory store.
//!
//! Tests: MaterialStoreService → LedgerTx → InMemoryLedgerStore (+ catalog adjuster)
//!
//! Verifies:
//! - balances, log rows and catalog stock move together or not at all
//! - business failures leave no trace
//! - a failed log write never undoes a movement

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use drillstore_core::{CatalogItemId, FieldReportId, UserId};
    use drillstore_ledger::{
        BulkTransferLine, BulkTransferStatus, FieldMaterial, MaterialCatalogEntry, MaterialType,
        MaterialsUsed, MovementOptions, NewTransaction, StockStatus, TransactionType,
    };

    use crate::InMemoryMaterialStoreService;
    use crate::catalog::InMemoryCatalogAdjuster;
    use crate::service::{ALL_TRANSFERS_FAILED, MaterialStoreService};
    use crate::store::{AnalyticsFilter, InMemoryLedgerStore, LedgerTx, TransactionFilter};

    const KEEPER: UserId = UserId::new(3);
    const SCREEN_PIPE_ITEM: CatalogItemId = CatalogItemId::new(101);
    const GRAVEL_ITEM: CatalogItemId = CatalogItemId::new(103);

    fn material(s: &str) -> MaterialType {
        MaterialType::new(s).unwrap()
    }

    fn entry(material_type: &str, name: &str, unit_cost: Decimal) -> MaterialCatalogEntry {
        MaterialCatalogEntry {
            material_type: material(material_type),
            material_name: name.to_string(),
            unit_cost,
        }
    }

    /// Store with the three field materials in the catalog; screen pipe and
    /// gravel are mapped to POS catalog items, plain pipe is not.
    async fn setup() -> (InMemoryMaterialStoreService, InMemoryLedgerStore) {
        let store = InMemoryLedgerStore::new();
        store.seed_material(entry("screen_pipe", "Screen Pipe", dec!(15.00))).await;
        store.seed_material(entry("plain_pipe", "Plain Pipe", dec!(10.00))).await;
        store.seed_material(entry("gravel", "Gravel", dec!(2.00))).await;
        store.seed_catalog_item(SCREEN_PIPE_ITEM, dec!(100)).await;
        store.seed_catalog_item(GRAVEL_ITEM, dec!(500)).await;
        store.seed_pos_mapping(material("screen_pipe"), SCREEN_PIPE_ITEM).await;
        store.seed_pos_mapping(material("gravel"), GRAVEL_ITEM).await;
        store.seed_user(KEEPER, "keeper").await;
        store.seed_field_report(FieldReportId::new(7), "FR-2025-007").await;

        let service = MaterialStoreService::new(store.clone(), InMemoryCatalogAdjuster);
        (service, store)
    }

    async fn transfer(service: &InMemoryMaterialStoreService, material_type: &str, quantity: Decimal) {
        let result = service
            .transfer_from_pos(material_type, quantity, KEEPER, MovementOptions::default())
            .await;
        assert!(result.success, "transfer failed: {:?}", result.error);
    }

    // ─────────────────────────────────────────────────────────────────────
    // TransferFromPos
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn transfer_into_empty_store_opens_balance() {
        let (service, store) = setup().await;

        let result = service
            .transfer_from_pos("gravel", dec!(50), KEEPER, MovementOptions::default())
            .await;
        assert!(result.success);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.material_type, material("gravel"));
        assert_eq!(outcome.quantity_transferred, dec!(50));

        let balance = service.get_material_stock("gravel").await.unwrap().unwrap();
        assert_eq!(balance.quantity_received, dec!(50));
        assert_eq!(balance.quantity_remaining, dec!(50));
        assert_eq!(balance.total_value, dec!(100.00));
        assert_eq!(balance.material_name, "Gravel");

        let log = store.transactions().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].transaction_type, TransactionType::TransferFromPos);
        assert_eq!(log[0].quantity, dec!(50));
        assert_eq!(log[0].unit_cost, dec!(2.00));
        assert_eq!(log[0].reference_type.as_deref(), Some("pos_transfer"));
        assert_eq!(log[0].remarks.as_deref(), Some("Transferred from POS/Material Shop"));
        assert_eq!(log[0].performed_by, KEEPER);

        assert_eq!(store.catalog_stock(GRAVEL_ITEM).await, Some(dec!(450)));
        let adjustments = store.catalog_adjustments().await;
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].delta, dec!(-50));
        assert_eq!(adjustments[0].reason, "Transfer to Material Store: gravel");
    }

    #[tokio::test]
    async fn repeated_transfers_accumulate_on_one_balance() {
        let (service, _store) = setup().await;

        transfer(&service, "gravel", dec!(50)).await;
        transfer(&service, "gravel", dec!(25)).await;

        let inventory = service.get_store_inventory().await.unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].quantity_received, dec!(75));
        assert_eq!(inventory[0].quantity_remaining, dec!(75));
        assert_eq!(inventory[0].total_value, dec!(150.00));
        assert_eq!(inventory[0].version, 2);
    }

    #[tokio::test]
    async fn unmapped_material_skips_catalog_adjustment() {
        let (service, store) = setup().await;

        transfer(&service, "plain_pipe", dec!(12)).await;

        assert!(store.catalog_adjustments().await.is_empty());
        let balance = service.get_material_stock("plain_pipe").await.unwrap().unwrap();
        assert_eq!(balance.total_value, dec!(120.00));
    }

    #[tokio::test]
    async fn catalog_stock_is_clamped_at_zero() {
        let (service, store) = setup().await;

        transfer(&service, "screen_pipe", dec!(130)).await;

        assert_eq!(store.catalog_stock(SCREEN_PIPE_ITEM).await, Some(dec!(0)));
        let balance = service.get_material_stock("screen_pipe").await.unwrap().unwrap();
        assert_eq!(balance.quantity_remaining, dec!(130));
    }

    #[tokio::test]
    async fn unknown_material_is_rejected_without_side_effects() {
        let (service, store) = setup().await;

        let result = service
            .transfer_from_pos("sand", dec!(5), KEEPER, MovementOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_code, Some("material_not_found"));
        assert!(service.get_store_inventory().await.unwrap().is_empty());
        assert!(store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let (service, store) = setup().await;

        for quantity in [dec!(0), dec!(-4)] {
            let result = service
                .transfer_from_pos("gravel", quantity, KEEPER, MovementOptions::default())
                .await;
            assert_eq!(result.error_code, Some("invalid_quantity"));
        }
        assert!(store.transactions().await.is_empty());
        assert_eq!(store.catalog_stock(GRAVEL_ITEM).await, Some(dec!(500)));
    }

    fn beyond_value_range() -> Decimal {
        // Representable, but its value at 2.00 per unit is not.
        Decimal::from_i128_with_scale(40_000_000_000_000_000_000_000_000_000, 0)
    }

    #[tokio::test]
    async fn overflowing_transfer_is_rejected_without_side_effects() {
        let (service, store) = setup().await;
        transfer(&service, "gravel", dec!(10)).await;
        let before = service.get_material_stock("gravel").await.unwrap().unwrap();

        let result = service
            .transfer_from_pos("gravel", beyond_value_range(), KEEPER, MovementOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_code, Some("overflow"));
        assert_eq!(service.get_material_stock("gravel").await.unwrap().unwrap(), before);
        assert_eq!(store.transactions().await.len(), 1);
        assert_eq!(store.catalog_stock(GRAVEL_ITEM).await, Some(dec!(490)));
    }

    #[tokio::test]
    async fn overflowing_bulk_line_leaves_no_catalog_adjustment() {
        let (service, store) = setup().await;

        let lines = vec![
            BulkTransferLine::new("gravel", beyond_value_range()),
            BulkTransferLine::new("plain_pipe", dec!(6)),
        ];
        let result = service.bulk_transfer_from_pos(&lines, KEEPER).await;

        assert!(result.success);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.status, BulkTransferStatus::Partial);
        assert_eq!(outcome.transferred, 1);
        assert!(outcome.errors[0].starts_with("Failed: gravel - quantity too large"));

        assert!(service.get_material_stock("gravel").await.unwrap().is_none());
        assert_eq!(store.catalog_stock(GRAVEL_ITEM).await, Some(dec!(500)));
        assert!(store.catalog_adjustments().await.is_empty());
        assert_eq!(store.transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_catalog_item_fails_the_transfer() {
        let (service, store) = setup().await;
        store.seed_pos_mapping(material("plain_pipe"), CatalogItemId::new(999)).await;

        let result = service
            .transfer_from_pos("plain_pipe", dec!(5), KEEPER, MovementOptions::default())
            .await;

        assert_eq!(result.error_code, Some("catalog_adjustment"));
        assert!(service.get_material_stock("plain_pipe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn caller_options_are_recorded() {
        let (service, store) = setup().await;

        let options = MovementOptions {
            reference_type: Some("purchase_order".to_string()),
            reference_id: Some("PO-88".to_string()),
            remarks: Some("restock".to_string()),
        };
        let result = service.transfer_from_pos("gravel", dec!(5), KEEPER, options).await;
        assert!(result.success);

        let log = store.transactions().await;
        assert_eq!(log[0].reference_type.as_deref(), Some("purchase_order"));
        assert_eq!(log[0].reference_id.as_deref(), Some("PO-88"));
        assert_eq!(log[0].remarks.as_deref(), Some("restock"));
    }

    #[tokio::test]
    async fn transfers_in_caller_unit_of_work_commit_together() {
        let (service, store) = setup().await;

        let mut tx = service.begin().await.unwrap();
        let first = service
            .transfer_from_pos_in(&mut tx, "gravel", dec!(10), KEEPER, MovementOptions::default())
            .await;
        let second = service
            .transfer_from_pos_in(&mut tx, "plain_pipe", dec!(4), KEEPER, MovementOptions::default())
            .await;
        assert!(first.success && second.success);
        tx.commit().await.unwrap();

        assert_eq!(service.get_store_inventory().await.unwrap().len(), 2);
        assert_eq!(store.transactions().await.len(), 2);
    }

    #[tokio::test]
    async fn caller_unit_of_work_rollback_discards_transfers() {
        let (service, store) = setup().await;

        let mut tx = service.begin().await.unwrap();
        let result = service
            .transfer_from_pos_in(&mut tx, "gravel", dec!(10), KEEPER, MovementOptions::default())
            .await;
        assert!(result.success);
        tx.rollback().await.unwrap();

        assert!(service.get_store_inventory().await.unwrap().is_empty());
        assert!(store.transactions().await.is_empty());
        assert_eq!(store.catalog_stock(GRAVEL_ITEM).await, Some(dec!(500)));
    }

    // ─────────────────────────────────────────────────────────────────────
    // UseInFieldWork
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn field_usage_deducts_and_updates_report() {
        let (service, store) = setup().await;
        transfer(&service, "gravel", dec!(50)).await;

        let report = FieldReportId::new(7);
        let used = MaterialsUsed::new().with("gravel_used", dec!(30));
        let result = service.use_in_field_work(report, &used, KEEPER).await;

        assert!(result.success, "{:?}", result.error);
        let outcome = result.data.unwrap();
        let line = &outcome.materials[&FieldMaterial::Gravel];
        assert_eq!(line.used, dec!(30));
        assert_eq!(line.remaining, dec!(20));
        assert_eq!(line.value, dec!(60.00));
        assert_eq!(outcome.total_value, dec!(60.00));

        let balance = service.get_material_stock("gravel").await.unwrap().unwrap();
        assert_eq!(balance.quantity_used, dec!(30));
        assert_eq!(balance.quantity_remaining, dec!(20));
        assert_eq!(balance.total_value, dec!(40.00));

        let snapshot = store.field_report(report).await.unwrap();
        assert_eq!(snapshot.gravel_remaining, Some(dec!(20)));
        assert_eq!(snapshot.screen_pipes_remaining, None);
        assert_eq!(snapshot.plain_pipes_remaining, None);
        assert_eq!(snapshot.materials_value_used, dec!(60.00));

        let usage = store
            .transactions()
            .await
            .into_iter()
            .find(|t| t.transaction_type == TransactionType::UsageInField)
            .unwrap();
        assert_eq!(usage.quantity, dec!(-30));
        assert_eq!(usage.field_report_id, Some(report));
        assert_eq!(usage.reference_type.as_deref(), Some("field_report"));
        assert_eq!(usage.reference_id.as_deref(), Some("7"));
        assert_eq!(usage.remarks.as_deref(), Some("Used in field work - Report #7"));
    }

    #[tokio::test]
    async fn field_usage_accepts_material_key_aliases() {
        let (service, _store) = setup().await;
        transfer(&service, "screen_pipe", dec!(10)).await;
        transfer(&service, "plain_pipe", dec!(10)).await;

        let used = MaterialsUsed::new()
            .with("screen_pipe_used", dec!(2))
            .with("plain_pipes_used", dec!(3));
        let result = service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await;

        let outcome = result.data.unwrap();
        assert_eq!(outcome.materials[&FieldMaterial::ScreenPipe].used, dec!(2));
        assert_eq!(outcome.materials[&FieldMaterial::PlainPipe].used, dec!(3));
        assert_eq!(outcome.total_value, dec!(60.00));
    }

    #[tokio::test]
    async fn field_usage_is_all_or_nothing() {
        let (service, store) = setup().await;
        transfer(&service, "screen_pipe", dec!(10)).await;
        transfer(&service, "gravel", dec!(5)).await;

        let used = MaterialsUsed::new()
            .with("screen_pipes_used", dec!(4))
            .with("gravel_used", dec!(8));
        let result = service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await;

        assert_eq!(result.error_code, Some("insufficient_stock"));
        let screen = service.get_material_stock("screen_pipe").await.unwrap().unwrap();
        assert_eq!(screen.quantity_remaining, dec!(10));
        assert_eq!(screen.quantity_used, dec!(0));
        assert_eq!(store.transactions().await.len(), 2);
        assert_eq!(
            store.field_report(FieldReportId::new(7)).await.unwrap().materials_value_used,
            dec!(0)
        );
    }

    #[tokio::test]
    async fn field_usage_of_unstocked_material_is_not_available() {
        let (service, _store) = setup().await;

        let used = MaterialsUsed::new().with("plain_pipes_used", dec!(1));
        let result = service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await;

        assert_eq!(result.error_code, Some("material_not_available"));
    }

    #[tokio::test]
    async fn missing_field_report_does_not_fail_usage() {
        let (service, _store) = setup().await;
        transfer(&service, "gravel", dec!(10)).await;

        let used = MaterialsUsed::new().with("gravel_used", dec!(1));
        let result = service.use_in_field_work(FieldReportId::new(404), &used, KEEPER).await;

        assert!(result.success);
        let balance = service.get_material_stock("gravel").await.unwrap().unwrap();
        assert_eq!(balance.quantity_remaining, dec!(9));
    }

    // ─────────────────────────────────────────────────────────────────────
    // ReturnToPos
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn return_moves_stock_back_to_catalog() {
        let (service, store) = setup().await;
        transfer(&service, "gravel", dec!(50)).await;

        let result = service
            .return_to_pos("gravel", dec!(15), KEEPER, MovementOptions::default())
            .await;
        assert!(result.success);
        assert_eq!(result.data.unwrap().quantity_returned, dec!(15));

        let balance = service.get_material_stock("gravel").await.unwrap().unwrap();
        assert_eq!(balance.quantity_returned, dec!(15));
        assert_eq!(balance.quantity_used, dec!(0));
        assert_eq!(balance.quantity_remaining, dec!(35));
        assert_eq!(balance.total_value, dec!(70.00));

        assert_eq!(store.catalog_stock(GRAVEL_ITEM).await, Some(dec!(465)));
        let last = store.catalog_adjustments().await.pop().unwrap();
        assert_eq!(last.reason, "Return from Material Store: gravel");

        let row = store.transactions().await.pop().unwrap();
        assert_eq!(row.transaction_type, TransactionType::ReturnToPos);
        assert_eq!(row.quantity, dec!(-15));
        assert_eq!(row.reference_type.as_deref(), Some("material_return"));
        assert_eq!(row.remarks.as_deref(), Some("Returned to POS/Material Shop"));
    }

    #[tokio::test]
    async fn returning_more_than_remaining_changes_nothing() {
        let (service, store) = setup().await;
        transfer(&service, "gravel", dec!(50)).await;
        let used = MaterialsUsed::new().with("gravel_used", dec!(30));
        assert!(service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await.success);

        let before = service.get_material_stock("gravel").await.unwrap().unwrap();
        let log_before = store.transactions().await.len();

        let result = service
            .return_to_pos("gravel", dec!(100), KEEPER, MovementOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_code, Some("insufficient_stock"));
        assert_eq!(service.get_material_stock("gravel").await.unwrap().unwrap(), before);
        assert_eq!(store.transactions().await.len(), log_before);
    }

    #[tokio::test]
    async fn returning_unstocked_material_is_insufficient() {
        let (service, _store) = setup().await;

        let result = service
            .return_to_pos("screen_pipe", dec!(1), KEEPER, MovementOptions::default())
            .await;

        assert_eq!(result.error_code, Some("insufficient_stock"));
    }

    // ─────────────────────────────────────────────────────────────────────
    // BulkTransferFromPos
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn bulk_transfer_completes_all_lines_under_one_batch() {
        let (service, store) = setup().await;

        let lines = vec![
            BulkTransferLine::new("gravel", dec!(20)),
            BulkTransferLine::new("plain_pipe", dec!(6)),
        ];
        let result = service.bulk_transfer_from_pos(&lines, KEEPER).await;

        assert!(result.success);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.status, BulkTransferStatus::Completed);
        assert_eq!(outcome.transferred, 2);
        assert!(outcome.errors.is_empty());

        let log = store.transactions().await;
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|t| t.reference_type.as_deref() == Some("bulk_transfer")));
        assert_eq!(log[0].reference_id, log[1].reference_id);
        assert!(log[0].reference_id.as_deref().unwrap().starts_with("BULK-"));
    }

    #[tokio::test]
    async fn bulk_lines_without_remarks_are_logged_as_bulk_transfer() {
        let (service, store) = setup().await;

        let mut noted = BulkTransferLine::new("plain_pipe", dec!(6));
        noted.remarks = Some("rig 4 restock".to_string());
        let mut blank = BulkTransferLine::new("screen_pipe", dec!(2));
        blank.remarks = Some("   ".to_string());
        let lines = vec![BulkTransferLine::new("gravel", dec!(20)), noted, blank];

        let result = service.bulk_transfer_from_pos(&lines, KEEPER).await;
        assert!(result.success);

        let remarks: Vec<_> = store
            .transactions()
            .await
            .into_iter()
            .map(|t| (t.material_type.to_string(), t.remarks))
            .collect();
        assert!(remarks.contains(&("gravel".to_string(), Some("Bulk transfer".to_string()))));
        assert!(remarks.contains(&("plain_pipe".to_string(), Some("rig 4 restock".to_string()))));
        assert!(remarks.contains(&("screen_pipe".to_string(), Some("Bulk transfer".to_string()))));
    }

    #[tokio::test]
    async fn bulk_transfer_keeps_successful_lines_on_partial_failure() {
        let (service, _store) = setup().await;

        let lines = vec![
            BulkTransferLine::new("gravel", dec!(20)),
            BulkTransferLine::new("", dec!(3)),
            BulkTransferLine::new("plain_pipe", dec!(0)),
            BulkTransferLine::new("sand", dec!(4)),
        ];
        let result = service.bulk_transfer_from_pos(&lines, KEEPER).await;

        assert!(result.success);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.status, BulkTransferStatus::Partial);
        assert_eq!(outcome.transferred, 1);
        assert_eq!(
            outcome.errors,
            vec![
                "Invalid transfer:  - 3".to_string(),
                "Invalid transfer: plain_pipe - 0".to_string(),
                "Failed: sand - material type 'sand' not found".to_string(),
            ]
        );
        assert!(service.get_material_stock("gravel").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bulk_transfer_with_no_success_commits_nothing() {
        let (service, store) = setup().await;

        let lines = vec![
            BulkTransferLine::new("sand", dec!(4)),
            BulkTransferLine::new("gravel", dec!(-1)),
        ];
        let result = service.bulk_transfer_from_pos(&lines, KEEPER).await;

        assert!(!result.success);
        assert_eq!(result.error_code, Some(ALL_TRANSFERS_FAILED));
        assert_eq!(result.data.unwrap().errors.len(), 2);
        assert!(store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn empty_bulk_transfer_is_invalid() {
        let (service, _store) = setup().await;

        let result = service.bulk_transfer_from_pos(&[], KEEPER).await;
        assert_eq!(result.error_code, Some("invalid_request"));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transaction log suppression
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn failed_log_write_keeps_the_movement() {
        let (service, store) = setup().await;
        store.fail_transaction_log(true).await;

        let result = service
            .transfer_from_pos("gravel", dec!(50), KEEPER, MovementOptions::default())
            .await;

        assert!(result.success);
        let balance = service.get_material_stock("gravel").await.unwrap().unwrap();
        assert_eq!(balance.quantity_remaining, dec!(50));
        assert!(store.transactions().await.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn transactions_join_user_and_report_and_filter() {
        let (service, _store) = setup().await;
        transfer(&service, "gravel", dec!(50)).await;
        transfer(&service, "plain_pipe", dec!(5)).await;
        let used = MaterialsUsed::new().with("gravel_used", dec!(10));
        assert!(service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await.success);

        let all = service.get_transactions(&TransactionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.performed_by_name == "keeper"));

        let usage = service
            .get_transactions(&TransactionFilter {
                material_type: Some(material("gravel")),
                transaction_type: Some(TransactionType::UsageInField),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].field_report_code.as_deref(), Some("FR-2025-007"));
    }

    #[tokio::test]
    async fn transaction_query_is_capped() {
        let (service, store) = setup().await;
        let at = Utc::now();
        for _ in 0..1005 {
            let row = NewTransaction::movement(
                TransactionType::TransferFromPos,
                material("gravel"),
                dec!(1),
                dec!(2),
                KEEPER,
            );
            store.seed_transaction(row, at).await;
        }

        let rows = service.get_transactions(&TransactionFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1000);
    }

    #[tokio::test]
    async fn low_stock_alerts_are_ranked_by_severity() {
        let (service, _store) = setup().await;
        transfer(&service, "screen_pipe", dec!(10)).await;
        transfer(&service, "plain_pipe", dec!(10)).await;
        transfer(&service, "gravel", dec!(100)).await;

        let used = MaterialsUsed::new()
            .with("screen_pipes_used", dec!(10))
            .with("plain_pipes_used", dec!(8))
            .with("gravel_used", dec!(85));
        assert!(service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await.success);

        let alerts = service.get_low_stock_alerts(dec!(20)).await.unwrap();
        let statuses: Vec<_> = alerts
            .iter()
            .map(|a| (a.balance.material_type.as_str().to_string(), a.stock_status))
            .collect();

        assert_eq!(
            statuses,
            vec![
                ("screen_pipe".to_string(), StockStatus::OutOfStock),
                ("plain_pipe".to_string(), StockStatus::Low),
                ("gravel".to_string(), StockStatus::Low),
            ]
        );
    }

    #[tokio::test]
    async fn negative_threshold_is_rejected() {
        let (service, _store) = setup().await;
        let err = service.get_low_stock_alerts(dec!(-1)).await.unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[tokio::test]
    async fn analytics_aggregate_by_material_and_day() {
        let (service, store) = setup().await;
        let day1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let day2 = day1 + Duration::days(1);
        let gravel = material("gravel");

        let row = |ty, q| NewTransaction::movement(ty, gravel.clone(), q, dec!(2), KEEPER);
        store.seed_transaction(row(TransactionType::TransferFromPos, dec!(50)), day1).await;
        store.seed_transaction(row(TransactionType::UsageInField, dec!(10)), day1).await;
        store.seed_transaction(row(TransactionType::UsageInField, dec!(5)), day2).await;
        store.seed_transaction(row(TransactionType::ReturnToPos, dec!(3)), day2).await;

        let filter = AnalyticsFilter {
            date_from: NaiveDate::from_ymd_opt(2025, 6, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 6, 2),
        };
        let analytics = service.get_usage_analytics(&filter).await.unwrap();

        assert_eq!(analytics.by_material.len(), 1);
        let usage = &analytics.by_material[0];
        assert_eq!(usage.total_used, dec!(15));
        assert_eq!(usage.total_received, dec!(50));
        assert_eq!(usage.total_returned, dec!(3));
        assert_eq!(usage.usage_count, 2);
        assert_eq!(usage.transfer_count, 1);

        assert_eq!(analytics.daily.len(), 2);
        assert_eq!(analytics.daily[0].date, day2.date_naive());
        assert_eq!(analytics.daily[0].daily_used, dec!(5));
        assert_eq!(analytics.daily[1].daily_usage_count, 1);

        let outside = AnalyticsFilter {
            date_from: NaiveDate::from_ymd_opt(2025, 6, 3),
            date_to: None,
        };
        assert!(service.get_usage_analytics(&outside).await.unwrap().by_material.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────

    #[derive(Debug, Clone)]
    enum Op {
        Transfer(i64),
        Use(i64),
        Return(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-5i64..60).prop_map(Op::Transfer),
            (-5i64..60).prop_map(Op::Use),
            (-5i64..60).prop_map(Op::Return),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn balance_always_matches_its_log(ops in proptest::collection::vec(op(), 1..25)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let (service, store) = setup().await;

                for op in ops {
                    match op {
                        Op::Transfer(q) => {
                            service
                                .transfer_from_pos("gravel", Decimal::from(q), KEEPER, MovementOptions::default())
                                .await;
                        }
                        Op::Use(q) => {
                            let used = MaterialsUsed::new().with("gravel_used", Decimal::from(q));
                            service.use_in_field_work(FieldReportId::new(7), &used, KEEPER).await;
                        }
                        Op::Return(q) => {
                            service
                                .return_to_pos("gravel", Decimal::from(q), KEEPER, MovementOptions::default())
                                .await;
                        }
                    }
                }

                if let Some(balance) = service.get_material_stock("gravel").await.unwrap() {
                    let logged: Decimal = store.transactions().await.iter().map(|t| t.quantity).sum();

                    assert!(balance.quantity_remaining >= Decimal::ZERO);
                    assert_eq!(
                        balance.quantity_remaining,
                        balance.quantity_received - balance.quantity_used - balance.quantity_returned
                    );
                    assert_eq!(balance.total_value, balance.quantity_remaining * balance.unit_cost);
                    assert_eq!(logged, balance.quantity_remaining);
                }
            });
        }
    }
}
