//! Material store ledger service (application-level orchestration).
//!
//! `MaterialStoreService` moves stock between the POS catalog, the material
//! store and field work. Domain rules live in `drillstore-ledger`; this module
//! composes them with a [`LedgerStore`] and a [`CatalogStockAdjuster`].
//!
//! ## Units of work
//!
//! ```text
//! begin ──► lock balance ──► apply domain mutation ──► CAS write ──► log row ──► commit
//!                 │                   │                    │            │
//!                 └──── any error ────┴────────────────────┘            └─ failure logged, ignored
//!                           ▼
//!                        rollback
//! ```
//!
//! Plain operations open, commit and roll back their own unit of work.
//! `*_in` variants run inside a caller's unit of work and never finish it.
//!
//! Mutations report through [`OperationResult`]; every failure is also logged.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use drillstore_core::{DomainError, ExpectedVersion, FieldReportId, UserId};
use drillstore_ledger::{
    BulkTransferLine, BulkTransferOutcome, BulkTransferStatus, Deduction, FieldMaterial,
    FieldUsageLine, FieldUsageOutcome, LedgerError, LedgerResult, LowStockAlert,
    MaterialStoreBalance, MaterialType, MaterialsUsed, MovementOptions, NewTransaction,
    OperationResult, ReturnOutcome, TransactionRecord, TransactionType, TransferOutcome,
    UsageAnalytics, ensure_positive, low_stock_alerts,
};

use crate::catalog::CatalogStockAdjuster;
use crate::store::{AnalyticsFilter, LedgerStore, LedgerTx, TransactionFilter};

pub const POS_TRANSFER_REFERENCE: &str = "pos_transfer";
pub const MATERIAL_RETURN_REFERENCE: &str = "material_return";
pub const BULK_TRANSFER_REFERENCE: &str = "bulk_transfer";
pub const FIELD_REPORT_REFERENCE: &str = "field_report";

/// `error_code` of a bulk transfer in which no line succeeded.
pub const ALL_TRANSFERS_FAILED: &str = "all_transfers_failed";

const TRANSFER_REMARKS: &str = "Transferred from POS/Material Shop";
const RETURN_REMARKS: &str = "Returned to POS/Material Shop";
const BULK_TRANSFER_REMARKS: &str = "Bulk transfer";

pub struct MaterialStoreService<S, A> {
    store: S,
    adjuster: A,
}

impl<S, A> MaterialStoreService<S, A>
where
    S: LedgerStore,
    A: CatalogStockAdjuster<S::Tx>,
{
    pub fn new(store: S, adjuster: A) -> Self {
        Self { store, adjuster }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a unit of work for the `*_in` operations.
    pub async fn begin(&self) -> LedgerResult<S::Tx> {
        Ok(self.store.begin().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Move `quantity` of a material from the POS shop into the store.
    #[instrument(
        skip(self, options),
        fields(material_type = %material_type, quantity = %quantity, user_id = %performed_by)
    )]
    pub async fn transfer_from_pos(
        &self,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> OperationResult<TransferOutcome> {
        report(
            "transfer_from_pos",
            self.transfer_owned(material_type, quantity, performed_by, options).await,
        )
    }

    /// [`Self::transfer_from_pos`] inside the caller's unit of work.
    ///
    /// On a failure with a non-business `error_code` the unit of work must be
    /// rolled back by the caller.
    #[instrument(
        skip(self, tx, options),
        fields(material_type = %material_type, quantity = %quantity, user_id = %performed_by)
    )]
    pub async fn transfer_from_pos_in(
        &self,
        tx: &mut S::Tx,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> OperationResult<TransferOutcome> {
        report(
            "transfer_from_pos",
            self.transfer(tx, material_type, quantity, performed_by, options).await,
        )
    }

    /// Deduct the materials consumed by a field report and write the
    /// remaining snapshots back onto the report. All or nothing.
    #[instrument(skip(self, materials_used), fields(field_report_id = %field_report_id, user_id = %performed_by))]
    pub async fn use_in_field_work(
        &self,
        field_report_id: FieldReportId,
        materials_used: &MaterialsUsed,
        performed_by: UserId,
    ) -> OperationResult<FieldUsageOutcome> {
        let result = self
            .field_usage_owned(field_report_id, materials_used, performed_by)
            .await;
        report("use_in_field_work", result)
    }

    /// Send `quantity` of a material from the store back to the POS shop.
    #[instrument(
        skip(self, options),
        fields(material_type = %material_type, quantity = %quantity, user_id = %performed_by)
    )]
    pub async fn return_to_pos(
        &self,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> OperationResult<ReturnOutcome> {
        let result = self
            .return_owned(material_type, quantity, performed_by, options)
            .await;
        report("return_to_pos", result)
    }

    /// Transfer several materials in one unit of work.
    ///
    /// Invalid lines and lines failing a business rule are reported in
    /// `errors`; the rest are committed (`status: partial`). Nothing is
    /// committed if every line fails or if storage fails.
    #[instrument(skip(self, lines), fields(line_count = lines.len(), user_id = %performed_by))]
    pub async fn bulk_transfer_from_pos(
        &self,
        lines: &[BulkTransferLine],
        performed_by: UserId,
    ) -> OperationResult<BulkTransferOutcome> {
        match self.bulk_transfer(lines, performed_by).await {
            Ok(outcome) if outcome.status == BulkTransferStatus::Failed => {
                error!(
                    operation = "bulk_transfer_from_pos",
                    error_code = ALL_TRANSFERS_FAILED,
                    errors = ?outcome.errors,
                    "material store operation failed"
                );
                OperationResult::failed_with(outcome, ALL_TRANSFERS_FAILED, "All transfers failed")
            }
            Ok(outcome) => {
                if outcome.status == BulkTransferStatus::Partial {
                    warn!(
                        transferred = outcome.transferred,
                        errors = ?outcome.errors,
                        "bulk transfer partially applied"
                    );
                }
                OperationResult::ok(outcome)
            }
            Err(e) => report("bulk_transfer_from_pos", Err(e)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// All balances, ordered by material type.
    pub async fn get_store_inventory(&self) -> LedgerResult<Vec<MaterialStoreBalance>> {
        Ok(self.store.list_balances().await?)
    }

    pub async fn get_material_stock(&self, material_type: &str) -> LedgerResult<Option<MaterialStoreBalance>> {
        let material_type = MaterialType::new(material_type)?;
        Ok(self.store.get_balance(&material_type).await?)
    }

    pub async fn get_transactions(&self, filter: &TransactionFilter) -> LedgerResult<Vec<TransactionRecord>> {
        Ok(self.store.query_transactions(filter).await?)
    }

    pub async fn get_low_stock_alerts(&self, threshold_percent: Decimal) -> LedgerResult<Vec<LowStockAlert>> {
        if threshold_percent < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "threshold must not be negative (got {threshold_percent})"
            ))
            .into());
        }
        let balances = self.store.list_balances().await?;
        Ok(low_stock_alerts(balances, threshold_percent))
    }

    pub async fn get_usage_analytics(&self, filter: &AnalyticsFilter) -> LedgerResult<UsageAnalytics> {
        Ok(self.store.usage_analytics(filter).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unit-of-work bodies
    // ─────────────────────────────────────────────────────────────────────────

    async fn transfer_owned(
        &self,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> LedgerResult<TransferOutcome> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .transfer(&mut tx, material_type, quantity, performed_by, options)
            .await;
        finish(tx, outcome).await
    }

    async fn field_usage_owned(
        &self,
        field_report_id: FieldReportId,
        materials_used: &MaterialsUsed,
        performed_by: UserId,
    ) -> LedgerResult<FieldUsageOutcome> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .field_usage(&mut tx, field_report_id, materials_used, performed_by)
            .await;
        finish(tx, outcome).await
    }

    async fn return_owned(
        &self,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> LedgerResult<ReturnOutcome> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .return_stock(&mut tx, material_type, quantity, performed_by, options)
            .await;
        finish(tx, outcome).await
    }

    async fn transfer(
        &self,
        tx: &mut S::Tx,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> LedgerResult<TransferOutcome> {
        ensure_positive(quantity)?;
        let material_type = MaterialType::new(material_type)?;

        let entry = tx
            .material(&material_type)
            .await?
            .ok_or_else(|| LedgerError::MaterialNotFound(material_type.clone()))?;

        // Business checks run before the first write: a failed bulk line
        // must leave nothing in the shared unit of work.
        let now = Utc::now();
        let (balance, expected) = match tx.balance_for_update(&material_type).await? {
            Some(mut balance) => {
                let expected = ExpectedVersion::of(&balance);
                balance.receive(quantity, now)?;
                (balance, Some(expected))
            }
            None => {
                let mut balance = MaterialStoreBalance::open(&entry, now);
                balance.receive(quantity, now)?;
                (balance, None)
            }
        };

        if let Some(item) = tx.pos_mapping(&material_type).await? {
            let reason = format!("Transfer to Material Store: {material_type}");
            self.adjuster.adjust_stock(tx, item, -quantity, &reason).await?;
        }

        match expected {
            Some(expected) => tx.update_balance(&balance, expected).await?,
            None => tx.insert_balance(&balance).await?,
        }

        let row = NewTransaction::movement(
            TransactionType::TransferFromPos,
            material_type.clone(),
            quantity,
            entry.unit_cost,
            performed_by,
        )
        .with_options(with_defaults(options, POS_TRANSFER_REFERENCE, TRANSFER_REMARKS));
        append_log(tx, &row).await;

        info!(
            material_type = %material_type,
            quantity = %quantity,
            remaining = %balance.quantity_remaining,
            "material transferred from POS"
        );

        Ok(TransferOutcome {
            material_type,
            quantity_transferred: quantity,
        })
    }

    async fn field_usage(
        &self,
        tx: &mut S::Tx,
        field_report_id: FieldReportId,
        materials_used: &MaterialsUsed,
        performed_by: UserId,
    ) -> LedgerResult<FieldUsageOutcome> {
        let mut outcome = FieldUsageOutcome::default();

        for material in FieldMaterial::ALL {
            let quantity = materials_used.quantity_for(material);
            if quantity <= Decimal::ZERO {
                continue;
            }

            let material_type = material.material_type();
            let mut balance = tx
                .balance_for_update(&material_type)
                .await?
                .ok_or_else(|| LedgerError::MaterialNotAvailable(material_type.clone()))?;

            let value = balance.value_of(quantity)?;
            let expected = ExpectedVersion::of(&balance);
            balance.deduct(quantity, Deduction::Usage, Utc::now())?;
            tx.update_balance(&balance, expected).await?;

            let row = NewTransaction::movement(
                TransactionType::UsageInField,
                material_type,
                quantity,
                balance.unit_cost,
                performed_by,
            )
            .with_options(MovementOptions {
                reference_type: Some(FIELD_REPORT_REFERENCE.to_string()),
                reference_id: Some(field_report_id.to_string()),
                remarks: Some(format!("Used in field work - Report #{field_report_id}")),
            })
            .with_field_report(field_report_id);
            append_log(tx, &row).await;

            outcome.record(
                material,
                FieldUsageLine {
                    used: quantity,
                    remaining: balance.quantity_remaining,
                    value,
                },
            )?;
        }

        let snapshot = outcome.report_snapshot();
        if !tx.update_field_report(field_report_id, &snapshot).await? {
            warn!(field_report_id = %field_report_id, "field report not found; material columns not written");
        }

        info!(
            field_report_id = %field_report_id,
            total_value = %outcome.total_value,
            "field material usage recorded"
        );
        Ok(outcome)
    }

    async fn return_stock(
        &self,
        tx: &mut S::Tx,
        material_type: &str,
        quantity: Decimal,
        performed_by: UserId,
        options: MovementOptions,
    ) -> LedgerResult<ReturnOutcome> {
        ensure_positive(quantity)?;
        let material_type = MaterialType::new(material_type)?;

        let Some(mut balance) = tx.balance_for_update(&material_type).await? else {
            return Err(LedgerError::InsufficientStock {
                material: material_type,
                available: Decimal::ZERO,
                requested: quantity,
            });
        };

        let expected = ExpectedVersion::of(&balance);
        balance.deduct(quantity, Deduction::Return, Utc::now())?;
        tx.update_balance(&balance, expected).await?;

        let row = NewTransaction::movement(
            TransactionType::ReturnToPos,
            material_type.clone(),
            quantity,
            balance.unit_cost,
            performed_by,
        )
        .with_options(with_defaults(options, MATERIAL_RETURN_REFERENCE, RETURN_REMARKS));
        append_log(tx, &row).await;

        if let Some(item) = tx.pos_mapping(&material_type).await? {
            let reason = format!("Return from Material Store: {material_type}");
            self.adjuster.adjust_stock(tx, item, quantity, &reason).await?;
        }

        info!(
            material_type = %material_type,
            quantity = %quantity,
            remaining = %balance.quantity_remaining,
            "material returned to POS"
        );

        Ok(ReturnOutcome {
            material_type,
            quantity_returned: quantity,
        })
    }

    async fn bulk_transfer(
        &self,
        lines: &[BulkTransferLine],
        performed_by: UserId,
    ) -> LedgerResult<BulkTransferOutcome> {
        if lines.is_empty() {
            return Err(DomainError::validation("transfers array is required").into());
        }

        let batch_id = format!("BULK-{}", Uuid::now_v7().simple());
        let mut tx = self.store.begin().await?;
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for line in lines {
            let material_type = line.material_type.trim();
            if material_type.is_empty() || line.quantity <= Decimal::ZERO {
                errors.push(format!("Invalid transfer: {} - {}", line.material_type, line.quantity));
                continue;
            }

            let options = MovementOptions {
                reference_type: Some(BULK_TRANSFER_REFERENCE.to_string()),
                reference_id: Some(batch_id.clone()),
                remarks: non_blank(line.remarks.clone()).or_else(|| Some(BULK_TRANSFER_REMARKS.to_string())),
            };

            match self
                .transfer(&mut tx, material_type, line.quantity, performed_by, options)
                .await
            {
                Ok(outcome) => results.push(outcome),
                Err(e) if e.is_business() => {
                    warn!(material_type, error = %e, "bulk transfer line failed");
                    errors.push(format!("Failed: {material_type} - {e}"));
                }
                Err(e) => {
                    rollback_quietly(tx).await;
                    return Err(e);
                }
            }
        }

        if results.is_empty() {
            rollback_quietly(tx).await;
            return Ok(BulkTransferOutcome {
                status: BulkTransferStatus::Failed,
                transferred: 0,
                results,
                errors,
            });
        }

        tx.commit().await?;

        let status = if errors.is_empty() {
            BulkTransferStatus::Completed
        } else {
            BulkTransferStatus::Partial
        };
        info!(batch_id = %batch_id, transferred = results.len(), ?status, "bulk transfer committed");

        Ok(BulkTransferOutcome {
            status,
            transferred: results.len(),
            results,
            errors,
        })
    }
}

/// Commit on success, roll back on failure.
async fn finish<Tx: LedgerTx, T>(tx: Tx, result: LedgerResult<T>) -> LedgerResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            rollback_quietly(tx).await;
            Err(e)
        }
    }
}

async fn rollback_quietly<Tx: LedgerTx>(tx: Tx) {
    if let Err(e) = tx.rollback().await {
        error!(error = %e, "rollback failed");
    }
}

/// Append a log row; a failure is logged and the movement stands.
async fn append_log<Tx: LedgerTx>(tx: &mut Tx, row: &NewTransaction) {
    if let Err(e) = tx.append_transaction(row).await {
        let err = LedgerError::TransactionLog(e.to_string());
        error!(
            error = %err,
            transaction_type = %row.transaction_type,
            material_type = %row.material_type,
            quantity = %row.quantity,
            "transaction log write suppressed"
        );
    }
}

fn with_defaults(options: MovementOptions, reference_type: &str, remarks: &str) -> MovementOptions {
    MovementOptions {
        reference_type: non_blank(options.reference_type).or_else(|| Some(reference_type.to_string())),
        reference_id: non_blank(options.reference_id),
        remarks: non_blank(options.remarks).or_else(|| Some(remarks.to_string())),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn report<T>(operation: &'static str, result: LedgerResult<T>) -> OperationResult<T> {
    if let Err(e) = &result {
        error!(operation, error_code = e.code(), error = %e, "material store operation failed");
    }
    result.into()
}
