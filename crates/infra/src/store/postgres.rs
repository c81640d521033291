//! Postgres-backed material store ledger.
//!
//! ## Concurrency
//!
//! A unit of work is one database transaction. Balance rows are read with
//! `SELECT ... FOR UPDATE` and written back with a compare-and-swap on the
//! `version` column, so a writer that lost a race gets `StoreError::Conflict`
//! instead of silently overwriting.
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Database` |
//! | Column decode failure | n/a | `InvalidRow` |
//! | Anything else | n/a | `Database` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use drillstore_core::{CatalogItemId, ExpectedVersion, FieldReportId, TransactionId, UserId};
use drillstore_ledger::{
    DailyUsage, FieldReportMaterials, MaterialCatalogEntry, MaterialStoreBalance,
    MaterialStoreTransaction, MaterialType, MaterialUsage, NewTransaction, TransactionRecord,
    TransactionType, UsageAnalytics,
};

use super::query::{AnalyticsFilter, TRANSACTION_QUERY_LIMIT, TransactionFilter};
use super::r#trait::{LedgerStore, LedgerTx, StoreError};

const LOG_SAVEPOINT: &str = "material_store_log";

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Unit of work over [`PostgresLedgerStore`]. Rolls back when dropped.
pub struct PostgresLedgerTx {
    inner: Transaction<'static, Postgres>,
}

impl PostgresLedgerTx {
    /// Connection of the open transaction, for collaborators that write in the
    /// same unit of work (e.g. the catalog adjuster).
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut *self.inner
    }
}

#[async_trait]
impl LedgerTx for PostgresLedgerTx {
    #[instrument(skip(self), fields(material_type = %material_type), err)]
    async fn material(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialCatalogEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT material_type, material_name, unit_cost
            FROM materials_inventory
            WHERE material_type = $1
            "#,
        )
        .bind(material_type.as_str())
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("material", e))?;

        row.map(|row| {
            Ok(MaterialCatalogEntry {
                material_type: material_type_from(&row)?,
                material_name: get(&row, "material_name")?,
                unit_cost: get(&row, "unit_cost")?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(material_type = %material_type), err)]
    async fn pos_mapping(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<CatalogItemId>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT catalog_item_id
            FROM pos_material_mappings
            WHERE material_type = $1
            "#,
        )
        .bind(material_type.as_str())
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("pos_mapping", e))?;

        row.map(|row| get::<i64>(&row, "catalog_item_id").map(CatalogItemId::new))
            .transpose()
    }

    #[instrument(skip(self), fields(material_type = %material_type), err)]
    async fn balance_for_update(
        &mut self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                material_type,
                material_name,
                quantity_received,
                quantity_used,
                quantity_returned,
                quantity_remaining,
                unit_cost,
                total_value,
                last_updated,
                version
            FROM material_store_inventory
            WHERE material_type = $1
            FOR UPDATE
            "#,
        )
        .bind(material_type.as_str())
        .fetch_optional(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("balance_for_update", e))?;

        row.as_ref().map(balance_from_row).transpose()
    }

    #[instrument(skip(self, balance), fields(material_type = %balance.material_type), err)]
    async fn insert_balance(&mut self, balance: &MaterialStoreBalance) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO material_store_inventory (
                material_type,
                material_name,
                quantity_received,
                quantity_used,
                quantity_returned,
                quantity_remaining,
                unit_cost,
                total_value,
                last_updated,
                version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(balance.material_type.as_str())
        .bind(&balance.material_name)
        .bind(balance.quantity_received)
        .bind(balance.quantity_used)
        .bind(balance.quantity_returned)
        .bind(balance.quantity_remaining)
        .bind(balance.unit_cost)
        .bind(balance.total_value)
        .bind(balance.last_updated)
        .bind(version_to_db(balance.version)?)
        .execute(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("insert_balance", e))?;

        Ok(())
    }

    #[instrument(
        skip(self, balance),
        fields(material_type = %balance.material_type, expected = ?expected),
        err
    )]
    async fn update_balance(
        &mut self,
        balance: &MaterialStoreBalance,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE material_store_inventory
            SET
                quantity_received = $3,
                quantity_used = $4,
                quantity_returned = $5,
                quantity_remaining = $6,
                total_value = $7,
                last_updated = $8,
                version = $9
            WHERE material_type = $1
                AND version = $2
            "#,
        )
        .bind(balance.material_type.as_str())
        .bind(version_to_db(expected.get())?)
        .bind(balance.quantity_received)
        .bind(balance.quantity_used)
        .bind(balance.quantity_returned)
        .bind(balance.quantity_remaining)
        .bind(balance.total_value)
        .bind(balance.last_updated)
        .bind(version_to_db(balance.version)?)
        .execute(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("update_balance", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "balance '{}' changed concurrently (expected version {})",
                balance.material_type,
                expected.get()
            )));
        }
        Ok(())
    }

    /// Runs inside a savepoint so a failed insert does not abort the
    /// enclosing transaction.
    #[instrument(
        skip(self, row),
        fields(
            transaction_type = %row.transaction_type,
            material_type = %row.material_type,
            quantity = %row.quantity
        ),
        err
    )]
    async fn append_transaction(&mut self, row: &NewTransaction) -> Result<TransactionId, StoreError> {
        sqlx::query(&format!("SAVEPOINT {LOG_SAVEPOINT}"))
            .execute(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("savepoint", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO material_store_transactions (
                transaction_type,
                material_type,
                quantity,
                unit_cost,
                reference_type,
                reference_id,
                field_report_id,
                performed_by,
                remarks
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(row.transaction_type.as_str())
        .bind(row.material_type.as_str())
        .bind(row.quantity)
        .bind(row.unit_cost)
        .bind(row.reference_type.as_deref())
        .bind(row.reference_id.as_deref())
        .bind(row.field_report_id.map(|id| id.get()))
        .bind(row.performed_by.get())
        .bind(row.remarks.as_deref())
        .fetch_one(&mut *self.inner)
        .await;

        match inserted {
            Ok(inserted) => {
                sqlx::query(&format!("RELEASE SAVEPOINT {LOG_SAVEPOINT}"))
                    .execute(&mut *self.inner)
                    .await
                    .map_err(|e| map_sqlx_error("release_savepoint", e))?;
                get::<i64>(&inserted, "id").map(TransactionId::new)
            }
            Err(e) => {
                sqlx::query(&format!("ROLLBACK TO SAVEPOINT {LOG_SAVEPOINT}"))
                    .execute(&mut *self.inner)
                    .await
                    .map_err(|e| map_sqlx_error("rollback_to_savepoint", e))?;
                Err(map_sqlx_error("append_transaction", e))
            }
        }
    }

    #[instrument(skip(self, materials), fields(field_report_id = %field_report_id), err)]
    async fn update_field_report(
        &mut self,
        field_report_id: FieldReportId,
        materials: &FieldReportMaterials,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE field_reports
            SET
                screen_pipes_remaining = $2,
                plain_pipes_remaining = $3,
                gravel_remaining = $4,
                materials_value_used = $5
            WHERE id = $1
            "#,
        )
        .bind(field_report_id.get())
        .bind(materials.screen_pipes_remaining)
        .bind(materials.plain_pipes_remaining)
        .bind(materials.gravel_remaining)
        .bind(materials.materials_value_used)
        .execute(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("update_field_report", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.inner
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.inner
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Tx = PostgresLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let inner = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresLedgerTx { inner })
    }

    #[instrument(skip(self), err)]
    async fn list_balances(&self) -> Result<Vec<MaterialStoreBalance>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                material_type,
                material_name,
                quantity_received,
                quantity_used,
                quantity_returned,
                quantity_remaining,
                unit_cost,
                total_value,
                last_updated,
                version
            FROM material_store_inventory
            ORDER BY material_type
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_balances", e))?;

        rows.iter().map(balance_from_row).collect()
    }

    #[instrument(skip(self), fields(material_type = %material_type), err)]
    async fn get_balance(
        &self,
        material_type: &MaterialType,
    ) -> Result<Option<MaterialStoreBalance>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                material_type,
                material_name,
                quantity_received,
                quantity_used,
                quantity_returned,
                quantity_remaining,
                unit_cost,
                total_value,
                last_updated,
                version
            FROM material_store_inventory
            WHERE material_type = $1
            "#,
        )
        .bind(material_type.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_balance", e))?;

        row.as_ref().map(balance_from_row).transpose()
    }

    #[instrument(skip(self), fields(row_count), err)]
    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id,
                t.transaction_type,
                t.material_type,
                t.quantity,
                t.unit_cost,
                t.reference_type,
                t.reference_id,
                t.field_report_id,
                t.performed_by,
                t.remarks,
                t.created_at,
                u.username AS performed_by_name,
                fr.report_id AS field_report_code
            FROM material_store_transactions t
            LEFT JOIN users u ON t.performed_by = u.id
            LEFT JOIN field_reports fr ON t.field_report_id = fr.id
            WHERE ($1::text IS NULL OR t.material_type = $1)
                AND ($2::text IS NULL OR t.transaction_type = $2)
                AND ($3::timestamptz IS NULL OR t.created_at >= $3)
                AND ($4::timestamptz IS NULL OR t.created_at < $4)
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $5
            "#,
        )
        .bind(filter.material_type.as_ref().map(|m| m.as_str()))
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .bind(filter.created_from())
        .bind(filter.created_before())
        .bind(TRANSACTION_QUERY_LIMIT as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_transactions", e))?;

        Span::current().record("row_count", rows.len());

        rows.iter()
            .map(|row| {
                let transaction = transaction_from_row(row)?;
                let performed_by_name = get::<Option<String>>(row, "performed_by_name")?
                    .unwrap_or_else(|| TransactionRecord::fallback_user_name(transaction.performed_by));
                Ok(TransactionRecord {
                    transaction,
                    performed_by_name,
                    field_report_code: get(row, "field_report_code")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn usage_analytics(&self, filter: &AnalyticsFilter) -> Result<UsageAnalytics, StoreError> {
        let material_rows = sqlx::query(
            r#"
            SELECT
                material_type,
                COALESCE(SUM(CASE WHEN transaction_type = 'usage_in_field' THEN ABS(quantity) END), 0) AS total_used,
                COALESCE(SUM(CASE WHEN transaction_type = 'transfer_from_pos' THEN quantity END), 0) AS total_received,
                COALESCE(SUM(CASE WHEN transaction_type = 'return_to_pos' THEN ABS(quantity) END), 0) AS total_returned,
                COUNT(*) FILTER (WHERE transaction_type = 'usage_in_field') AS usage_count,
                COUNT(*) FILTER (WHERE transaction_type = 'transfer_from_pos') AS transfer_count
            FROM material_store_transactions
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                AND ($2::timestamptz IS NULL OR created_at < $2)
            GROUP BY material_type
            ORDER BY material_type
            "#,
        )
        .bind(filter.created_from())
        .bind(filter.created_before())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("usage_by_material", e))?;

        let daily_rows = sqlx::query(
            r#"
            SELECT
                (created_at AT TIME ZONE 'UTC')::date AS date,
                COALESCE(SUM(CASE WHEN transaction_type = 'usage_in_field' THEN ABS(quantity) END), 0) AS daily_used,
                COUNT(*) FILTER (WHERE transaction_type = 'usage_in_field') AS daily_usage_count
            FROM material_store_transactions
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                AND ($2::timestamptz IS NULL OR created_at < $2)
            GROUP BY 1
            ORDER BY 1 DESC
            LIMIT $3
            "#,
        )
        .bind(filter.created_from())
        .bind(filter.created_before())
        .bind(drillstore_ledger::analytics::DAILY_WINDOW_DAYS as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("usage_by_day", e))?;

        let by_material = material_rows
            .iter()
            .map(|row| {
                Ok(MaterialUsage {
                    material_type: material_type_from(row)?,
                    total_used: get(row, "total_used")?,
                    total_received: get(row, "total_received")?,
                    total_returned: get(row, "total_returned")?,
                    usage_count: count(row, "usage_count")?,
                    transfer_count: count(row, "transfer_count")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let daily = daily_rows
            .iter()
            .map(|row| {
                Ok(DailyUsage {
                    date: get::<NaiveDate>(row, "date")?,
                    daily_used: get(row, "daily_used")?,
                    daily_usage_count: count(row, "daily_usage_count")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(UsageAnalytics { by_material, daily })
    }
}

fn balance_from_row(row: &PgRow) -> Result<MaterialStoreBalance, StoreError> {
    let version: i64 = get(row, "version")?;
    Ok(MaterialStoreBalance {
        material_type: material_type_from(row)?,
        material_name: get(row, "material_name")?,
        quantity_received: get(row, "quantity_received")?,
        quantity_used: get(row, "quantity_used")?,
        quantity_returned: get(row, "quantity_returned")?,
        quantity_remaining: get(row, "quantity_remaining")?,
        unit_cost: get(row, "unit_cost")?,
        total_value: get(row, "total_value")?,
        last_updated: get::<DateTime<Utc>>(row, "last_updated")?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::InvalidRow(format!("negative balance version {version}")))?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<MaterialStoreTransaction, StoreError> {
    let transaction_type: String = get(row, "transaction_type")?;
    Ok(MaterialStoreTransaction {
        id: TransactionId::new(get(row, "id")?),
        transaction_type: transaction_type
            .parse::<TransactionType>()
            .map_err(|e| StoreError::InvalidRow(e.to_string()))?,
        material_type: material_type_from(row)?,
        quantity: get::<Decimal>(row, "quantity")?,
        unit_cost: get(row, "unit_cost")?,
        reference_type: get(row, "reference_type")?,
        reference_id: get(row, "reference_id")?,
        field_report_id: get::<Option<i64>>(row, "field_report_id")?.map(FieldReportId::new),
        performed_by: UserId::new(get(row, "performed_by")?),
        remarks: get(row, "remarks")?,
        created_at: get(row, "created_at")?,
    })
}

fn material_type_from(row: &PgRow) -> Result<MaterialType, StoreError> {
    let raw: String = get(row, "material_type")?;
    MaterialType::new(raw).map_err(|e| StoreError::InvalidRow(e.to_string()))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::InvalidRow(format!("failed to read {column}: {e}")))
}

fn count(row: &PgRow, column: &str) -> Result<u64, StoreError> {
    let n: i64 = get(row, column)?;
    u64::try_from(n).map_err(|_| StoreError::InvalidRow(format!("negative {column}: {n}")))
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::InvalidRow(format!("version {version} out of range")))
}

/// Map SQLx errors to StoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Database(format!("connection pool closed in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::InvalidRow(format!("{operation}: {err}"))
        }
        other => StoreError::Database(format!("sqlx error in {operation}: {other}")),
    }
}
