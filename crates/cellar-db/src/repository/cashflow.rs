//! # Cash Flow Repository
//!
//! Raw access to the `cashflow_records` ledger. Rows derived from sales are
//! only ever written through [`crate::ledger`], which wraps the
//! delete-then-insert below in the caller's transaction.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cellar_core::{CashFlowRecord, CashFlowType, CoreError, FundingSource};

const RECORD_COLUMNS: &str = "id, tenant_id, flow_type, entry_kind, amount_cents, category, \
                              funding_source, reference_key, source_version, description, created_at";

/// Income and expense totals for one funding source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingSourceTotals {
    pub funding_source: FundingSource,
    pub income_cents: i64,
    pub expense_cents: i64,
    pub net_cents: i64,
}

/// Ledger totals for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashFlowSummary {
    pub by_funding_source: Vec<FundingSourceTotals>,
    pub total_income_cents: i64,
    pub total_expense_cents: i64,
    pub net_cents: i64,
}

/// Repository for ledger rows.
#[derive(Debug, Clone)]
pub struct CashFlowRepository {
    pool: SqlitePool,
}

impl CashFlowRepository {
    /// Creates a new CashFlowRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashFlowRepository { pool }
    }

    /// Lists the rows tied to one reference key.
    pub async fn list_by_reference(
        &self,
        tenant_id: &str,
        reference_key: &str,
    ) -> DbResult<Vec<CashFlowRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_reference(&mut conn, tenant_id, reference_key).await
    }

    /// Lists a tenant's most recent ledger rows.
    pub async fn list_recent(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<CashFlowRecord>> {
        let records = sqlx::query_as::<_, CashFlowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM cashflow_records
             WHERE tenant_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2"
        ))
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Sums income and expense per funding source.
    ///
    /// Both funding sources are always present, zero when they have no rows.
    pub async fn summary(&self, tenant_id: &str) -> DbResult<CashFlowSummary> {
        let rows: Vec<(FundingSource, CashFlowType, i64)> = sqlx::query_as(
            r#"
            SELECT funding_source, flow_type, COALESCE(SUM(amount_cents), 0)
            FROM cashflow_records
            WHERE tenant_id = ?1
            GROUP BY funding_source, flow_type
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_funding_source = Vec::with_capacity(2);
        for source in [FundingSource::Company, FundingSource::Personal] {
            let income_cents = sum_flow(&rows, source, CashFlowType::Income)?;
            let expense_cents = sum_flow(&rows, source, CashFlowType::Expense)?;
            by_funding_source.push(FundingSourceTotals {
                funding_source: source,
                income_cents,
                expense_cents,
                net_cents: checked_net(income_cents, expense_cents)?,
            });
        }

        let total_income_cents = checked_sum(by_funding_source.iter().map(|t| t.income_cents))?;
        let total_expense_cents = checked_sum(by_funding_source.iter().map(|t| t.expense_cents))?;

        Ok(CashFlowSummary {
            by_funding_source,
            total_income_cents,
            total_expense_cents,
            net_cents: checked_net(total_income_cents, total_expense_cents)?,
        })
    }

    // =========================================================================
    // Connection-level operations (usable inside a transaction)
    // =========================================================================

    /// Loads the rows tied to one reference key through `conn`.
    pub async fn fetch_by_reference(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        reference_key: &str,
    ) -> DbResult<Vec<CashFlowRecord>> {
        let records = sqlx::query_as::<_, CashFlowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM cashflow_records
             WHERE tenant_id = ?1 AND reference_key = ?2
             ORDER BY rowid"
        ))
        .bind(tenant_id)
        .bind(reference_key)
        .fetch_all(&mut *conn)
        .await?;

        Ok(records)
    }

    /// Deletes every row tied to a reference key. Returns the number removed.
    pub async fn delete_by_reference(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        reference_key: &str,
    ) -> DbResult<u64> {
        let result =
            sqlx::query("DELETE FROM cashflow_records WHERE tenant_id = ?1 AND reference_key = ?2")
                .bind(tenant_id)
                .bind(reference_key)
                .execute(&mut *conn)
                .await?;

        debug!(reference_key = %reference_key, removed = result.rows_affected(), "Deleted ledger rows");
        Ok(result.rows_affected())
    }

    /// Inserts one ledger row.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation` if the reference key already has a row
    ///   of the same entry kind
    pub async fn insert(conn: &mut SqliteConnection, record: &CashFlowRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cashflow_records (
                id, tenant_id, flow_type, entry_kind, amount_cents, category,
                funding_source, reference_key, source_version, description, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&record.id)
        .bind(&record.tenant_id)
        .bind(record.flow_type)
        .bind(record.entry_kind)
        .bind(record.amount_cents)
        .bind(&record.category)
        .bind(record.funding_source)
        .bind(&record.reference_key)
        .bind(record.source_version)
        .bind(&record.description)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Checked Totals
// =============================================================================

fn checked_sum(mut amounts: impl Iterator<Item = i64>) -> DbResult<i64> {
    amounts.try_fold(0i64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or(DbError::Domain(CoreError::AmountOverflow("cash flow summary")))
    })
}

fn checked_net(income: i64, expense: i64) -> DbResult<i64> {
    income
        .checked_sub(expense)
        .ok_or(DbError::Domain(CoreError::AmountOverflow("cash flow summary")))
}

fn sum_flow(
    rows: &[(FundingSource, CashFlowType, i64)],
    source: FundingSource,
    flow: CashFlowType,
) -> DbResult<i64> {
    checked_sum(
        rows.iter()
            .filter(|(s, f, _)| *s == source && *f == flow)
            .map(|(_, _, amount)| *amount),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cellar_core::EntryKind;
    use chrono::Utc;

    fn record(
        reference: &str,
        source: FundingSource,
        flow: CashFlowType,
        amount: i64,
    ) -> CashFlowRecord {
        CashFlowRecord {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: "t1".to_string(),
            flow_type: flow,
            entry_kind: match flow {
                CashFlowType::Income => EntryKind::Revenue,
                CashFlowType::Expense => EntryKind::InvestorPayout,
            },
            amount_cents: amount,
            category: "sale_revenue".to_string(),
            funding_source: source,
            reference_key: reference.to_string(),
            source_version: 1,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_summary_splits_by_funding_source() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        for row in [
            record("sale:a", FundingSource::Company, CashFlowType::Income, 5_000),
            record("sale:a", FundingSource::Company, CashFlowType::Expense, 3_000),
            record("sale:b", FundingSource::Personal, CashFlowType::Income, 700),
        ] {
            CashFlowRepository::insert(&mut conn, &row).await.unwrap();
        }
        drop(conn);

        let summary = db.cashflow().summary("t1").await.unwrap();
        assert_eq!(summary.by_funding_source[0].net_cents, 2_000);
        assert_eq!(summary.by_funding_source[1].income_cents, 700);
        assert_eq!(summary.total_income_cents, 5_700);
        assert_eq!(summary.net_cents, 2_700);

        let empty = db.cashflow().summary("t2").await.unwrap();
        assert_eq!(empty.by_funding_source.len(), 2);
        assert_eq!(empty.net_cents, 0);
    }

    #[tokio::test]
    async fn test_summary_reports_overflow_across_sources() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let large = i64::MAX / 2 + 1;
        for row in [
            record("sale:a", FundingSource::Company, CashFlowType::Income, large),
            record("sale:b", FundingSource::Personal, CashFlowType::Income, large),
        ] {
            CashFlowRepository::insert(&mut conn, &row).await.unwrap();
        }
        drop(conn);

        let err = db.cashflow().summary("t1").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AmountOverflow(_))));
    }
}
