//! # Ledger Synchronizer
//!
//! Keeps the cash-flow ledger in step with sale orders.
//!
//! ## Sync Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller: let mut tx = db.begin().await?                                 │
//! │          ... mutate the sale through &mut tx ...                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sync_sale_cashflow(&mut tx, tenant, sale_id)                           │
//! │       │                                                                 │
//! │       ├── 1. load sale + items        (same connection)                 │
//! │       ├── 2. derive_entries()         (cellar-core, pure)               │
//! │       ├── 3. DELETE rows for sale:<id>                                  │
//! │       └── 4. INSERT derived rows      (none when not settled)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  caller: tx.commit().await?   (any error ⇒ drop ⇒ rollback)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because steps 3 and 4 share the caller's transaction, readers see either
//! the old set or the new set, never both and never neither. The unique
//! index on `(reference_key, entry_kind)` rejects a second set should two
//! writers ever race past each other.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::cashflow::CashFlowRepository;
use crate::repository::sale::SaleRepository;
use cellar_core::cashflow::{derive_entries, reference_key};
use cellar_core::CashFlowRecord;

/// Rebuilds the ledger rows for one sale inside the caller's transaction.
///
/// Returns the rows now on record (empty for unsettled sales).
///
/// ## Errors
/// - `DbError::NotFound` if the sale doesn't exist for the tenant
/// - `DbError::Domain` if the totals overflow
/// - any database error; the caller's transaction should then be dropped
pub async fn sync_sale_cashflow(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
) -> DbResult<Vec<CashFlowRecord>> {
    let sale = SaleRepository::fetch_sale(conn, tenant_id, sale_id)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
    let items = SaleRepository::fetch_items(conn, sale_id).await?;

    let plan = derive_entries(&sale, &items)?;

    let removed = CashFlowRepository::delete_by_reference(conn, tenant_id, &plan.reference_key).await?;

    let now = Utc::now();
    let mut records = Vec::with_capacity(plan.entries.len());
    for entry in plan.entries {
        let record = CashFlowRecord {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            flow_type: entry.flow_type,
            entry_kind: entry.entry_kind,
            amount_cents: entry.amount.cents(),
            category: entry.category,
            funding_source: entry.funding_source,
            reference_key: plan.reference_key.clone(),
            source_version: entry.source_version,
            description: entry.description,
            created_at: now,
        };
        CashFlowRepository::insert(conn, &record).await?;
        records.push(record);
    }

    info!(
        sale_id = %sale_id,
        status = %sale.status,
        version = sale.sync_version,
        removed,
        inserted = records.len(),
        "Synchronized sale cash flow"
    );

    Ok(records)
}

/// Deletes the ledger rows of a sale that is being deleted.
///
/// Returns the number of rows removed.
pub async fn remove_sale_cashflow(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
) -> DbResult<u64> {
    let removed = CashFlowRepository::delete_by_reference(conn, tenant_id, &reference_key(sale_id)).await?;
    info!(sale_id = %sale_id, removed, "Removed sale cash flow");
    Ok(removed)
}

/// Runs [`sync_sale_cashflow`] in a transaction of its own.
///
/// For maintenance paths (seeding, re-sync after a manual fix) that have no
/// surrounding write.
pub async fn resync_sale(db: &Database, tenant_id: &str, sale_id: &str) -> DbResult<Vec<CashFlowRecord>> {
    let mut tx = db.begin().await?;
    let records = sync_sale_cashflow(&mut tx, tenant_id, sale_id).await?;
    tx.commit().await?;
    Ok(records)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::test_support::{sample_item, sample_sale};
    use cellar_core::{CashFlowType, EntryKind, Sale, SaleStatus};

    async fn setup(status: SaleStatus) -> (Database, Sale) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = sample_sale("t1", status);

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();
        SaleRepository::insert_item(&mut tx, &sample_item(&sale.id, 1000, 1, Some(1200)))
            .await
            .unwrap();
        SaleRepository::insert_item(&mut tx, &sample_item(&sale.id, 500, 2, None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        (db, sale)
    }

    fn summarize(records: &[CashFlowRecord]) -> Vec<(CashFlowType, EntryKind, i64)> {
        let mut rows: Vec<_> = records
            .iter()
            .map(|r| (r.flow_type, r.entry_kind, r.amount_cents))
            .collect();
        rows.sort_by_key(|(_, kind, _)| *kind as u8);
        rows
    }

    #[tokio::test]
    async fn test_confirmed_sale_produces_three_rows() {
        let (db, sale) = setup(SaleStatus::Confirmed).await;

        let records = resync_sale(&db, "t1", &sale.id).await.unwrap();

        assert_eq!(
            summarize(&records),
            vec![
                (CashFlowType::Income, EntryKind::Revenue, 2200),
                (CashFlowType::Expense, EntryKind::InvestorPayout, 2000),
                (CashFlowType::Income, EntryKind::Commission, 200),
            ]
        );
        assert!(records.iter().all(|r| r.reference_key == format!("sale:{}", sale.id)));
        assert!(records.iter().all(|r| r.source_version == sale.sync_version));
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let (db, sale) = setup(SaleStatus::Paid).await;

        resync_sale(&db, "t1", &sale.id).await.unwrap();
        resync_sale(&db, "t1", &sale.id).await.unwrap();
        resync_sale(&db, "t1", &sale.id).await.unwrap();

        let stored = db
            .cashflow()
            .list_by_reference("t1", &reference_key(&sale.id))
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_confirmed_then_cancelled_removes_rows() {
        let (db, sale) = setup(SaleStatus::Confirmed).await;
        resync_sale(&db, "t1", &sale.id).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        SaleRepository::update_status(&mut tx, "t1", &sale.id, SaleStatus::Cancelled)
            .await
            .unwrap();
        let records = sync_sale_cashflow(&mut tx, "t1", &sale.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(records.is_empty());
        let stored = db
            .cashflow()
            .list_by_reference("t1", &reference_key(&sale.id))
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_draft_sale_has_no_rows() {
        let (db, sale) = setup(SaleStatus::Draft).await;
        assert!(resync_sale(&db, "t1", &sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_change_replaces_rows_with_new_version() {
        let (db, sale) = setup(SaleStatus::Confirmed).await;
        resync_sale(&db, "t1", &sale.id).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let items = vec![sample_item(&sale.id, 1000, 3, None)];
        SaleRepository::replace_items(&mut tx, &sale.id, &items).await.unwrap();
        SaleRepository::update_header(&mut tx, "t1", &sale.id, "Lin Trading", sale.funding_source, None)
            .await
            .unwrap();
        let records = sync_sale_cashflow(&mut tx, "t1", &sale.id).await.unwrap();
        tx.commit().await.unwrap();

        // Prices match, so no commission row
        assert_eq!(
            summarize(&records),
            vec![
                (CashFlowType::Income, EntryKind::Revenue, 3000),
                (CashFlowType::Expense, EntryKind::InvestorPayout, 3000),
            ]
        );
        assert!(records.iter().all(|r| r.source_version == sale.sync_version + 1));
    }

    #[tokio::test]
    async fn test_failed_transaction_keeps_previous_rows() {
        let (db, sale) = setup(SaleStatus::Confirmed).await;
        resync_sale(&db, "t1", &sale.id).await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            SaleRepository::update_status(&mut tx, "t1", &sale.id, SaleStatus::Cancelled)
                .await
                .unwrap();
            sync_sale_cashflow(&mut tx, "t1", &sale.id).await.unwrap();
            // dropped without commit
        }

        let stored = db
            .cashflow()
            .list_by_reference("t1", &reference_key(&sale.id))
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_second_set() {
        let (db, sale) = setup(SaleStatus::Confirmed).await;
        let records = resync_sale(&db, "t1", &sale.id).await.unwrap();

        let mut duplicate = records[0].clone();
        duplicate.id = Uuid::new_v4().to_string();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = CashFlowRepository::insert(&mut conn, &duplicate).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_remove_on_delete() {
        let (db, sale) = setup(SaleStatus::Delivered).await;
        resync_sale(&db, "t1", &sale.id).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let removed = remove_sale_cashflow(&mut tx, "t1", &sale.id).await.unwrap();
        SaleRepository::delete_sale(&mut tx, "t1", &sale.id).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(removed, 3);
        let summary = db.cashflow().summary("t1").await.unwrap();
        assert_eq!(summary.net_cents, 0);
    }

    #[tokio::test]
    async fn test_summary_by_funding_source() {
        let (db, sale) = setup(SaleStatus::Paid).await;
        resync_sale(&db, "t1", &sale.id).await.unwrap();

        let summary = db.cashflow().summary("t1").await.unwrap();
        assert_eq!(summary.total_income_cents, 2400);
        assert_eq!(summary.total_expense_cents, 2000);
        assert_eq!(summary.net_cents, 400);

        let company = &summary.by_funding_source[0];
        assert_eq!(company.income_cents, 2400);
        assert_eq!(summary.by_funding_source[1].net_cents, 0);
    }

    #[tokio::test]
    async fn test_missing_sale_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = resync_sale(&db, "t1", "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
