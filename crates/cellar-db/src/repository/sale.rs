//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert_sale() + insert_item()...   sync_version = 1            │
//! │                                                                         │
//! │  2. EDIT                                                               │
//! │     └── update_header() / replace_items()  sync_version += 1           │
//! │                                                                         │
//! │  3. STATUS                                                             │
//! │     └── update_status()                    sync_version += 1           │
//! │                                                                         │
//! │  4. DELETE                                                             │
//! │     └── delete_sale()  (items cascade)                                 │
//! │                                                                         │
//! │  Every mutation is followed by ledger::sync_sale_cashflow in the       │
//! │  same transaction.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are associated functions taking `&mut SqliteConnection` so the
//! caller decides the transaction boundary. Reads also exist on the pooled
//! repository handle.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cellar_core::{FundingSource, Sale, SaleItem, SaleStatus, SaleWithItems};

const SALE_COLUMNS: &str = "id, tenant_id, order_number, customer_name, status, funding_source, \
                            notes, created_at, updated_at, sync_version";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, name_snapshot, quantity, unit_price_cents, \
                            actual_unit_price_cents, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Pooled reads
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_sale(&mut conn, tenant_id, id).await
    }

    /// Gets a sale together with its items.
    pub async fn get_with_items(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<SaleWithItems>> {
        let mut conn = self.pool.acquire().await?;
        let Some(sale) = Self::fetch_sale(&mut conn, tenant_id, id).await? else {
            return Ok(None);
        };
        let items = Self::fetch_items(&mut conn, &sale.id).await?;
        Ok(Some(SaleWithItems { sale, items }))
    }

    /// Lists a tenant's sales, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<SaleStatus>,
        limit: u32,
    ) -> DbResult<Vec<Sale>> {
        debug!(tenant_id = %tenant_id, ?status, limit = %limit, "Listing sales");

        let sales = match status {
            Some(status) => {
                sqlx::query_as::<_, Sale>(&format!(
                    "SELECT {SALE_COLUMNS} FROM sales
                     WHERE tenant_id = ?1 AND status = ?2
                     ORDER BY created_at DESC
                     LIMIT ?3"
                ))
                .bind(tenant_id)
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Sale>(&format!(
                    "SELECT {SALE_COLUMNS} FROM sales
                     WHERE tenant_id = ?1
                     ORDER BY created_at DESC
                     LIMIT ?2"
                ))
                .bind(tenant_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(sales)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_items(&mut conn, sale_id).await
    }

    // =========================================================================
    // Connection-level operations (usable inside a transaction)
    // =========================================================================

    /// Loads a sale through `conn`, scoped to the tenant.
    pub async fn fetch_sale(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE tenant_id = ?1 AND id = ?2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Loads the items of a sale through `conn`, in insertion order.
    pub async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Inserts a sale header.
    pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, order_number = %sale.order_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, order_number, customer_name, status,
                funding_source, notes, created_at, updated_at, sync_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.order_number)
        .bind(&sale.customer_name)
        .bind(sale.status)
        .bind(sale.funding_source)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.sync_version)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds an item to a sale.
    ///
    /// ## Snapshot Pattern
    /// The product name is copied to the sale item so history survives later
    /// catalog edits.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, quantity = item.quantity, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, name_snapshot, quantity,
                unit_price_cents, actual_unit_price_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.actual_unit_price_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replaces every item of a sale.
    pub async fn replace_items(
        conn: &mut SqliteConnection,
        sale_id: &str,
        items: &[SaleItem],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *conn)
            .await?;

        for item in items {
            Self::insert_item(conn, item).await?;
        }

        Ok(())
    }

    /// Updates the editable header fields and bumps `sync_version`.
    pub async fn update_header(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
        customer_name: &str,
        funding_source: FundingSource,
        notes: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_name = ?3,
                funding_source = ?4,
                notes = ?5,
                updated_at = ?6,
                sync_version = sync_version + 1
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(customer_name)
        .bind(funding_source)
        .bind(notes)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Moves a sale to `status` and bumps `sync_version`.
    pub async fn update_status(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
        status: SaleStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating sale status");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = ?3,
                updated_at = ?4,
                sync_version = sync_version + 1
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Allocates the next order number for a tenant: `SO-YYYYMMDD-NNNNNN`,
    /// counting from 000001 each day.
    ///
    /// Call inside the transaction that inserts the sale. A concurrent writer
    /// that read the same counter fails on commit or on the
    /// `(tenant_id, order_number)` unique index; it never stores a duplicate.
    pub async fn next_order_number(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let prefix = order_number_prefix(now);
        let last: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(CAST(substr(order_number, ?2) AS INTEGER))
            FROM sales
            WHERE tenant_id = ?1 AND order_number LIKE ?3
            "#,
        )
        .bind(tenant_id)
        .bind(prefix.len() as i64 + 1)
        .bind(format!("{prefix}%"))
        .fetch_one(&mut *conn)
        .await?;

        Ok(format!("{prefix}{:06}", last.unwrap_or(0) + 1))
    }

    /// Deletes a sale and (by cascade) its items.
    ///
    /// Returns `false` when nothing matched.
    pub async fn delete_sale(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Day prefix shared by every order number created on `now`'s date.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use cellar_db::repository::sale::order_number_prefix;
///
/// let now = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
/// assert_eq!(order_number_prefix(now), "SO-20260131-");
/// ```
pub fn order_number_prefix(now: DateTime<Utc>) -> String {
    format!("SO-{}-", now.format("%Y%m%d"))
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
