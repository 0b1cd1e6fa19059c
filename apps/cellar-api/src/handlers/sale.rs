//! # Sale Handlers
//!
//! Every write to a sale also rewrites its cash-flow rows, in the same
//! transaction.
//!
//! ## Write Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST/PUT /sales, POST /sales/{id}/status                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate body, resolve product name snapshots   (pool, no tx yet)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  let mut tx = db.begin()                                                │
//! │  ├── write sale header / items / status   (sync_version + 1)            │
//! │  ├── ledger::sync_sale_cashflow(&mut tx)  (delete-then-insert)          │
//! │  ├── read back sale + items               (same tx)                     │
//! │  └── tx.commit()                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { sale, cashflow }      any error above ⇒ tx dropped ⇒ rollback        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups that go through the pool happen before `begin()`: an in-memory
//! database has a single connection, held by the transaction once open.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use cellar_core::cashflow::reference_key;
use cellar_core::validation::{validate_item_count, validate_name, validate_sale_line};
use cellar_core::{
    CashFlowRecord, FundingSource, Sale, SaleItem, SaleStatus, SaleWithItems, ValidationError,
};
use cellar_db::ledger;
use cellar_db::repository::sale::{generate_sale_id, generate_sale_item_id};
use cellar_db::{DbError, SaleRepository};

use crate::error::{ok, ApiError, ApiResult};
use crate::state::{SharedState, Tenant};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;
const MAX_NOTES_CHARS: usize = 1000;

// =============================================================================
// Requests / Responses
// =============================================================================

/// One line of a sale as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemRequest {
    #[serde(default)]
    pub product_id: Option<String>,
    /// Display name. Defaults to the product's name when `product_id` is set.
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: i64,
    /// Investor price per unit.
    pub unit_price_cents: i64,
    /// What the customer actually paid per unit, when different.
    #[serde(default)]
    pub actual_unit_price_cents: Option<i64>,
}

/// Body of `POST /api/v1/sales`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleRequest {
    pub customer_name: String,
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub funding_source: Option<FundingSource>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<SaleItemRequest>,
}

/// Body of `PUT /api/v1/sales/{id}`. Omitted `items` keeps the current lines.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSaleRequest {
    pub customer_name: String,
    pub funding_source: FundingSource,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<SaleItemRequest>>,
}

/// Body of `POST /api/v1/sales/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: SaleStatus,
}

/// Query string of `GET /api/v1/sales`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleQuery {
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A sale after a write, with the ledger rows now on record for it.
#[derive(Debug, Clone, Serialize)]
pub struct SaleResponse {
    pub sale: SaleWithItems,
    pub cashflow: Vec<CashFlowRecord>,
}

/// Result of `DELETE /api/v1/sales/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteSaleResponse {
    pub id: String,
    pub cashflow_removed: u64,
}

// =============================================================================
// Validation
// =============================================================================

fn clean_notes(notes: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if notes.chars().count() > MAX_NOTES_CHARS {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_CHARS,
        });
    }
    Ok(Some(notes.to_string()))
}

/// Validates submitted lines and turns them into rows for `sale_id`.
///
/// Product lookups go through the pool, so call this before `begin()`.
async fn build_items(
    state: &SharedState,
    tenant: &Tenant,
    sale_id: &str,
    lines: &[SaleItemRequest],
) -> Result<Vec<SaleItem>, ApiError> {
    validate_item_count(lines.len())?;

    let now = Utc::now();
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        validate_sale_line(line.quantity, line.unit_price_cents, line.actual_unit_price_cents)?;

        let product = match &line.product_id {
            Some(id) => Some(
                state
                    .db
                    .products()
                    .get_active(tenant.id(), id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Product", id))?,
            ),
            None => None,
        };

        let name = match (line.name.as_deref().map(str::trim), &product) {
            (Some(name), _) if !name.is_empty() => name.to_string(),
            (_, Some(product)) => product.name.clone(),
            _ => {
                return Err(ValidationError::Required {
                    field: "items.name".to_string(),
                }
                .into())
            }
        };
        validate_name("items.name", &name)?;

        items.push(SaleItem {
            id: generate_sale_item_id(),
            sale_id: sale_id.to_string(),
            product_id: product.map(|p| p.id),
            name_snapshot: name,
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            actual_unit_price_cents: line.actual_unit_price_cents,
            created_at: now,
        });
    }

    Ok(items)
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Rebuilds the ledger for a sale and reads the sale back, inside `conn`.
async fn sync_and_load(
    conn: &mut SqliteConnection,
    tenant: &Tenant,
    sale_id: &str,
) -> Result<SaleResponse, ApiError> {
    let cashflow = ledger::sync_sale_cashflow(conn, tenant.id(), sale_id).await?;

    let sale = SaleRepository::fetch_sale(conn, tenant.id(), sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;
    let items = SaleRepository::fetch_items(conn, sale_id).await?;

    Ok(SaleResponse {
        sale: SaleWithItems { sale, items },
        cashflow,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/v1/sales?status=PAID&limit=20`
pub async fn list_sales(
    State(state): State<SharedState>,
    tenant: Tenant,
    Query(query): Query<SaleQuery>,
) -> ApiResult<Vec<Sale>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    ok(state.db.sales().list(tenant.id(), query.status, limit).await?)
}

/// `GET /api/v1/sales/{id}`
pub async fn get_sale(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<SaleWithItems> {
    let sale = state
        .db
        .sales()
        .get_with_items(tenant.id(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    ok(sale)
}

/// `POST /api/v1/sales`
pub async fn create_sale(
    State(state): State<SharedState>,
    tenant: Tenant,
    Json(req): Json<CreateSaleRequest>,
) -> ApiResult<SaleResponse> {
    validate_name("customer_name", &req.customer_name)?;
    let notes = clean_notes(req.notes.as_deref())?;

    let sale_id = generate_sale_id();
    let items = build_items(&state, &tenant, &sale_id, &req.items).await?;

    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let sale = Sale {
        id: sale_id,
        tenant_id: tenant.id().to_string(),
        order_number: SaleRepository::next_order_number(&mut tx, tenant.id(), now).await?,
        customer_name: req.customer_name.trim().to_string(),
        status: req.status.unwrap_or(SaleStatus::Draft),
        funding_source: req.funding_source.unwrap_or(FundingSource::Company),
        notes,
        created_at: now,
        updated_at: now,
        sync_version: 1,
    };
    SaleRepository::insert_sale(&mut tx, &sale).await?;
    for item in &items {
        SaleRepository::insert_item(&mut tx, item).await?;
    }
    let response = sync_and_load(&mut tx, &tenant, &sale.id).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(
        sale_id = %sale.id,
        order_number = %sale.order_number,
        status = %sale.status,
        items = items.len(),
        ledger_rows = response.cashflow.len(),
        "Sale created"
    );
    ok(response)
}

/// `PUT /api/v1/sales/{id}`
pub async fn update_sale(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
    Json(req): Json<UpdateSaleRequest>,
) -> ApiResult<SaleResponse> {
    validate_name("customer_name", &req.customer_name)?;
    let notes = clean_notes(req.notes.as_deref())?;
    let items = match &req.items {
        Some(lines) => Some(build_items(&state, &tenant, &id, lines).await?),
        None => None,
    };

    let mut tx = state.db.begin().await?;
    // Header first: it is the tenant check for the item replacement below
    SaleRepository::update_header(
        &mut tx,
        tenant.id(),
        &id,
        req.customer_name.trim(),
        req.funding_source,
        notes.as_deref(),
    )
    .await?;
    if let Some(items) = &items {
        SaleRepository::replace_items(&mut tx, &id, items).await?;
    }
    let response = sync_and_load(&mut tx, &tenant, &id).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(
        sale_id = %id,
        version = response.sale.sale.sync_version,
        items_replaced = items.is_some(),
        ledger_rows = response.cashflow.len(),
        "Sale updated"
    );
    ok(response)
}

/// `POST /api/v1/sales/{id}/status`
pub async fn update_status(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<SaleResponse> {
    debug!(sale_id = %id, status = %req.status, "update_status");

    let mut tx = state.db.begin().await?;
    SaleRepository::update_status(&mut tx, tenant.id(), &id, req.status).await?;
    let response = sync_and_load(&mut tx, &tenant, &id).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(
        sale_id = %id,
        status = %req.status,
        ledger_rows = response.cashflow.len(),
        "Sale status changed"
    );
    ok(response)
}

/// `DELETE /api/v1/sales/{id}`
pub async fn delete_sale(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<DeleteSaleResponse> {
    let mut tx = state.db.begin().await?;
    let cashflow_removed = ledger::remove_sale_cashflow(&mut tx, tenant.id(), &id).await?;
    if !SaleRepository::delete_sale(&mut tx, tenant.id(), &id).await? {
        return Err(ApiError::not_found("Sale", &id));
    }
    tx.commit().await.map_err(DbError::from)?;

    info!(sale_id = %id, cashflow_removed, "Sale deleted");
    ok(DeleteSaleResponse { id, cashflow_removed })
}

/// `GET /api/v1/sales/{id}/cashflow`
pub async fn sale_cashflow(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<Vec<CashFlowRecord>> {
    if state.db.sales().get_by_id(tenant.id(), &id).await?.is_none() {
        return Err(ApiError::not_found("Sale", &id));
    }

    let rows = state
        .db
        .cashflow()
        .list_by_reference(tenant.id(), &reference_key(&id))
        .await?;
    ok(rows)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::test_support::{setup, tenant};
    use cellar_core::{
        CashFlowType, EntryKind, Product, TaxCategory, MAX_ITEM_QUANTITY, MAX_SALE_ITEMS,
        MAX_UNIT_PRICE_CENTS,
    };

    fn line(unit: i64, qty: i64, actual: Option<i64>) -> SaleItemRequest {
        SaleItemRequest {
            product_id: None,
            name: Some("Kubota Senju 720ml".to_string()),
            quantity: qty,
            unit_price_cents: unit,
            actual_unit_price_cents: actual,
        }
    }

    fn create_request(status: SaleStatus) -> CreateSaleRequest {
        CreateSaleRequest {
            customer_name: "Lin Trading".to_string(),
            status: Some(status),
            funding_source: Some(FundingSource::Personal),
            notes: None,
            items: vec![line(1000, 1, Some(1200)), line(500, 2, None)],
        }
    }

    async fn create(state: &SharedState, status: SaleStatus) -> SaleResponse {
        let Json(body) = create_sale(State(state.clone()), tenant(), Json(create_request(status)))
            .await
            .unwrap();
        body.data.unwrap()
    }

    fn kinds(rows: &[CashFlowRecord]) -> Vec<(CashFlowType, EntryKind, i64)> {
        let mut out: Vec<_> = rows
            .iter()
            .map(|r| (r.flow_type, r.entry_kind, r.amount_cents))
            .collect();
        out.sort_by_key(|(_, kind, _)| *kind as u8);
        out
    }

    #[tokio::test]
    async fn test_create_confirmed_sale_writes_ledger() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Confirmed).await;

        assert_eq!(created.sale.items.len(), 2);
        assert_eq!(
            kinds(&created.cashflow),
            vec![
                (CashFlowType::Income, EntryKind::Revenue, 2200),
                (CashFlowType::Expense, EntryKind::InvestorPayout, 2000),
                (CashFlowType::Income, EntryKind::Commission, 200),
            ]
        );
        assert!(created
            .cashflow
            .iter()
            .all(|r| r.funding_source == FundingSource::Personal));
    }

    #[tokio::test]
    async fn test_draft_sale_has_no_ledger_rows() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Draft).await;
        assert!(created.cashflow.is_empty());
        assert_eq!(created.sale.sale.status, SaleStatus::Draft);
    }

    #[tokio::test]
    async fn test_confirm_then_cancel() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Draft).await;
        let id = created.sale.sale.id.clone();

        let Json(body) = update_status(
            State(state.clone()),
            tenant(),
            Path(id.clone()),
            Json(StatusRequest {
                status: SaleStatus::Confirmed,
            }),
        )
        .await
        .unwrap();
        let confirmed = body.data.unwrap();
        assert_eq!(confirmed.cashflow.len(), 3);
        assert_eq!(confirmed.sale.sale.sync_version, 2);

        let Json(body) = update_status(
            State(state.clone()),
            tenant(),
            Path(id.clone()),
            Json(StatusRequest {
                status: SaleStatus::Cancelled,
            }),
        )
        .await
        .unwrap();
        assert!(body.data.unwrap().cashflow.is_empty());

        let Json(body) = sale_cashflow(State(state), tenant(), Path(id)).await.unwrap();
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_items_and_ledger() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Paid).await;
        let id = created.sale.sale.id.clone();

        let req = UpdateSaleRequest {
            customer_name: "Lin Trading Co.".to_string(),
            funding_source: FundingSource::Company,
            notes: Some("  repeat order ".to_string()),
            items: Some(vec![line(1000, 3, Some(900))]),
        };
        let Json(body) = update_sale(State(state.clone()), tenant(), Path(id.clone()), Json(req))
            .await
            .unwrap();
        let updated = body.data.unwrap();

        assert_eq!(updated.sale.sale.notes.as_deref(), Some("repeat order"));
        assert_eq!(updated.sale.items.len(), 1);
        // Sold below the investor price: commission flips to an expense
        assert_eq!(
            kinds(&updated.cashflow),
            vec![
                (CashFlowType::Income, EntryKind::Revenue, 2700),
                (CashFlowType::Expense, EntryKind::InvestorPayout, 3000),
                (CashFlowType::Expense, EntryKind::Commission, 300),
            ]
        );
        assert!(updated
            .cashflow
            .iter()
            .all(|r| r.source_version == updated.sale.sale.sync_version
                && r.funding_source == FundingSource::Company));

        let Json(body) = sale_cashflow(State(state), tenant(), Path(id)).await.unwrap();
        assert_eq!(body.data.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_without_items_keeps_lines() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Shipped).await;
        let id = created.sale.sale.id.clone();

        let req = UpdateSaleRequest {
            customer_name: "Lin Trading".to_string(),
            funding_source: FundingSource::Company,
            notes: None,
            items: None,
        };
        let Json(body) = update_sale(State(state), tenant(), Path(id), Json(req))
            .await
            .unwrap();
        let updated = body.data.unwrap();
        assert_eq!(updated.sale.items.len(), 2);
        assert_eq!(updated.cashflow.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_removes_ledger_rows() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Delivered).await;
        let id = created.sale.sale.id.clone();

        let Json(body) = delete_sale(State(state.clone()), tenant(), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(body.data.unwrap().cashflow_removed, 3);

        let err = get_sale(State(state.clone()), tenant(), Path(id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let rows = state
            .db
            .cashflow()
            .list_by_reference("t1", &reference_key(&id))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_lines_write_nothing() {
        let state = setup().await;

        let mut req = create_request(SaleStatus::Confirmed);
        req.items.push(line(1000, 0, None));
        let err = create_sale(State(state.clone()), tenant(), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut req = create_request(SaleStatus::Confirmed);
        req.items[0].name = None;
        assert!(create_sale(State(state.clone()), tenant(), Json(req)).await.is_err());

        let Json(body) = list_sales(State(state), tenant(), Query(SaleQuery::default()))
            .await
            .unwrap();
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_touch_sale() {
        let state = setup().await;
        let created = create(&state, SaleStatus::Confirmed).await;
        let id = created.sale.sale.id.clone();
        let other = Tenant("other".to_string());

        let err = update_status(
            State(state.clone()),
            other.clone(),
            Path(id.clone()),
            Json(StatusRequest {
                status: SaleStatus::Cancelled,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = delete_sale(State(state.clone()), other, Path(id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        // Rolled back: the owner's rows are untouched
        let Json(body) = sale_cashflow(State(state), tenant(), Path(id)).await.unwrap();
        assert_eq!(body.data.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let state = setup().await;
        create(&state, SaleStatus::Paid).await;
        create(&state, SaleStatus::Draft).await;
        create(&state, SaleStatus::Paid).await;

        let query = SaleQuery {
            status: Some(SaleStatus::Paid),
            limit: None,
        };
        let Json(body) = list_sales(State(state), tenant(), Query(query)).await.unwrap();
        assert_eq!(body.data.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_prices_are_rejected() {
        let state = setup().await;

        let mut req = create_request(SaleStatus::Draft);
        req.items = vec![line(5_000_000_000_000_000_000, 2, None)];
        let err = create_sale(State(state.clone()), tenant(), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut req = create_request(SaleStatus::Paid);
        req.items = vec![line(1000, 1, Some(MAX_UNIT_PRICE_CENTS + 1))];
        let err = create_sale(State(state.clone()), tenant(), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let Json(body) = list_sales(State(state), tenant(), Query(SaleQuery::default()))
            .await
            .unwrap();
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_largest_sales_still_summarize() {
        let state = setup().await;

        for source in [FundingSource::Company, FundingSource::Personal] {
            let req = CreateSaleRequest {
                funding_source: Some(source),
                items: (0..MAX_SALE_ITEMS)
                    .map(|_| line(MAX_UNIT_PRICE_CENTS, MAX_ITEM_QUANTITY, None))
                    .collect(),
                ..create_request(SaleStatus::Paid)
            };
            let Json(body) = create_sale(State(state.clone()), tenant(), Json(req))
                .await
                .unwrap();
            assert_eq!(body.data.unwrap().cashflow.len(), 2);
        }

        let per_sale = MAX_SALE_ITEMS as i64 * MAX_ITEM_QUANTITY * MAX_UNIT_PRICE_CENTS;
        let summary = state.db.cashflow().summary("t1").await.unwrap();
        assert_eq!(summary.total_income_cents, 2 * per_sale);
        assert_eq!(summary.total_expense_cents, 2 * per_sale);
        assert_eq!(summary.net_cents, 0);
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let state = setup().await;
        let mut numbers = Vec::new();
        for _ in 0..3 {
            numbers.push(create(&state, SaleStatus::Draft).await.sale.sale.order_number);
        }

        assert!(numbers[0].ends_with("-000001"));
        assert!(numbers[1].ends_with("-000002"));
        assert!(numbers[2].ends_with("-000003"));
    }

    #[tokio::test]
    async fn test_deactivated_product_cannot_be_sold() {
        let state = setup().await;
        let now = Utc::now();
        let product = state
            .db
            .products()
            .insert(&Product {
                id: "p-retired".to_string(),
                tenant_id: "t1".to_string(),
                sku: "RETIRED-720".to_string(),
                name: "Retired Junmai".to_string(),
                variant: None,
                tax_category: TaxCategory::Sake,
                abv_bps: 1500,
                volume_ml: 720,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        state.db.products().soft_delete("t1", &product.id).await.unwrap();

        let mut req = create_request(SaleStatus::Confirmed);
        req.items[0].product_id = Some(product.id);
        let err = create_sale(State(state), tenant(), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
