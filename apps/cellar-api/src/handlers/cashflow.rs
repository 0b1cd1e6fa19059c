//! # Cash Flow Handlers
//!
//! Read-only views of the ledger. Rows are written only by the sale
//! handlers through the synchronizer.

use axum::extract::{Query, State};
use serde::Deserialize;

use cellar_core::CashFlowRecord;
use cellar_db::CashFlowSummary;

use crate::error::{ok, ApiResult};
use crate::state::{SharedState, Tenant};

/// Query string of `GET /api/v1/cashflow`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// `GET /api/v1/cashflow/summary`
pub async fn summary(
    State(state): State<SharedState>,
    tenant: Tenant,
) -> ApiResult<CashFlowSummary> {
    ok(state.db.cashflow().summary(tenant.id()).await?)
}

/// `GET /api/v1/cashflow?limit=50`
pub async fn list_recent(
    State(state): State<SharedState>,
    tenant: Tenant,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Vec<CashFlowRecord>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    ok(state.db.cashflow().list_recent(tenant.id(), limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::sale::{create_sale, CreateSaleRequest, SaleItemRequest};
    use crate::handlers::test_support::{setup, tenant};
    use axum::Json;
    use cellar_core::{FundingSource, SaleStatus};

    fn request(funding_source: FundingSource, unit: i64, actual: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            customer_name: "Chen Wine Bar".to_string(),
            status: Some(SaleStatus::Paid),
            funding_source: Some(funding_source),
            notes: None,
            items: vec![SaleItemRequest {
                product_id: None,
                name: Some("Yamazaki 12".to_string()),
                quantity: 2,
                unit_price_cents: unit,
                actual_unit_price_cents: Some(actual),
            }],
        }
    }

    #[tokio::test]
    async fn test_summary_splits_funding_sources() {
        let state = setup().await;
        create_sale(State(state.clone()), tenant(), Json(request(FundingSource::Company, 500_000, 600_000)))
            .await
            .unwrap();
        create_sale(State(state.clone()), tenant(), Json(request(FundingSource::Personal, 300_000, 300_000)))
            .await
            .unwrap();

        let Json(body) = summary(State(state.clone()), tenant()).await.unwrap();
        let totals = body.data.unwrap();

        // Company: revenue 1,200,000 + commission 200,000, payout 1,000,000
        let company = &totals.by_funding_source[0];
        assert_eq!(company.funding_source, FundingSource::Company);
        assert_eq!(company.income_cents, 1_400_000);
        assert_eq!(company.expense_cents, 1_000_000);

        let personal = &totals.by_funding_source[1];
        assert_eq!(personal.net_cents, 0);
        assert_eq!(totals.net_cents, 400_000);

        let Json(body) = list_recent(State(state), tenant(), Query(RecentQuery::default()))
            .await
            .unwrap();
        assert_eq!(body.data.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_tenant_summary_is_zero() {
        let state = setup().await;
        let Json(body) = summary(State(state), tenant()).await.unwrap();
        let totals = body.data.unwrap();
        assert_eq!(totals.by_funding_source.len(), 2);
        assert_eq!(totals.total_income_cents, 0);
    }
}
