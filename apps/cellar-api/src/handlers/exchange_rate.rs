//! # Exchange Rate Handlers
//!
//! Stored rates are the fallback when a calculation names no rate.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use cellar_core::{Currency, ExchangeRate, StoredExchangeRate};

use crate::error::{ok, ApiError, ApiResult};
use crate::state::{SharedState, Tenant};

/// Body of `PUT /api/v1/exchange-rates/{currency}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertRateRequest {
    /// TWD per one unit of the currency.
    pub rate: f64,
}

/// `GET /api/v1/exchange-rates`
pub async fn list_rates(
    State(state): State<SharedState>,
    tenant: Tenant,
) -> ApiResult<Vec<StoredExchangeRate>> {
    ok(state.db.exchange_rates().list(tenant.id()).await?)
}

/// `PUT /api/v1/exchange-rates/{currency}`
pub async fn upsert_rate(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(currency): Path<String>,
    Json(req): Json<UpsertRateRequest>,
) -> ApiResult<StoredExchangeRate> {
    let currency: Currency = currency.parse()?;
    if currency.is_home() {
        return Err(ApiError::validation("TWD is the home currency and has no stored rate"));
    }
    let rate = ExchangeRate::from_decimal(req.rate)?;

    let stored = state
        .db
        .exchange_rates()
        .upsert(tenant.id(), currency, rate)
        .await?;

    info!(tenant = %tenant.id(), currency = %currency, micros = rate.micros(), "Exchange rate stored");
    ok(stored)
}
