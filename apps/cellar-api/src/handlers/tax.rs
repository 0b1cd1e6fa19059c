//! # Tax Calculator Handlers
//!
//! `POST /api/v1/tax/calculate` and `POST /api/v1/tax/convert`.
//!
//! ## Calculate Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  JSON body (floats allowed here only)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  product_id? ── yes ──► load product, fill category / ABV / volume      │
//! │       │                 (explicit fields in the body still win)         │
//! │       ▼                                                                 │
//! │  exchange_rate? ── no ──► stored tenant rate ── none ──► 422            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  build TaxInput (cents, bps, micros)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cellar_core::calculator::calculate_import ──► ImportCalculation        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use cellar_core::calculator::{calculate_import, ImportCalculation};
use cellar_core::currency::{convert_to_twd, resolve_rate, Conversion};
use cellar_core::tax::TaxInput;
use cellar_core::validation::{decimal_to_cents, percent_to_bps};
use cellar_core::{
    Currency, CustomerTier, ExchangeRate, Money, Product, TaxCategory, TaxSchedule, ValidationError,
};

use crate::error::{ok, ApiError, ApiResult};
use crate::state::{SharedState, Tenant};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/v1/tax/calculate`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    /// Invoice amount per bottle in the source currency (major units).
    pub amount: f64,
    pub currency: String,
    /// TWD per unit. Falls back to the tenant's stored rate.
    #[serde(default)]
    pub exchange_rate: Option<f64>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Percent, e.g. `15` for 15%.
    #[serde(default)]
    pub abv: Option<f64>,
    #[serde(default)]
    pub volume_ml: Option<u32>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Freight per bottle in TWD.
    #[serde(default)]
    pub shipping: Option<f64>,
    #[serde(default)]
    pub include_shipping: bool,
    #[serde(default = "default_include_tax")]
    pub include_tax: bool,
}

fn default_quantity() -> i64 {
    1
}

fn default_include_tax() -> bool {
    true
}

/// Body of `POST /api/v1/tax/convert`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub exchange_rate: Option<f64>,
}

// =============================================================================
// Input Assembly
// =============================================================================

/// The parts of a calculation request that need the database.
struct Lookups {
    product: Option<Product>,
    stored_rate: Option<ExchangeRate>,
}

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn manual_rate(rate: Option<f64>) -> Result<Option<ExchangeRate>, ValidationError> {
    rate.map(ExchangeRate::from_decimal).transpose()
}

/// Turns the edge representation into a fully typed `TaxInput`.
fn build_input(
    req: &CalculateRequest,
    currency: Currency,
    lookups: Lookups,
) -> Result<TaxInput, ApiError> {
    let product = lookups.product.as_ref();

    let category = match (&req.category, product) {
        (Some(raw), _) => raw.parse::<TaxCategory>()?,
        (None, Some(p)) => p.tax_category,
        (None, None) => return Err(required("category").into()),
    };

    let abv_bps = match (req.abv, product) {
        (Some(percent), _) => percent_to_bps("abv", percent)?,
        (None, Some(p)) => u32::try_from(p.abv_bps).map_err(|_| required("abv"))?,
        (None, None) => return Err(required("abv").into()),
    };

    let volume_ml = match (req.volume_ml, product) {
        (Some(ml), _) => ml,
        (None, Some(p)) => u32::try_from(p.volume_ml).map_err(|_| required("volume_ml"))?,
        (None, None) => return Err(required("volume_ml").into()),
    };

    let tier = match &req.tier {
        Some(raw) => raw.parse::<CustomerTier>()?,
        None => CustomerTier::Retail,
    };

    let exchange_rate = resolve_rate(currency, manual_rate(req.exchange_rate)?, lookups.stored_rate)?;

    let shipping = match req.shipping {
        Some(value) => Money::from_cents(decimal_to_cents("shipping", value)?),
        None => Money::zero(),
    };

    Ok(TaxInput {
        amount: Money::from_cents(decimal_to_cents("amount", req.amount)?),
        currency,
        exchange_rate,
        category,
        abv_bps,
        volume_ml,
        tier,
        quantity: req.quantity,
        shipping_per_unit: shipping,
        include_shipping: req.include_shipping,
        include_tax: req.include_tax,
    })
}

/// Reads the stored rate only when it could matter.
pub(crate) async fn stored_rate_for(
    state: &SharedState,
    tenant: &Tenant,
    currency: Currency,
    manual: Option<f64>,
) -> Result<Option<ExchangeRate>, ApiError> {
    if currency.is_home() || manual.is_some() {
        return Ok(None);
    }
    Ok(state.db.exchange_rates().get(tenant.id(), currency).await?)
}

/// Runs the calculator for a request, loading the product and stored rate.
pub(crate) async fn run_calculation(
    state: &SharedState,
    tenant: &Tenant,
    req: &CalculateRequest,
) -> Result<ImportCalculation, ApiError> {
    let currency: Currency = req.currency.parse()?;

    let product = match &req.product_id {
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

    let stored_rate = stored_rate_for(state, tenant, currency, req.exchange_rate).await?;
    let input = build_input(req, currency, Lookups { product, stored_rate })?;

    Ok(calculate_import(&input, &TaxSchedule::taiwan())?)
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/v1/tax/calculate`
pub async fn calculate(
    State(state): State<SharedState>,
    tenant: Tenant,
    Json(req): Json<CalculateRequest>,
) -> ApiResult<ImportCalculation> {
    debug!(tenant = %tenant.id(), currency = %req.currency, quantity = req.quantity, "calculate");

    let result = run_calculation(&state, &tenant, &req).await?;
    ok(result)
}

/// `POST /api/v1/tax/convert`
pub async fn convert(
    State(state): State<SharedState>,
    tenant: Tenant,
    Json(req): Json<ConvertRequest>,
) -> ApiResult<Conversion> {
    let currency: Currency = req.currency.parse()?;
    let amount = Money::from_cents(decimal_to_cents("amount", req.amount)?);
    let manual = manual_rate(req.exchange_rate)?;
    let stored = stored_rate_for(&state, &tenant, currency, req.exchange_rate).await?;

    ok(convert_to_twd(amount, currency, manual, stored)?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::test_support::{setup, tenant};
    use chrono::Utc;

    fn reference_request() -> CalculateRequest {
        CalculateRequest {
            amount: 80_000.0,
            currency: "JPY".to_string(),
            exchange_rate: Some(0.21),
            product_id: None,
            category: Some("sake".to_string()),
            abv: Some(15.0),
            volume_ml: Some(720),
            tier: None,
            quantity: 1,
            shipping: None,
            include_shipping: false,
            include_tax: true,
        }
    }

    #[tokio::test]
    async fn test_calculate_reference_example() {
        let state = setup().await;

        let Json(body) = calculate(State(state), tenant(), Json(reference_request()))
            .await
            .unwrap();
        let calc = body.data.unwrap();

        assert_eq!(calc.taxes.base_cost.cents(), 1_680_000);
        assert_eq!(calc.taxes.customs_duty.cents(), 336_000);
        assert_eq!(calc.taxes.alcohol_tax.cents(), 7_560);
        assert_eq!(calc.taxes.trade_promotion_fee.cents(), 672);
        assert_eq!(calc.taxes.business_tax.cents(), 101_178);
        assert_eq!(calc.taxes.landed_cost.cents(), 2_125_410);
        assert_eq!(calc.price.price_ex_tax.cents(), 2_975_600);
        assert_eq!(calc.price.output_tax.cents(), 148_780);
        assert_eq!(calc.price.suggested_price.cents(), 3_124_380);
        assert_eq!(calc.profit.unit_profit.cents(), 850_190);
        assert_eq!(calc.profit.margin_bps, 2857);
    }

    #[tokio::test]
    async fn test_calculate_uses_stored_rate_and_product() {
        let state = setup().await;
        state
            .db
            .exchange_rates()
            .upsert("t1", Currency::Jpy, ExchangeRate::from_micros(210_000))
            .await
            .unwrap();

        let now = Utc::now();
        let product = state
            .db
            .products()
            .insert(&Product {
                id: "p-dassai".to_string(),
                tenant_id: "t1".to_string(),
                sku: "DASSAI-45-720".to_string(),
                name: "Dassai 45".to_string(),
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

        let req = CalculateRequest {
            exchange_rate: None,
            product_id: Some(product.id),
            category: None,
            abv: None,
            volume_ml: None,
            ..reference_request()
        };

        let Json(body) = calculate(State(state), tenant(), Json(req)).await.unwrap();
        let calc = body.data.unwrap();
        assert_eq!(calc.exchange_rate_micros, 210_000);
        assert_eq!(calc.category, TaxCategory::Sake);
        assert_eq!(calc.taxes.landed_cost.cents(), 2_125_410);
    }

    #[tokio::test]
    async fn test_calculate_without_any_rate_is_business_error() {
        let state = setup().await;
        let req = CalculateRequest {
            exchange_rate: None,
            ..reference_request()
        };

        let err = calculate(State(state), tenant(), Json(req)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_calculate_rejects_bad_numbers() {
        let state = setup().await;

        let req = CalculateRequest {
            amount: f64::NAN,
            ..reference_request()
        };
        let err = calculate(State(state.clone()), tenant(), Json(req)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let req = CalculateRequest {
            quantity: 0,
            ..reference_request()
        };
        let err = calculate(State(state.clone()), tenant(), Json(req)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let req = CalculateRequest {
            category: None,
            ..reference_request()
        };
        let err = calculate(State(state), tenant(), Json(req)).await.unwrap_err();
        assert_eq!(err.message, "category is required");
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let state = setup().await;
        let req = CalculateRequest {
            product_id: Some("nope".to_string()),
            ..reference_request()
        };

        let err = calculate(State(state), tenant(), Json(req)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_deactivated_product_cannot_be_quoted() {
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

        let req = CalculateRequest {
            product_id: Some(product.id),
            ..reference_request()
        };
        let err = calculate(State(state), tenant(), Json(req)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_convert_twd_ignores_supplied_rate() {
        let state = setup().await;
        let req = ConvertRequest {
            amount: 1_000.0,
            currency: "twd".to_string(),
            exchange_rate: Some(5.0),
        };

        let Json(body) = convert(State(state), tenant(), Json(req)).await.unwrap();
        let conversion = body.data.unwrap();
        assert_eq!(conversion.rate_micros, 1_000_000);
        assert_eq!(conversion.twd_amount_cents, 100_000);
    }
}
