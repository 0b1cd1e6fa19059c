//! # LINE Bot Simulation
//!
//! `POST /api/v1/line/simulate` answers a chat message the way the desk's
//! LINE bot would, without talking to LINE.
//!
//! ## Message Format
//! ```text
//! <amount> <currency> <category> [tier]
//!
//!   80000 JPY sake           → retail quote, 720 ml at 15%
//!   45 usd spirits wholesale → wholesale quote, 700 ml at 40%
//! ```
//!
//! ABV and volume come from a typical bottle of the category. Unparseable
//! messages get the usage text back instead of an error.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cellar_core::calculator::ImportCalculation;
use cellar_core::{Currency, CustomerTier, TaxCategory, ValidationError};

use crate::error::{ok, ApiResult};
use crate::handlers::tax::{run_calculation, CalculateRequest};
use crate::state::{SharedState, Tenant};

const USAGE: &str = "Send: <amount> <currency> <category> [tier]\n\
                     e.g. 80000 JPY sake\n\
                     categories: beer, wine, sake, spirits, liqueur, cooking_wine\n\
                     tiers: retail, member, wholesale, distributor";

/// Body of `POST /api/v1/line/simulate`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateRequest {
    pub text: String,
}

/// What the bot would send back.
#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub reply: String,
    pub calculation: Option<ImportCalculation>,
}

/// A parsed chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteCommand {
    pub amount: f64,
    pub currency: Currency,
    pub category: TaxCategory,
    pub tier: CustomerTier,
}

/// Parses `"<amount> <currency> <category> [tier]"`.
///
/// Thousands separators in the amount are accepted (`80,000`).
pub fn parse_command(text: &str) -> Result<QuoteCommand, ValidationError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if !(3..=4).contains(&words.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "text".to_string(),
            reason: "expected <amount> <currency> <category> [tier]".to_string(),
        });
    }

    let amount: f64 = words[0]
        .replace(',', "")
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not a number", words[0]),
        })?;

    let tier = match words.get(3) {
        Some(raw) => raw.parse()?,
        None => CustomerTier::Retail,
    };

    Ok(QuoteCommand {
        amount,
        currency: words[1].parse()?,
        category: words[2].parse()?,
        tier,
    })
}

/// Typical bottle per category: (ABV percent, volume ml).
fn typical_bottle(category: TaxCategory) -> (f64, u32) {
    match category {
        TaxCategory::Beer => (5.0, 350),
        TaxCategory::Wine => (13.0, 750),
        TaxCategory::Sake => (15.0, 720),
        TaxCategory::Spirits => (40.0, 700),
        TaxCategory::Liqueur => (20.0, 700),
        TaxCategory::CookingWine => (14.0, 1000),
    }
}

/// Renders the chat reply for a finished calculation.
fn format_reply(calc: &ImportCalculation) -> String {
    let taxes = &calc.taxes;
    let price = &calc.price;

    let mut lines = vec![
        format!(
            "{} {}ml {}.{:02}% ({})",
            calc.category,
            calc.volume_ml,
            calc.abv_bps / 100,
            calc.abv_bps % 100,
            calc.tier
        ),
        format!(
            "{} → NT${}",
            calc.currency.format(calc.source_amount),
            taxes.base_cost
        ),
        format!("Duty NT${}", taxes.customs_duty),
        format!("Alcohol tax NT${}", taxes.alcohol_tax),
        format!("Business tax NT${}", taxes.business_tax),
        format!("Trade fee NT${}", taxes.trade_promotion_fee),
    ];
    if !taxes.shipping.is_zero() || !taxes.insurance.is_zero() {
        lines.push(format!(
            "Shipping NT${} + insurance NT${}",
            taxes.shipping, taxes.insurance
        ));
    }
    lines.push(format!("Landed cost NT${}", taxes.landed_cost));
    lines.push(if price.include_tax {
        format!("Suggested NT${} (tax incl.)", price.suggested_price)
    } else {
        format!("Suggested NT${}", price.suggested_price)
    });
    lines.push(format!(
        "Profit NT${} ({}.{:02}%)",
        calc.profit.unit_profit,
        calc.profit.margin_bps / 100,
        (calc.profit.margin_bps % 100).abs()
    ));

    lines.join("\n")
}

/// `POST /api/v1/line/simulate`
pub async fn simulate(
    State(state): State<SharedState>,
    tenant: Tenant,
    Json(req): Json<SimulateRequest>,
) -> ApiResult<SimulateResponse> {
    let command = match parse_command(&req.text) {
        Ok(command) => command,
        Err(e) => {
            debug!(text = %req.text, error = %e, "Unparseable LINE message");
            return ok(SimulateResponse {
                reply: format!("{e}\n\n{USAGE}"),
                calculation: None,
            });
        }
    };

    let (abv, volume_ml) = typical_bottle(command.category);
    let calc_request = CalculateRequest {
        amount: command.amount,
        currency: command.currency.code().to_string(),
        exchange_rate: None,
        product_id: None,
        category: Some(command.category.as_str().to_string()),
        abv: Some(abv),
        volume_ml: Some(volume_ml),
        tier: Some(command.tier.as_str().to_string()),
        quantity: 1,
        shipping: None,
        include_shipping: false,
        include_tax: true,
    };

    let calculation = run_calculation(&state, &tenant, &calc_request).await?;
    ok(SimulateResponse {
        reply: format_reply(&calculation),
        calculation: Some(calculation),
    })
}
