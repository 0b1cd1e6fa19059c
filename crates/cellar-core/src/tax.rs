//! # Import Tax Module
//!
//! Taiwan import taxes on alcoholic beverages.
//!
//! ## Computation Sequence (per bottle, TWD cents)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base cost ────────────── convert(invoice amount, rate)                 │
//! │  + shipping, insurance ── only when include_shipping (CIF vs FOB)       │
//! │  = dutiable value                                                       │
//! │                                                                         │
//! │  customs duty ────────── dutiable value × duty rate (by category)       │
//! │  alcohol tax ─────────── litres × NT$/L  or  litres × degrees × NT$     │
//! │  trade promotion fee ─── dutiable value × 0.04%                         │
//! │  business tax ────────── (dutiable + duty + alcohol tax) × 5%           │
//! │                                                                         │
//! │  landed cost = base + taxes + fees                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rates are domain constants ([`TaxSchedule::taiwan`]), nothing here is
//! looked up at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::currency::{convert, Currency, ExchangeRate};
use crate::error::{CoreResult, ValidationError};
use crate::money::{div_round, Money};
use crate::pricing::CustomerTier;
use crate::types::TaxRate;
use crate::validation::{validate_abv, validate_non_negative, validate_quantity, validate_volume};

// =============================================================================
// Tax Category
// =============================================================================

/// How the alcohol tax is assessed for one bottle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlcoholTaxBasis {
    /// Fixed cents per litre.
    PerLitre(i64),
    /// Cents per litre per degree of alcohol.
    PerLitreDegree(i64),
}

/// Product tax category under the Tobacco and Alcohol Tax Act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxCategory {
    Beer,
    /// Brewed fruit wine (grape wine, cider, ...).
    Wine,
    /// Brewed rice wine.
    Sake,
    /// Distilled spirits (whisky, brandy, shochu, ...).
    Spirits,
    /// Reprocessed alcohol (liqueurs, umeshu, ...).
    Liqueur,
    CookingWine,
}

impl TaxCategory {
    /// Every category.
    pub const ALL: [TaxCategory; 6] = [
        TaxCategory::Beer,
        TaxCategory::Wine,
        TaxCategory::Sake,
        TaxCategory::Spirits,
        TaxCategory::Liqueur,
        TaxCategory::CookingWine,
    ];

    /// Customs duty rate.
    pub const fn duty_rate(&self) -> TaxRate {
        match self {
            TaxCategory::Beer => TaxRate::from_bps(0),
            TaxCategory::Wine => TaxRate::from_bps(1000),
            TaxCategory::Sake => TaxRate::from_bps(2000),
            TaxCategory::Spirits => TaxRate::from_bps(0),
            TaxCategory::Liqueur => TaxRate::from_bps(2000),
            TaxCategory::CookingWine => TaxRate::from_bps(1500),
        }
    }

    /// Alcohol tax basis for a bottle of the given strength.
    ///
    /// Reprocessed alcohol switches to a flat per-litre charge above the
    /// schedule's high-strength threshold.
    pub fn alcohol_tax_basis(&self, abv_bps: u32, schedule: &TaxSchedule) -> AlcoholTaxBasis {
        match self {
            TaxCategory::Beer => AlcoholTaxBasis::PerLitre(2600),
            TaxCategory::Wine | TaxCategory::Sake => AlcoholTaxBasis::PerLitreDegree(700),
            TaxCategory::Spirits => AlcoholTaxBasis::PerLitreDegree(250),
            TaxCategory::Liqueur => {
                if abv_bps > schedule.reprocessed_high_abv_bps {
                    AlcoholTaxBasis::PerLitre(18_500)
                } else {
                    AlcoholTaxBasis::PerLitreDegree(700)
                }
            }
            TaxCategory::CookingWine => AlcoholTaxBasis::PerLitre(900),
        }
    }

    /// Wire/database spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaxCategory::Beer => "BEER",
            TaxCategory::Wine => "WINE",
            TaxCategory::Sake => "SAKE",
            TaxCategory::Spirits => "SPIRITS",
            TaxCategory::Liqueur => "LIQUEUR",
            TaxCategory::CookingWine => "COOKING_WINE",
        }
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxCategory {
    type Err = ValidationError;

    /// Accepts the canonical names plus the words staff type into chat.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "beer" | "啤酒" => TaxCategory::Beer,
            "wine" | "red_wine" | "white_wine" | "cider" | "葡萄酒" => TaxCategory::Wine,
            "sake" | "nihonshu" | "清酒" | "日本酒" => TaxCategory::Sake,
            "spirits" | "whisky" | "whiskey" | "brandy" | "shochu" | "vodka" | "gin" | "威士忌" => {
                TaxCategory::Spirits
            }
            "liqueur" | "umeshu" | "梅酒" => TaxCategory::Liqueur,
            "cooking_wine" | "mirin" | "料理酒" => TaxCategory::CookingWine,
            _ => {
                let names: Vec<&str> = TaxCategory::ALL.iter().map(TaxCategory::as_str).collect();
                return Err(ValidationError::not_allowed("category", &names));
            }
        };
        Ok(category)
    }
}

// =============================================================================
// Tax Schedule
// =============================================================================

/// Flat rates applied on top of the per-category duty and alcohol tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSchedule {
    /// Business tax (VAT) on imports, also used as output tax on prices.
    pub business_tax_rate: TaxRate,
    /// Trade promotion service fee on the dutiable value.
    pub trade_promotion_fee_rate: TaxRate,
    /// Cargo insurance on the base cost when shipping is included.
    pub insurance_rate: TaxRate,
    /// Above this strength reprocessed alcohol is taxed per litre.
    pub reprocessed_high_abv_bps: u32,
}

impl TaxSchedule {
    /// Current Taiwan rates.
    pub const fn taiwan() -> Self {
        TaxSchedule {
            business_tax_rate: TaxRate::from_bps(500),
            trade_promotion_fee_rate: TaxRate::from_bps(4),
            insurance_rate: TaxRate::from_bps(50),
            reprocessed_high_abv_bps: 2000,
        }
    }
}

impl Default for TaxSchedule {
    fn default() -> Self {
        TaxSchedule::taiwan()
    }
}

// =============================================================================
// Input
// =============================================================================

/// Everything the calculator needs for one import line.
#[derive(Debug, Clone)]
pub struct TaxInput {
    /// Invoice amount per bottle, minor units of `currency`.
    pub amount: Money,
    pub currency: Currency,
    /// Already resolved rate (see [`crate::currency::resolve_rate`]).
    pub exchange_rate: ExchangeRate,
    pub category: TaxCategory,
    pub abv_bps: u32,
    pub volume_ml: u32,
    pub tier: CustomerTier,
    pub quantity: i64,
    /// Freight per bottle, already in TWD.
    pub shipping_per_unit: Money,
    pub include_shipping: bool,
    /// Quote the suggested price with output business tax included.
    pub include_tax: bool,
}

impl TaxInput {
    /// Checks every numeric field before any arithmetic runs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_negative("amount", self.amount.cents())?;
        validate_non_negative("shipping", self.shipping_per_unit.cents())?;
        validate_quantity(self.quantity)?;
        validate_abv(self.abv_bps)?;
        validate_volume(self.volume_ml)?;
        Ok(())
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// Per-bottle tax and fee breakdown in TWD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub base_cost: Money,
    pub shipping: Money,
    pub insurance: Money,
    pub dutiable_value: Money,
    pub duty_rate: TaxRate,
    pub customs_duty: Money,
    pub alcohol_tax: Money,
    pub trade_promotion_fee: Money,
    pub business_tax: Money,
    pub total_taxes: Money,
    pub total_fees: Money,
    pub landed_cost: Money,
}

/// Alcohol tax for one bottle.
///
/// ## Example
/// ```rust
/// use cellar_core::tax::{alcohol_tax, TaxCategory, TaxSchedule};
///
/// // 720 ml sake at 15%: 0.72 L × 15° × NT$7 = NT$75.60
/// let tax = alcohol_tax(TaxCategory::Sake, 1500, 720, &TaxSchedule::taiwan());
/// assert_eq!(tax.cents(), 7560);
/// ```
pub fn alcohol_tax(
    category: TaxCategory,
    abv_bps: u32,
    volume_ml: u32,
    schedule: &TaxSchedule,
) -> Money {
    let volume = volume_ml as i128;
    let cents = match category.alcohol_tax_basis(abv_bps, schedule) {
        AlcoholTaxBasis::PerLitre(per_litre) => div_round(volume * per_litre as i128, 1000),
        AlcoholTaxBasis::PerLitreDegree(per_degree) => {
            // ml → L is /1000, bps → degrees is /100
            div_round(volume * abv_bps as i128 * per_degree as i128, 100_000)
        }
    };
    Money::from_cents(cents as i64)
}

/// Runs the fixed tax sequence for one bottle.
///
/// ## Errors
/// - `CoreError::Validation` for negative amounts or out-of-range inputs
/// - `CoreError::AmountOverflow` when the conversion leaves `i64`
pub fn calculate_taxes(input: &TaxInput, schedule: &TaxSchedule) -> CoreResult<TaxBreakdown> {
    input.validate()?;

    let base_cost = convert(input.amount, input.exchange_rate)?;

    let (shipping, insurance) = if input.include_shipping {
        (input.shipping_per_unit, base_cost.apply_rate(schedule.insurance_rate))
    } else {
        (Money::zero(), Money::zero())
    };

    let dutiable_value = base_cost + shipping + insurance;
    let duty_rate = input.category.duty_rate();
    let customs_duty = dutiable_value.apply_rate(duty_rate);
    let alcohol_tax = alcohol_tax(input.category, input.abv_bps, input.volume_ml, schedule);
    let trade_promotion_fee = dutiable_value.apply_rate(schedule.trade_promotion_fee_rate);
    let business_tax =
        (dutiable_value + customs_duty + alcohol_tax).apply_rate(schedule.business_tax_rate);

    let total_taxes = customs_duty + alcohol_tax + business_tax;
    let total_fees = shipping + insurance + trade_promotion_fee;
    let landed_cost = base_cost + total_taxes + total_fees;

    Ok(TaxBreakdown {
        base_cost,
        shipping,
        insurance,
        dutiable_value,
        duty_rate,
        customs_duty,
        alcohol_tax,
        trade_promotion_fee,
        business_tax,
        total_taxes,
        total_fees,
        landed_cost,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
