//! # Pricing Module
//!
//! Suggested selling prices and profit analysis.
//!
//! ## Markup by Customer Tier
//! ```text
//! ┌──────────────┬─────────┐
//! │ Tier         │ Markup  │
//! ├──────────────┼─────────┤
//! │ RETAIL       │  40%    │
//! │ MEMBER       │  30%    │
//! │ WHOLESALE    │  20%    │
//! │ DISTRIBUTOR  │  15%    │
//! └──────────────┴─────────┘
//! ```
//!
//! Suggested price = landed cost × (1 + markup), rounded up to whole NT$.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{div_ceil, Money};
use crate::types::TaxRate;

// =============================================================================
// Customer Tier
// =============================================================================

/// Who the bottle is being priced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerTier {
    Retail,
    Member,
    Wholesale,
    Distributor,
}

impl CustomerTier {
    /// Every tier, highest markup first.
    pub const ALL: [CustomerTier; 4] = [
        CustomerTier::Retail,
        CustomerTier::Member,
        CustomerTier::Wholesale,
        CustomerTier::Distributor,
    ];

    /// Markup applied on top of landed cost.
    pub const fn markup(&self) -> TaxRate {
        match self {
            CustomerTier::Retail => TaxRate::from_bps(4000),
            CustomerTier::Member => TaxRate::from_bps(3000),
            CustomerTier::Wholesale => TaxRate::from_bps(2000),
            CustomerTier::Distributor => TaxRate::from_bps(1500),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            CustomerTier::Retail => "RETAIL",
            CustomerTier::Member => "MEMBER",
            CustomerTier::Wholesale => "WHOLESALE",
            CustomerTier::Distributor => "DISTRIBUTOR",
        }
    }
}

impl Default for CustomerTier {
    fn default() -> Self {
        CustomerTier::Retail
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retail" | "零售" => Ok(CustomerTier::Retail),
            "member" | "vip" | "會員" => Ok(CustomerTier::Member),
            "wholesale" | "批發" => Ok(CustomerTier::Wholesale),
            "distributor" | "經銷" => Ok(CustomerTier::Distributor),
            _ => {
                let names: Vec<&str> = CustomerTier::ALL.iter().map(CustomerTier::as_str).collect();
                Err(ValidationError::not_allowed("tier", &names))
            }
        }
    }
}

// =============================================================================
// Price Suggestion
// =============================================================================

/// A suggested selling price for one bottle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceSuggestion {
    pub tier: CustomerTier,
    pub markup: TaxRate,
    pub unit_cost: Money,
    /// Price before output business tax, whole NT$.
    pub price_ex_tax: Money,
    pub output_tax: Money,
    /// The price to quote: tax-inclusive when `include_tax` was set.
    pub suggested_price: Money,
    pub include_tax: bool,
}

/// Suggests a price for `cost` at the tier's markup.
///
/// ## Example
/// ```rust
/// use cellar_core::money::Money;
/// use cellar_core::pricing::{suggest_price, CustomerTier};
/// use cellar_core::types::TaxRate;
///
/// let s = suggest_price(Money::from_cents(2_125_410), CustomerTier::Retail, false, TaxRate::from_bps(500));
/// // 21,254.10 × 1.4 = 29,755.74 → 29,756
/// assert_eq!(s.suggested_price.cents(), 2_975_600);
/// ```
pub fn suggest_price(
    cost: Money,
    tier: CustomerTier,
    include_tax: bool,
    output_tax_rate: TaxRate,
) -> PriceSuggestion {
    let markup = tier.markup();
    // Round up straight from the exact product so no cent is lost twice.
    let scaled = cost.cents() as i128 * (10_000 + markup.bps() as i128);
    let whole_dollars = div_ceil(scaled, 10_000 * 100);
    let price_ex_tax = Money::from_cents((whole_dollars * 100) as i64);

    let output_tax = price_ex_tax.apply_rate(output_tax_rate);
    let suggested_price = if include_tax {
        price_ex_tax + output_tax
    } else {
        price_ex_tax
    };

    PriceSuggestion {
        tier,
        markup,
        unit_cost: cost,
        price_ex_tax,
        output_tax,
        suggested_price,
        include_tax,
    }
}

// =============================================================================
// Profit Analysis
// =============================================================================

/// Profit at the suggested price, per bottle and for the whole quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitAnalysis {
    pub unit_profit: Money,
    /// Profit over ex-tax price in basis points (floor); 0 for a zero price.
    pub margin_bps: i64,
    pub quantity: i64,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
}

/// Computes profit for `quantity` bottles at `suggestion`.
///
/// Revenue is the ex-tax price: output tax is collected for the state.
pub fn analyze_profit(suggestion: &PriceSuggestion, quantity: i64) -> CoreResult<ProfitAnalysis> {
    let unit_profit = suggestion.price_ex_tax - suggestion.unit_cost;

    let margin_bps = if suggestion.price_ex_tax.is_zero() {
        0
    } else {
        (unit_profit.cents() as i128 * 10_000 / suggestion.price_ex_tax.cents() as i128) as i64
    };

    let total_revenue = suggestion
        .price_ex_tax
        .checked_multiply_quantity(quantity)
        .ok_or(CoreError::AmountOverflow("total revenue"))?;
    let total_cost = suggestion
        .unit_cost
        .checked_multiply_quantity(quantity)
        .ok_or(CoreError::AmountOverflow("total cost"))?;

    Ok(ProfitAnalysis {
        unit_profit,
        margin_bps,
        quantity,
        total_revenue,
        total_cost,
        total_profit: total_revenue - total_cost,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
