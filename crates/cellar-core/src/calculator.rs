//! # Import Calculator
//!
//! Ties tax, pricing and profit together for one import line.
//!
//! ```text
//!   TaxInput ──► calculate_taxes ──► TaxBreakdown.landed_cost
//!                                          │
//!                                          ▼
//!                                   suggest_price(tier) ──► analyze_profit(qty)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::Currency;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{analyze_profit, suggest_price, CustomerTier, PriceSuggestion, ProfitAnalysis};
use crate::tax::{calculate_taxes, TaxBreakdown, TaxCategory, TaxInput, TaxSchedule};

/// Per-line totals for the whole quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuantityTotals {
    pub quantity: i64,
    pub base_cost: Money,
    pub total_taxes: Money,
    pub total_fees: Money,
    pub landed_cost: Money,
    pub suggested_price: Money,
}

/// Everything the calculator returns for one import line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportCalculation {
    pub currency: Currency,
    pub source_amount: Money,
    pub exchange_rate_micros: u64,
    pub category: TaxCategory,
    pub abv_bps: u32,
    pub volume_ml: u32,
    pub tier: CustomerTier,
    pub taxes: TaxBreakdown,
    pub price: PriceSuggestion,
    pub profit: ProfitAnalysis,
    pub totals: QuantityTotals,
}

/// Runs the full calculation for one import line.
///
/// The schedule's business tax rate doubles as the output tax on the
/// suggested price.
pub fn calculate_import(input: &TaxInput, schedule: &TaxSchedule) -> CoreResult<ImportCalculation> {
    let taxes = calculate_taxes(input, schedule)?;
    let price = suggest_price(
        taxes.landed_cost,
        input.tier,
        input.include_tax,
        schedule.business_tax_rate,
    );
    let profit = analyze_profit(&price, input.quantity)?;

    let times_quantity = |amount: Money, what: &'static str| {
        amount
            .checked_multiply_quantity(input.quantity)
            .ok_or(CoreError::AmountOverflow(what))
    };

    let totals = QuantityTotals {
        quantity: input.quantity,
        base_cost: times_quantity(taxes.base_cost, "total base cost")?,
        total_taxes: times_quantity(taxes.total_taxes, "total taxes")?,
        total_fees: times_quantity(taxes.total_fees, "total fees")?,
        landed_cost: times_quantity(taxes.landed_cost, "total landed cost")?,
        suggested_price: times_quantity(price.suggested_price, "total price")?,
    };

    Ok(ImportCalculation {
        currency: input.currency,
        source_amount: input.amount,
        exchange_rate_micros: input.exchange_rate.micros(),
        category: input.category,
        abv_bps: input.abv_bps,
        volume_ml: input.volume_ml,
        tier: input.tier,
        taxes,
        price,
        profit,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::ExchangeRate;

    fn reference_input(quantity: i64) -> TaxInput {
        TaxInput {
            amount: Money::from_major_minor(80_000, 0),
            currency: Currency::Jpy,
            exchange_rate: ExchangeRate::from_micros(210_000),
            category: TaxCategory::Sake,
            abv_bps: 1500,
            volume_ml: 720,
            tier: CustomerTier::Retail,
            quantity,
            shipping_per_unit: Money::zero(),
            include_shipping: false,
            include_tax: true,
        }
    }

    #[test]
    fn test_reference_calculation() {
        let calc = calculate_import(&reference_input(1), &TaxSchedule::taiwan()).unwrap();

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
        assert_eq!(calc.exchange_rate_micros, 210_000);
    }

    #[test]
    fn test_quantity_totals() {
        let calc = calculate_import(&reference_input(6), &TaxSchedule::taiwan()).unwrap();

        assert_eq!(calc.totals.quantity, 6);
        assert_eq!(calc.totals.base_cost.cents(), 10_080_000);
        assert_eq!(calc.totals.landed_cost.cents(), 12_752_460);
        assert_eq!(calc.totals.suggested_price.cents(), 18_746_280);
        assert_eq!(calc.profit.total_profit.cents(), 5_101_140);
    }

    #[test]
    fn test_invalid_quantity_fails_before_math() {
        assert!(matches!(
            calculate_import(&reference_input(0), &TaxSchedule::taiwan()),
            Err(CoreError::Validation(_))
        ));
    }
}
