//! # Cash Flow Derivation
//!
//! Turns a sale order into the ledger entries it implies.
//!
//! ## Derivation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale status                                                            │
//! │     │                                                                   │
//! │     ├── DRAFT / PREORDER / CANCELLED ──► no entries                    │
//! │     │                                                                   │
//! │     └── CONFIRMED / SHIPPED / DELIVERED / PAID                         │
//! │            │                                                            │
//! │            ├── INCOME   actual_total     (REVENUE, sale_revenue)       │
//! │            ├── EXPENSE  investor_total   (INVESTOR_PAYOUT)             │
//! │            └── commission = actual - investor                          │
//! │                   > 0 ──► INCOME  |commission|                         │
//! │                   < 0 ──► EXPENSE |commission|                         │
//! │                   = 0 ──► nothing                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module only plans. Persisting the plan (delete-then-insert inside a
//! transaction) is the job of `cellar_db::ledger`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CashFlowType, EntryKind, FundingSource, Sale, SaleItem};

/// Ledger category for customer revenue.
pub const CATEGORY_SALE_REVENUE: &str = "sale_revenue";
/// Ledger category for the amount owed back to the capital source.
pub const CATEGORY_INVESTOR_SETTLEMENT: &str = "investor_settlement";
/// Ledger category for the house's spread.
pub const CATEGORY_COMMISSION: &str = "commission";

/// Builds the reference key tying ledger rows to a sale.
///
/// ## Example
/// ```rust
/// use cellar_core::cashflow::reference_key;
///
/// assert_eq!(reference_key("abc"), "sale:abc");
/// ```
pub fn reference_key(sale_id: &str) -> String {
    format!("sale:{sale_id}")
}

// =============================================================================
// Totals
// =============================================================================

/// Sums over the line items of one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashFlowTotals {
    /// Σ unit_price × quantity.
    pub investor_total: Money,
    /// Σ (actual_unit_price or unit_price) × quantity.
    pub actual_total: Money,
    /// actual_total - investor_total; may be negative.
    pub commission: Money,
}

/// Computes investor and actual totals for a set of line items.
pub fn compute_totals(items: &[SaleItem]) -> CoreResult<CashFlowTotals> {
    let mut investor_total = Money::zero();
    let mut actual_total = Money::zero();

    for item in items {
        let investor_line = item
            .unit_price()
            .checked_multiply_quantity(item.quantity)
            .ok_or(CoreError::AmountOverflow("investor total"))?;
        let actual_line = item
            .effective_unit_price()
            .checked_multiply_quantity(item.quantity)
            .ok_or(CoreError::AmountOverflow("actual total"))?;

        investor_total = investor_total
            .checked_add(investor_line)
            .ok_or(CoreError::AmountOverflow("investor total"))?;
        actual_total = actual_total
            .checked_add(actual_line)
            .ok_or(CoreError::AmountOverflow("actual total"))?;
    }

    Ok(CashFlowTotals {
        investor_total,
        actual_total,
        commission: actual_total - investor_total,
    })
}

// =============================================================================
// Plan
// =============================================================================

/// A ledger entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCashFlowEntry {
    pub flow_type: CashFlowType,
    pub entry_kind: EntryKind,
    /// Always non-negative.
    pub amount: Money,
    pub category: String,
    pub funding_source: FundingSource,
    pub source_version: i64,
    pub description: Option<String>,
}

/// The full set of entries a sale should have right now.
///
/// An empty `entries` list means every existing row for `reference_key`
/// must go. `totals` is only computed for settled sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashFlowPlan {
    pub reference_key: String,
    pub totals: Option<CashFlowTotals>,
    pub entries: Vec<NewCashFlowEntry>,
}

impl CashFlowPlan {
    /// True when the sale should have no ledger rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives the ledger entries for `sale` from its line items.
///
/// ## Example
/// ```rust,ignore
/// let plan = derive_entries(&sale, &items)?;
/// // CONFIRMED, items (1000×1 actual 1200) + (500×2):
/// // INCOME 2200, EXPENSE 2000, INCOME 200
/// assert_eq!(plan.entries.len(), 3);
/// ```
pub fn derive_entries(sale: &Sale, items: &[SaleItem]) -> CoreResult<CashFlowPlan> {
    let reference_key = reference_key(&sale.id);

    if !sale.status.is_settled() {
        return Ok(CashFlowPlan {
            reference_key,
            totals: None,
            entries: Vec::new(),
        });
    }

    let totals = compute_totals(items)?;

    let entry = |flow_type, entry_kind, amount: Money, category: &str, description: String| {
        NewCashFlowEntry {
            flow_type,
            entry_kind,
            amount,
            category: category.to_string(),
            funding_source: sale.funding_source,
            source_version: sale.sync_version,
            description: Some(description),
        }
    };

    let mut entries = vec![
        entry(
            CashFlowType::Income,
            EntryKind::Revenue,
            totals.actual_total,
            CATEGORY_SALE_REVENUE,
            format!("Sale {} revenue", sale.order_number),
        ),
        entry(
            CashFlowType::Expense,
            EntryKind::InvestorPayout,
            totals.investor_total,
            CATEGORY_INVESTOR_SETTLEMENT,
            format!("Sale {} investor settlement", sale.order_number),
        ),
    ];

    if !totals.commission.is_zero() {
        let flow_type = if totals.commission.is_positive() {
            CashFlowType::Income
        } else {
            CashFlowType::Expense
        };
        entries.push(entry(
            flow_type,
            EntryKind::Commission,
            totals.commission.abs(),
            CATEGORY_COMMISSION,
            format!("Sale {} commission", sale.order_number),
        ));
    }

    Ok(CashFlowPlan {
        reference_key,
        totals: Some(totals),
        entries,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleStatus;
    use chrono::Utc;

    fn sale(status: SaleStatus) -> Sale {
        Sale {
            id: "s-1".to_string(),
            tenant_id: "default".to_string(),
            order_number: "SO-1".to_string(),
            customer_name: "Lin".to_string(),
            status,
            funding_source: FundingSource::Personal,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            sync_version: 4,
        }
    }

    fn item(unit: i64, qty: i64, actual: Option<i64>) -> SaleItem {
        SaleItem {
            id: format!("i-{unit}-{qty}"),
            sale_id: "s-1".to_string(),
            product_id: None,
            name_snapshot: "Bottle".to_string(),
            quantity: qty,
            unit_price_cents: unit,
            actual_unit_price_cents: actual,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_two_item_example() {
        let items = vec![item(1000, 1, Some(1200)), item(500, 2, None)];
        let plan = derive_entries(&sale(SaleStatus::Confirmed), &items).unwrap();

        assert_eq!(plan.reference_key, "sale:s-1");
        let totals = plan.totals.unwrap();
        assert_eq!(totals.investor_total.cents(), 2000);
        assert_eq!(totals.actual_total.cents(), 2200);
        assert_eq!(totals.commission.cents(), 200);

        let summary: Vec<(CashFlowType, EntryKind, i64)> = plan
            .entries
            .iter()
            .map(|e| (e.flow_type, e.entry_kind, e.amount.cents()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CashFlowType::Income, EntryKind::Revenue, 2200),
                (CashFlowType::Expense, EntryKind::InvestorPayout, 2000),
                (CashFlowType::Income, EntryKind::Commission, 200),
            ]
        );
        assert!(plan
            .entries
            .iter()
            .all(|e| e.funding_source == FundingSource::Personal && e.source_version == 4));
    }

    #[test]
    fn test_negative_commission_is_an_expense() {
        let items = vec![item(1000, 2, Some(900))];
        let plan = derive_entries(&sale(SaleStatus::Paid), &items).unwrap();

        let commission = plan
            .entries
            .iter()
            .find(|e| e.entry_kind == EntryKind::Commission)
            .unwrap();
        assert_eq!(commission.flow_type, CashFlowType::Expense);
        assert_eq!(commission.amount.cents(), 200);
        assert_eq!(commission.category, CATEGORY_COMMISSION);
    }

    #[test]
    fn test_no_commission_when_prices_match() {
        let items = vec![item(1000, 3, Some(1000)), item(250, 4, None)];
        let plan = derive_entries(&sale(SaleStatus::Shipped), &items).unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert!(plan
            .entries
            .iter()
            .all(|e| e.entry_kind != EntryKind::Commission));
    }

    #[test]
    fn test_unsettled_statuses_plan_nothing() {
        let items = vec![item(1000, 1, Some(1200))];
        for status in [SaleStatus::Draft, SaleStatus::Cancelled, SaleStatus::Preorder] {
            let plan = derive_entries(&sale(status), &items).unwrap();
            assert!(plan.is_empty(), "{status} should not produce entries");
            assert!(plan.totals.is_none());
        }
    }

    #[test]
    fn test_unsettled_sale_skips_overflowing_totals() {
        let items = vec![item(i64::MAX / 2, 3, None)];
        let plan = derive_entries(&sale(SaleStatus::Draft), &items).unwrap();
        assert!(plan.is_empty());

        assert!(matches!(
            derive_entries(&sale(SaleStatus::Paid), &items),
            Err(CoreError::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_settled_sale_without_items() {
        let plan = derive_entries(&sale(SaleStatus::Delivered), &[]).unwrap();
        // Zero rows are still written so the ledger reflects the sale
        assert_eq!(plan.entries.len(), 2);
        assert!(plan.entries.iter().all(|e| e.amount.is_zero()));
    }

    #[test]
    fn test_totals_overflow() {
        let items = vec![item(i64::MAX / 2, 3, None)];
        assert!(matches!(
            compute_totals(&items),
            Err(CoreError::AmountOverflow(_))
        ));
    }
}
