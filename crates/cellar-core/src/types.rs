//! # Domain Types
//!
//! Core domain types used throughout the Cellar back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    SaleItem     │   │ CashFlowRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  sale_id (FK)   │   │  reference_key  │       │
//! │  │  order_number   │   │  unit_price     │   │  flow_type      │       │
//! │  │  status         │   │  actual_price?  │   │  entry_kind     │       │
//! │  │  funding_source │   │  quantity       │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   SaleStatus    │   │ FundingSource   │       │
//! │  │  bps (u32)      │   │  Draft ... Paid │   │  Company        │       │
//! │  │  500 = 5%       │   │  Cancelled      │   │  Personal       │       │
//! │  └─────────────────┘   │  Preorder       │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Multi-Tenancy
//! Every persisted entity carries `tenant_id`; repositories always filter
//! on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::{Currency, ExchangeRate};
use crate::money::Money;
use crate::tax::TaxCategory;

// =============================================================================
// Tax Rate
// =============================================================================

/// A rate represented in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 500 bps is the 5% business tax.
/// Also used for markups and ABV (1 degree of alcohol = 100 bps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The lifecycle status of a sale order.
///
/// ```text
/// DRAFT ──► CONFIRMED ──► SHIPPED ──► DELIVERED
///   │            │                      PAID
///   ├──► PREORDER
///   └──────────────────────────────► CANCELLED
/// ```
///
/// Only settled orders (CONFIRMED, SHIPPED, DELIVERED, PAID) produce ledger
/// entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    /// Order is being prepared.
    Draft,
    /// Customer confirmed the order.
    Confirmed,
    /// Goods left the warehouse.
    Shipped,
    /// Goods reached the customer.
    Delivered,
    /// Customer paid in full.
    Paid,
    /// Order was called off.
    Cancelled,
    /// Order is waiting on an inbound shipment.
    Preorder,
}

impl SaleStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [SaleStatus; 7] = [
        SaleStatus::Draft,
        SaleStatus::Confirmed,
        SaleStatus::Shipped,
        SaleStatus::Delivered,
        SaleStatus::Paid,
        SaleStatus::Cancelled,
        SaleStatus::Preorder,
    ];

    /// Returns true when the order counts towards the cash-flow ledger.
    pub const fn is_settled(&self) -> bool {
        matches!(
            self,
            SaleStatus::Confirmed | SaleStatus::Shipped | SaleStatus::Delivered | SaleStatus::Paid
        )
    }

    /// Wire/database spelling of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "DRAFT",
            SaleStatus::Confirmed => "CONFIRMED",
            SaleStatus::Shipped => "SHIPPED",
            SaleStatus::Delivered => "DELIVERED",
            SaleStatus::Paid => "PAID",
            SaleStatus::Cancelled => "CANCELLED",
            SaleStatus::Preorder => "PREORDER",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Draft
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Funding Source
// =============================================================================

/// Where the capital behind a sale comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundingSource {
    /// Investor-backed company capital.
    Company,
    /// The trader's own money.
    Personal,
}

impl Default for FundingSource {
    fn default() -> Self {
        FundingSource::Company
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale order header. Items live in [`SaleItem`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    /// Human-readable order number, e.g. `SO-20260131-4821`.
    pub order_number: String,
    pub customer_name: String,
    pub status: SaleStatus,
    pub funding_source: FundingSource,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Incremented on every mutation; ledger rows record the version they
    /// were derived from.
    pub sync_version: i64,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// `unit_price_cents` is what the capital source expects back per bottle;
/// `actual_unit_price_cents` is what the customer really paid. The spread is
/// the house's commission.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: Option<String>,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Investor unit price in cents.
    pub unit_price_cents: i64,
    /// Actual unit price in cents, when it differs from the investor price.
    pub actual_unit_price_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the investor unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the price the customer paid, falling back to the investor price.
    #[inline]
    pub fn effective_unit_price(&self) -> Money {
        Money::from_cents(self.actual_unit_price_cents.unwrap_or(self.unit_price_cents))
    }
}

/// A sale together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Cash Flow
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowType {
    Income,
    Expense,
}

/// Which role an entry plays within the set derived from one sale.
///
/// At most one row per `(reference_key, entry_kind)` exists at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// What the customer actually paid.
    Revenue,
    /// What is owed back to the capital source.
    InvestorPayout,
    /// The spread between the two.
    Commission,
}

/// A persisted ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashFlowRecord {
    pub id: String,
    pub tenant_id: String,
    pub flow_type: CashFlowType,
    pub entry_kind: EntryKind,
    /// Always non-negative; direction is carried by `flow_type`.
    pub amount_cents: i64,
    pub category: String,
    pub funding_source: FundingSource,
    /// Ties the entry back to its origin, e.g. `sale:<uuid>`.
    pub reference_key: String,
    /// The sale's `sync_version` this entry was derived from.
    pub source_version: i64,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// An imported alcohol product (one row per variant).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
    /// Variant label, e.g. "720ml" or "Gift box".
    pub variant: Option<String>,
    pub tax_category: TaxCategory,
    /// Alcohol by volume in basis points (15% = 1500).
    pub abv_bps: i64,
    /// Bottle volume in millilitres.
    pub volume_ml: i64,
    /// Whether product is active (soft delete).
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stored Exchange Rate
// =============================================================================

/// A manually maintained exchange rate for one tenant and currency.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StoredExchangeRate {
    pub tenant_id: String,
    pub currency: Currency,
    /// TWD per one unit of `currency`, in millionths.
    pub rate_micros: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StoredExchangeRate {
    /// Returns the rate as an [`ExchangeRate`].
    pub fn rate(&self) -> ExchangeRate {
        ExchangeRate::from_micros(self.rate_micros.max(0) as u64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(500);
        assert_eq!(rate.bps(), 500);
        assert!(!rate.is_zero());
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_settled_statuses() {
        let settled: Vec<SaleStatus> = SaleStatus::ALL
            .into_iter()
            .filter(SaleStatus::is_settled)
            .collect();
        assert_eq!(
            settled,
            vec![
                SaleStatus::Confirmed,
                SaleStatus::Shipped,
                SaleStatus::Delivered,
                SaleStatus::Paid
            ]
        );
    }

    #[test]
    fn test_sale_status_serde_spelling() {
        let json = serde_json::to_string(&SaleStatus::Preorder).unwrap();
        assert_eq!(json, "\"PREORDER\"");
        let status: SaleStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(status, SaleStatus::Cancelled);
        assert_eq!(SaleStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_effective_unit_price_falls_back() {
        let mut item = SaleItem {
            id: "i1".to_string(),
            sale_id: "s1".to_string(),
            product_id: None,
            name_snapshot: "Dassai 45".to_string(),
            quantity: 2,
            unit_price_cents: 50_000,
            actual_unit_price_cents: None,
            created_at: Utc::now(),
        };
        assert_eq!(item.effective_unit_price().cents(), 50_000);

        item.actual_unit_price_cents = Some(60_000);
        assert_eq!(item.effective_unit_price().cents(), 60_000);
        assert_eq!(item.unit_price().cents(), 50_000);
    }
}
