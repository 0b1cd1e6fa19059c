//! # cellar-core: Pure Business Logic for the Cellar Back Office
//!
//! This crate holds the import tax calculator and the cash-flow derivation
//! rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cellar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cellar-api (axum)                            │   │
//! │  │    /tax/calculate   /sales   /cashflow   /line/simulate        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cellar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ currency │ │   tax    │ │ pricing  │ │    cashflow      │  │   │
//! │  │   │ convert  │ │ duty     │ │ markup   │ │ derive_entries   │  │   │
//! │  │   │ rates    │ │ alcohol  │ │ margin   │ │ compute_totals   │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cellar-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, repositories, ledger sync    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SaleItem, CashFlowRecord, Product)
//! - [`money`] - Money type with integer arithmetic
//! - [`currency`] - Currencies, exchange rates and conversion to TWD
//! - [`tax`] - Customs duty, alcohol tax, business tax and fees
//! - [`pricing`] - Tier markups, suggested price, profit analysis
//! - [`calculator`] - The full import calculation
//! - [`cashflow`] - Ledger entries implied by a sale
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output
//! 2. **No I/O**: database, network and file system access stay out of here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use cellar_core::currency::{convert, ExchangeRate};
//! use cellar_core::money::Money;
//!
//! // JPY 80,000 at 0.21
//! let base = convert(Money::from_major_minor(80_000, 0), ExchangeRate::from_micros(210_000)).unwrap();
//! assert_eq!(base.cents(), 1_680_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod cashflow;
pub mod currency;
pub mod error;
pub mod money;
pub mod pricing;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use currency::{Currency, ExchangeRate};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::CustomerTier;
pub use tax::{TaxCategory, TaxSchedule};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used when a request does not name one.
pub const DEFAULT_TENANT_ID: &str = "default";

/// Maximum line items on a single sale.
pub const MAX_SALE_ITEMS: usize = 200;

/// Maximum quantity on a single line (calculator and sale items).
///
/// Catches typos such as 10000 instead of 1000.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Maximum unit price on a sale line, in cents (NT$10 billion).
///
/// MAX_SALE_ITEMS × MAX_ITEM_QUANTITY × MAX_UNIT_PRICE_CENTS stays below
/// `i64::MAX`, so sale totals cannot overflow.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000_000;
