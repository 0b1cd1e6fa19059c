//! # cellar-db: Database Layer for the Cellar Back Office
//!
//! SQLite storage for sales, the cash-flow ledger, the import catalog and
//! stored exchange rates, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cellar Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /api/v1/sales/{id}/status)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cellar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  sale, product│    │  (embedded)  │  │   │
//! │  │   │               │    │  cashflow,    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  exchange_rate│    │ 001_init.sql │  │   │
//! │  │   │ begin() → tx  │    └───────┬───────┘    └──────────────┘  │   │
//! │  │   └───────────────┘            │                               │   │
//! │  │                        ┌───────▼───────┐                       │   │
//! │  │                        │   ledger.rs   │ delete-then-insert    │   │
//! │  │                        │ sync_sale_... │ inside caller's tx    │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - Cash-flow synchronizer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cellar_db::{ledger, Database, DbConfig, SaleRepository};
//!
//! let db = Database::new(DbConfig::new("cellar.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! SaleRepository::update_status(&mut tx, tenant, sale_id, SaleStatus::Paid).await?;
//! ledger::sync_sale_cashflow(&mut tx, tenant, sale_id).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cashflow::{CashFlowRepository, CashFlowSummary, FundingSourceTotals};
pub use repository::exchange_rate::ExchangeRateRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
