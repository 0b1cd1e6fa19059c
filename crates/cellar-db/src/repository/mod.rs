//! # Repository Module
//!
//! Database repository implementations for the Cellar back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Handler (read)                       Handler (write)                  │
//! │       │                                    │                            │
//! │       │  db.sales().list(tenant, ..)       │  let mut tx = db.begin()   │
//! │       ▼                                    ▼                            │
//! │  SaleRepository { pool }             SaleRepository::update_status(    │
//! │  └── acquires a pooled connection        &mut tx, ..)                  │
//! │                                      ledger::sync_sale_cashflow(       │
//! │                                          &mut tx, ..)                  │
//! │                                      tx.commit()                       │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and search
//! - [`SaleRepository`](sale::SaleRepository) - Sales and sale items
//! - [`CashFlowRepository`](cashflow::CashFlowRepository) - Ledger rows and totals
//! - [`ExchangeRateRepository`](exchange_rate::ExchangeRateRepository) - Stored rates

pub mod cashflow;
pub mod exchange_rate;
pub mod product;
pub mod sale;
