//! # cellar-api: HTTP Surface of the Cellar Back Office
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cellar API                                       │
//! │                                                                         │
//! │  Client ──► axum Router ──► TraceLayer ──► CorsLayer ──► handler       │
//! │                                                             │           │
//! │                     Tenant (X-Tenant-Id) ◄──────────────────┤           │
//! │                                                             ▼           │
//! │                      cellar-core (pure) ◄──── handlers ────► cellar-db  │
//! │                                                             │           │
//! │                                                             ▼           │
//! │  Client ◄── { success, data, error } ◄──────────────── ApiResponse     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routes
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/health` | [`handlers::health`] |
//! | POST | `/api/v1/tax/calculate` | [`handlers::tax::calculate`] |
//! | POST | `/api/v1/tax/convert` | [`handlers::tax::convert`] |
//! | GET | `/api/v1/exchange-rates` | [`handlers::exchange_rate::list_rates`] |
//! | PUT | `/api/v1/exchange-rates/{currency}` | [`handlers::exchange_rate::upsert_rate`] |
//! | GET/POST | `/api/v1/products` | list/search, create |
//! | GET/PUT/DELETE | `/api/v1/products/{id}` | fetch, update, deactivate |
//! | GET/POST | `/api/v1/sales` | list, create |
//! | GET/PUT/DELETE | `/api/v1/sales/{id}` | fetch, replace, delete |
//! | POST | `/api/v1/sales/{id}/status` | status transition |
//! | GET | `/api/v1/sales/{id}/cashflow` | ledger rows for a sale |
//! | GET | `/api/v1/cashflow` | recent ledger rows |
//! | GET | `/api/v1/cashflow/summary` | totals by funding source |
//! | POST | `/api/v1/line/simulate` | LINE bot reply |

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{cashflow, exchange_rate, line, product, sale, tax};
use crate::state::SharedState;

/// Builds the application router.
///
/// Layers (tracing, CORS) are added by the binary so tests can drive the
/// bare router.
pub fn router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/tax/calculate", post(tax::calculate))
        .route("/tax/convert", post(tax::convert))
        .route("/exchange-rates", get(exchange_rate::list_rates))
        .route("/exchange-rates/{currency}", put(exchange_rate::upsert_rate))
        .route(
            "/products",
            get(product::list_products).post(product::create_product),
        )
        .route(
            "/products/{id}",
            get(product::get_product)
                .put(product::update_product)
                .delete(product::deactivate_product),
        )
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        .route(
            "/sales/{id}",
            get(sale::get_sale)
                .put(sale::update_sale)
                .delete(sale::delete_sale),
        )
        .route("/sales/{id}/status", post(sale::update_status))
        .route("/sales/{id}/cashflow", get(sale::sale_cashflow))
        .route("/cashflow", get(cashflow::list_recent))
        .route("/cashflow/summary", get(cashflow::summary))
        .route("/line/simulate", post(line::simulate));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .with_state(state)
}
