//! # HTTP Handlers
//!
//! One module per resource. Handlers validate input, resolve the tenant,
//! call into cellar-core / cellar-db and wrap the result in the envelope.
//!
//! - [`tax`] - Calculator and currency conversion
//! - [`exchange_rate`] - Stored TWD rates
//! - [`product`] - Import catalog
//! - [`sale`] - Sales, with cash-flow sync on every write
//! - [`cashflow`] - Ledger summary and listing
//! - [`line`] - LINE bot message simulation

pub mod cashflow;
pub mod exchange_rate;
pub mod line;
pub mod product;
pub mod sale;
pub mod tax;

use axum::extract::State;
use serde::Serialize;

use crate::error::{ok, ApiError, ApiResult, ErrorCode};
use crate::state::SharedState;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health(State(state): State<SharedState>) -> ApiResult<HealthStatus> {
    if !state.db.health_check().await {
        tracing::error!("Health check failed: database unreachable");
        return Err(ApiError::new(ErrorCode::DatabaseError, "Database unavailable"));
    }

    ok(HealthStatus {
        status: "ok",
        database: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use cellar_db::{Database, DbConfig};

    use crate::config::ApiConfig;
    use crate::state::{AppState, SharedState, Tenant};

    pub async fn setup() -> SharedState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, ApiConfig::default())
    }

    pub fn tenant() -> Tenant {
        Tenant("t1".to_string())
    }
}
