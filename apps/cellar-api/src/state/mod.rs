//! # Application State
//!
//! Shared state handed to every handler through axum's `State` extractor.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool`, which is already `Send + Sync` and
//! cheap to clone. The config is read-only after startup. The whole state
//! lives in an `Arc` so cloning it per request is a pointer copy.

mod tenant;

pub use tenant::{Tenant, TENANT_HEADER};

use std::sync::Arc;

use cellar_db::Database;

use crate::config::ApiConfig;

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
}

impl AppState {
    /// Wraps the database and config for the router.
    pub fn new(db: Database, config: ApiConfig) -> Arc<Self> {
        Arc::new(AppState { db, config })
    }
}

/// The form handlers take it in: `State(state): State<SharedState>`.
pub type SharedState = Arc<AppState>;
