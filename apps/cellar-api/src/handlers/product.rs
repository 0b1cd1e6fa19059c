//! # Product Handlers
//!
//! The import catalog. Products carry the tax category, ABV and volume the
//! calculator needs, so a quote can name a `product_id` instead.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use cellar_core::validation::{
    percent_to_bps, validate_abv, validate_name, validate_search_query, validate_sku,
    validate_volume,
};
use cellar_core::{Product, TaxCategory};
use cellar_db::repository::product::generate_product_id;

use crate::error::{ok, ApiError, ApiResult};
use crate::state::{SharedState, Tenant};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// Query string of `GET /api/v1/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Body of `POST /api/v1/products` and `PUT /api/v1/products/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub variant: Option<String>,
    pub category: String,
    /// Percent, e.g. `16` for 16%.
    pub abv: f64,
    pub volume_ml: u32,
}

/// Validated catalog fields.
struct ProductFields {
    sku: String,
    name: String,
    variant: Option<String>,
    tax_category: TaxCategory,
    abv_bps: u32,
    volume_ml: u32,
}

impl ProductRequest {
    fn validate(&self) -> Result<ProductFields, ApiError> {
        let sku = self.sku.trim().to_uppercase();
        validate_sku(&sku)?;
        validate_name("name", &self.name)?;
        let abv_bps = percent_to_bps("abv", self.abv)?;
        validate_abv(abv_bps)?;
        validate_volume(self.volume_ml)?;

        let variant = self
            .variant
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(v) = &variant {
            validate_name("variant", v)?;
        }

        Ok(ProductFields {
            sku,
            name: self.name.trim().to_string(),
            variant,
            tax_category: self.category.parse()?,
            abv_bps,
            volume_ml: self.volume_ml,
        })
    }
}

/// `GET /api/v1/products?q=dassai&limit=20`
pub async fn list_products(
    State(state): State<SharedState>,
    tenant: Tenant,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<Product>> {
    let q = validate_search_query(query.q.as_deref().unwrap_or(""))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let products = state.db.products().search(tenant.id(), &q, limit).await?;
    debug!(query = %q, results = products.len(), "Product search complete");
    ok(products)
}

/// `GET /api/v1/products/{id}`
pub async fn get_product(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    let product = state
        .db
        .products()
        .get_by_id(tenant.id(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    ok(product)
}

/// `POST /api/v1/products`
pub async fn create_product(
    State(state): State<SharedState>,
    tenant: Tenant,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Product> {
    let fields = req.validate()?;
    let now = Utc::now();

    let product = Product {
        id: generate_product_id(),
        tenant_id: tenant.id().to_string(),
        sku: fields.sku,
        name: fields.name,
        variant: fields.variant,
        tax_category: fields.tax_category,
        abv_bps: fields.abv_bps as i64,
        volume_ml: fields.volume_ml as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let product = state.db.products().insert(&product).await?;
    info!(product_id = %product.id, sku = %product.sku, "Product created");
    ok(product)
}

/// `PUT /api/v1/products/{id}`
pub async fn update_product(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Product> {
    let fields = req.validate()?;
    let repo = state.db.products();

    let mut product = repo
        .get_by_id(tenant.id(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    product.sku = fields.sku;
    product.name = fields.name;
    product.variant = fields.variant;
    product.tax_category = fields.tax_category;
    product.abv_bps = fields.abv_bps as i64;
    product.volume_ml = fields.volume_ml as i64;
    product.updated_at = Utc::now();

    repo.update(&product).await?;
    info!(product_id = %product.id, "Product updated");
    ok(product)
}

/// `DELETE /api/v1/products/{id}`
///
/// Deactivates the product. Sales keep their name snapshots.
pub async fn deactivate_product(
    State(state): State<SharedState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.db.products().soft_delete(tenant.id(), &id).await?;
    info!(product_id = %id, "Product deactivated");
    ok(())
}
