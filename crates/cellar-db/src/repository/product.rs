//! # Product Repository
//!
//! Database operations for the import catalog.
//!
//! ## Key Operations
//! - Search by SKU or name (case-insensitive substring)
//! - Lookup by ID or SKU (the calculator fills category/ABV/volume from here)
//! - Insert, update, soft delete

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cellar_core::Product;

const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, name, variant, tax_category, abv_bps, \
                               volume_ml, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.search("default", "dassai", 20).await?;
/// let product = repo.get_by_id("default", "uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by SKU or name.
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, tenant_id: &str, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(tenant_id = %tenant_id, query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(tenant_id, limit).await;
        }

        // Escape LIKE wildcards typed by the user
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped.to_lowercase());

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE tenant_id = ?1
              AND is_active = 1
              AND (lower(sku) LIKE ?2 ESCAPE '\' OR lower(name) LIKE ?2 ESCAPE '\')
            ORDER BY name
            LIMIT ?3
            "#
        ))
        .bind(tenant_id)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products.
    async fn list_active(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE tenant_id = ?1 AND is_active = 1
             ORDER BY name
             LIMIT ?2"
        ))
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 AND id = ?2"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, skipping deactivated ones.
    ///
    /// Quotes and new sale lines go through this; past sales keep their
    /// `product_id` and name snapshot.
    pub async fn get_active(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE tenant_id = ?1 AND id = ?2 AND is_active = 1"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&self, tenant_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 AND sku = ?2"
        ))
        .bind(tenant_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// - `DbError::UniqueViolation` if the SKU already exists for the tenant
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, variant, tax_category,
                abv_bps, volume_ml, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.variant)
        .bind(product.tax_category)
        .bind(product.abv_bps)
        .bind(product.volume_ml)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", &product.sku),
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Updates an existing product.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?3,
                name = ?4,
                variant = ?5,
                tax_category = ?6,
                abv_bps = ?7,
                volume_ml = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(&product.tenant_id)
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.variant)
        .bind(product.tax_category)
        .bind(product.abv_bps)
        .bind(product.volume_ml)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft deletes a product (sets is_active = false).
    ///
    /// Sale items keep pointing at it; their name snapshot is unaffected.
    pub async fn soft_delete(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?3 WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts a tenant's active products.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::sample_product;
    use cellar_core::TaxCategory;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("t1", "DASSAI-45", "Dassai 45", TaxCategory::Sake);
        db.products().insert(&product).await.unwrap();

        let by_id = db.products().get_by_id("t1", &product.id).await.unwrap().unwrap();
        assert_eq!(by_id.tax_category, TaxCategory::Sake);
        assert_eq!(by_id.abv_bps, 1500);

        let by_sku = db.products().get_by_sku("t1", "DASSAI-45").await.unwrap();
        assert!(by_sku.is_some());
        assert!(db.products().get_by_id("t2", &product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&sample_product("t1", "YAMAZAKI-12", "Yamazaki 12", TaxCategory::Spirits))
            .await
            .unwrap();

        let err = db
            .products()
            .insert(&sample_product("t1", "YAMAZAKI-12", "Other", TaxCategory::Spirits))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { field, .. } if field == "sku"));

        // Same SKU under another tenant is fine
        db.products()
            .insert(&sample_product("t2", "YAMAZAKI-12", "Yamazaki 12", TaxCategory::Spirits))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_search_and_soft_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let dassai = sample_product("t1", "DASSAI-45", "Dassai 45", TaxCategory::Sake);
        repo.insert(&dassai).await.unwrap();
        repo.insert(&sample_product("t1", "CHOYA-UME", "Choya Umeshu", TaxCategory::Liqueur))
            .await
            .unwrap();

        assert_eq!(repo.search("t1", "dassai", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("t1", "ume", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("t1", "", 10).await.unwrap().len(), 2);
        assert!(repo.search("t1", "100%", 10).await.unwrap().is_empty());

        assert!(repo.get_active("t1", &dassai.id).await.unwrap().is_some());

        repo.soft_delete("t1", &dassai.id).await.unwrap();
        assert_eq!(repo.count("t1").await.unwrap(), 1);
        assert!(repo.search("t1", "dassai", 10).await.unwrap().is_empty());
        assert!(repo.get_active("t1", &dassai.id).await.unwrap().is_none());
        assert!(repo.get_by_id("t1", &dassai.id).await.unwrap().is_some());
    }
}
