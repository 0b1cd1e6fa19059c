//! # Exchange Rate Repository
//!
//! Manually maintained TWD rates, one row per tenant and currency.
//! Nothing here fetches live rates.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cellar_core::{Currency, ExchangeRate, StoredExchangeRate};

/// Repository for stored exchange rates.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    pool: SqlitePool,
}

impl ExchangeRateRepository {
    /// Creates a new ExchangeRateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExchangeRateRepository { pool }
    }

    /// Lists a tenant's stored rates ordered by currency code.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<StoredExchangeRate>> {
        let rates = sqlx::query_as::<_, StoredExchangeRate>(
            "SELECT tenant_id, currency, rate_micros, updated_at
             FROM exchange_rates
             WHERE tenant_id = ?1
             ORDER BY currency",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }

    /// Gets the stored rate for one currency.
    pub async fn get(&self, tenant_id: &str, currency: Currency) -> DbResult<Option<ExchangeRate>> {
        let micros: Option<i64> = sqlx::query_scalar(
            "SELECT rate_micros FROM exchange_rates WHERE tenant_id = ?1 AND currency = ?2",
        )
        .bind(tenant_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;

        Ok(micros.map(|m| ExchangeRate::from_micros(m.max(0) as u64)))
    }

    /// Inserts or replaces the stored rate for one currency.
    pub async fn upsert(
        &self,
        tenant_id: &str,
        currency: Currency,
        rate: ExchangeRate,
    ) -> DbResult<StoredExchangeRate> {
        debug!(tenant_id = %tenant_id, currency = %currency, micros = rate.micros(), "Upserting exchange rate");

        let stored = StoredExchangeRate {
            tenant_id: tenant_id.to_string(),
            currency,
            rate_micros: rate.micros() as i64,
            updated_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO exchange_rates (tenant_id, currency, rate_micros, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (tenant_id, currency) DO UPDATE SET
                rate_micros = excluded.rate_micros,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&stored.tenant_id)
        .bind(stored.currency)
        .bind(stored.rate_micros)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }
}
