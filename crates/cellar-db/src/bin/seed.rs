//! # Seed Data Generator
//!
//! Populates the database with exchange rates, a small import catalog and
//! demo sales for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./cellar_dev.db for the default tenant
//! cargo run -p cellar-db --bin seed
//!
//! # Custom database, tenant and number of demo sales
//! cargo run -p cellar-db --bin seed -- --db ./data/cellar.db --tenant acme --sales 40
//! ```
//!
//! Sales cycle through every status, so the ledger ends up with a mix of
//! settled sales (with and without commission) and sales that have no rows.

use anyhow::Context;
use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use cellar_core::{
    Currency, ExchangeRate, FundingSource, Product, Sale, SaleItem, SaleStatus, TaxCategory,
    DEFAULT_TENANT_ID,
};
use cellar_db::ledger;
use cellar_db::repository::sale::{generate_sale_id, generate_sale_item_id};
use cellar_db::{Database, DbConfig, SaleRepository};

/// TWD per unit, in millionths.
const RATES: &[(Currency, u64)] = &[
    (Currency::Jpy, 210_000),
    (Currency::Usd, 32_500_000),
    (Currency::Eur, 35_100_000),
    (Currency::Gbp, 41_200_000),
    (Currency::Aud, 21_300_000),
    (Currency::Krw, 23_500),
    (Currency::Cny, 4_480_000),
];

/// (sku, name, variant, category, abv_bps, volume_ml)
const PRODUCTS: &[(&str, &str, &str, TaxCategory, i64, i64)] = &[
    ("DASSAI-45-720", "Dassai 45 Junmai Daiginjo", "720ml", TaxCategory::Sake, 1600, 720),
    ("KUBOTA-SENJU-720", "Kubota Senju", "720ml", TaxCategory::Sake, 1500, 720),
    ("JUYONDAI-HONMARU", "Juyondai Honmaru", "1800ml", TaxCategory::Sake, 1500, 1800),
    ("YAMAZAKI-12", "Yamazaki 12 Year", "700ml", TaxCategory::Spirits, 4300, 700),
    ("HIBIKI-HARMONY", "Hibiki Japanese Harmony", "700ml", TaxCategory::Spirits, 4300, 700),
    ("KAKUBIN", "Suntory Kakubin", "700ml", TaxCategory::Spirits, 4000, 700),
    ("CHOYA-UMESHU", "Choya Umeshu", "720ml", TaxCategory::Liqueur, 1000, 720),
    ("MIDORI", "Midori Melon Liqueur", "700ml", TaxCategory::Liqueur, 2000, 700),
    ("CHATEAU-MARGAUX-2015", "Chateau Margaux", "2015", TaxCategory::Wine, 1350, 750),
    ("CLOUDY-BAY-SB", "Cloudy Bay Sauvignon Blanc", "750ml", TaxCategory::Wine, 1300, 750),
    ("ASAHI-DRY-350", "Asahi Super Dry", "350ml can", TaxCategory::Beer, 500, 350),
    ("HINODE-MIRIN", "Hinode Hon Mirin", "1L", TaxCategory::CookingWine, 1400, 1000),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./cellar_dev.db");
    let mut tenant_id = String::from(DEFAULT_TENANT_ID);
    let mut sale_count: usize = 20;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sale_count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cellar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./cellar_dev.db)");
                println!("  -t, --tenant <ID>     Tenant to seed (default: {DEFAULT_TENANT_ID})");
                println!("  -s, --sales <N>       Number of demo sales (default: 20)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Cellar Seed Data Generator");
    println!("==========================");
    println!("Database: {db_path}");
    println!("Tenant:   {tenant_id}");
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("opening database")?;
    println!("✓ Connected, migrations applied");

    // Exchange rates are upserted, so re-running refreshes them
    for (currency, micros) in RATES {
        db.exchange_rates()
            .upsert(&tenant_id, *currency, ExchangeRate::from_micros(*micros))
            .await?;
    }
    println!("✓ {} exchange rates", RATES.len());

    if db.products().count(&tenant_id).await? > 0 {
        println!("⚠ Tenant already has products, skipping catalog and sales.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (sku, name, variant, category, abv_bps, volume_ml) in PRODUCTS {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            sku: sku.to_string(),
            name: name.to_string(),
            variant: Some(variant.to_string()),
            tax_category: *category,
            abv_bps: *abv_bps,
            volume_ml: *volume_ml,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        products.push(db.products().insert(&product).await?);
    }
    println!("✓ {} products", products.len());

    let start = std::time::Instant::now();
    let mut ledger_rows = 0;

    for n in 0..sale_count {
        let now = Utc::now();
        let mut tx = db.begin().await?;
        let sale = Sale {
            id: generate_sale_id(),
            tenant_id: tenant_id.clone(),
            order_number: SaleRepository::next_order_number(&mut tx, &tenant_id, now).await?,
            customer_name: format!("Demo Customer {:02}", n + 1),
            status: SaleStatus::ALL[n % SaleStatus::ALL.len()],
            funding_source: if n % 3 == 0 {
                FundingSource::Personal
            } else {
                FundingSource::Company
            },
            notes: None,
            created_at: now,
            updated_at: now,
            sync_version: 1,
        };
        SaleRepository::insert_sale(&mut tx, &sale).await?;

        for line in 0..(1 + n % 3) {
            let product = &products[(n + line) % products.len()];
            let unit_price_cents = 80_000 + ((n * 37 + line * 11) % 40) as i64 * 5_000;
            // Every other line sold above the investor price
            let actual_unit_price_cents = (line % 2 == 0).then_some(unit_price_cents + 20_000);

            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale.id.clone(),
                product_id: Some(product.id.clone()),
                name_snapshot: product.name.clone(),
                quantity: 1 + (n % 4) as i64,
                unit_price_cents,
                actual_unit_price_cents,
                created_at: now,
            };
            SaleRepository::insert_item(&mut tx, &item).await?;
        }

        ledger_rows += ledger::sync_sale_cashflow(&mut tx, &tenant_id, &sale.id)
            .await?
            .len();
        tx.commit().await?;
    }

    println!(
        "✓ {} sales, {} ledger rows in {:?}",
        sale_count,
        ledger_rows,
        start.elapsed()
    );

    let summary = db.cashflow().summary(&tenant_id).await?;
    println!(
        "  Income NT${:.2}  Expense NT${:.2}  Net NT${:.2}",
        summary.total_income_cents as f64 / 100.0,
        summary.total_expense_cents as f64 / 100.0,
        summary.net_cents as f64 / 100.0
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
