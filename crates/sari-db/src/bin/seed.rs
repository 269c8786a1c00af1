//! # Seed Data Generator
//!
//! Stocks a development database with a sari-sari store catalog.
//!
//! ## Usage
//! ```bash
//! # Default catalog into ./sari_dev.db
//! cargo run -p sari-db --bin seed
//!
//! # Specify database path and set the admin PIN
//! cargo run -p sari-db --bin seed -- --db ./data/sari.db --pin 1234
//! ```
//!
//! ## Generated Products
//! Each catalog entry gets one product per pack size:
//! - SKU: `{CODE}-{SIZE}`
//! - Price: base price times the pack multiplier
//! - Stock: spread from oversold-adjacent to well stocked, so the attention
//!   list has something to show
//! - A few slow movers flagged as deadstock

use chrono::Utc;
use std::collections::BTreeMap;
use std::env;
use sari_core::Product;
use sari_db::repository::product::generate_product_id;
use sari_db::{Database, DbConfig};

/// (code, name, base price in centavos)
const CATALOG: &[(&str, &str, i64)] = &[
    ("CANTON", "Lucky Me Pancit Canton", 1500),
    ("NOODLE", "Nissin Cup Noodles", 2800),
    ("KOPIKO", "Kopiko Brown Coffee", 900),
    ("MILO", "Milo 22g", 1200),
    ("COKE", "Coca-Cola Mismo", 2000),
    ("ROYAL", "Royal Tru-Orange", 2000),
    ("SKYFL", "SkyFlakes Crackers", 800),
    ("BOY", "Boy Bawang Cornick", 1000),
    ("PIATTOS", "Piattos Cheese", 1800),
    ("SARDINE", "555 Sardines", 2600),
    ("CORNED", "Argentina Corned Beef", 4200),
    ("EGG", "Fresh Egg", 900),
    ("RICE", "Dinorado Rice (1kg)", 6500),
    ("SUGAR", "Brown Sugar (1/4 kg)", 2200),
    ("SOY", "Silver Swan Soy Sauce", 1900),
    ("VINEGAR", "Datu Puti Vinegar", 1700),
    ("SHAMPOO", "Sunsilk Sachet", 700),
    ("SOAP", "Safeguard Bar", 4500),
    ("DETER", "Tide Bar", 2300),
    ("CANDLE", "Candle", 1000),
];

/// (size label, price multiplier in percent)
const SIZES: &[(&str, i64)] = &[("1", 100), ("3PK", 290), ("6PK", 560)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./sari_dev.db");
    let mut pin: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--pin" | "-p" => {
                if i + 1 < args.len() {
                    pin = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Sari POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./sari_dev.db)");
                println!("  -p, --pin <PIN>    Set the admin PIN for refunds and reports");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Sari POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if let Some(pin) = &pin {
        db.access().set_pin(pin).await?;
        println!("✓ Admin PIN set");
    }

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for (entry_idx, (code, name, base_price)) in CATALOG.iter().enumerate() {
        for (size_idx, (size, multiplier)) in SIZES.iter().enumerate() {
            let product = generate_product(
                code,
                name,
                size,
                base_price * multiplier / 100,
                entry_idx * SIZES.len() + size_idx,
            );

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.sku, e);
                continue;
            }

            generated += 1;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let products = db.products().list_all().await?;
    let attention = sari_core::inventory::attention_list(&products);
    println!("  Needing attention: {}", attention.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product.
fn generate_product(code: &str, name: &str, size: &str, price_cents: i64, seed: usize) -> Product {
    let now = Utc::now();

    let full_name = if size == "1" {
        name.to_string()
    } else {
        format!("{} ({})", name, size)
    };

    Product {
        id: generate_product_id(),
        sku: format!("{}-{}", code, size),
        name: full_name,
        price_cents,
        // 0..=47, so some land out of stock and some below the reorder point
        qty: ((seed * 7) % 48) as i64,
        threshold: if seed % 4 == 0 { 5 } else { 0 },
        deadstock: seed % 13 == 12,
        monthly_sales: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    }
}
