//! # Seed Data Generator
//!
//! Fills a development database with catalog products.
//!
//! ## Usage
//! ```bash
//! # Generate 150 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount into a specific file
//! cargo run -p tally-db --bin seed -- --count 40 --db ./data/tally.db
//!
//! # More detail
//! RUST_LOG=debug cargo run -p tally-db --bin seed
//! ```
//!
//! Each product gets a SKU `{AISLE}-{ABBR}-{NNN}`, an EAN-like barcode, a
//! retail price, a wholesale price 10-25% lower and a cost 55-75% of retail.
//! Weighed goods (the `DELI` aisle) do not track stock.

use std::env;
use std::time::Instant;

use tally_core::{CatalogProduct, Money, Quantity};
use tally_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_COUNT: usize = 150;
const DEFAULT_DB_PATH: &str = "./tally_dev.db";

/// Aisles and the product names stocked in each.
const AISLES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Cola", "Lemon Soda", "Orange Soda", "Ginger Ale", "Still Water",
            "Sparkling Water", "Apple Juice", "Orange Juice", "Iced Tea", "Cold Brew",
        ],
    ),
    (
        "SNK",
        &[
            "Salted Crisps", "Paprika Crisps", "Tortilla Chips", "Pretzels",
            "Salted Peanuts", "Chocolate Bar", "Fruit Gums", "Oat Cookies",
        ],
    ),
    (
        "DRY",
        &[
            "Whole Milk", "Skim Milk", "Oat Milk", "Butter", "Greek Yogurt",
            "Eggs Dozen", "Cream Cheese", "Sour Cream",
        ],
    ),
    (
        "GRO",
        &[
            "Spaghetti", "Penne", "White Rice", "Brown Rice", "Canned Tomatoes",
            "Canned Beans", "Rolled Oats", "Flour", "Sugar", "Honey",
        ],
    ),
    (
        "DELI",
        &[
            "Cheddar", "Gouda", "Smoked Ham", "Salami", "Olives", "Hummus",
        ],
    ),
];

/// Size variants and what they add to the base price, in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Regular", 80),
    ("Large", 190),
    ("Family", 420),
];

struct Args {
    count: usize,
    db_path: String,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        count: DEFAULT_COUNT,
        db_path: DEFAULT_DB_PATH.to_string(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.count = value.parse().unwrap_or_else(|_| {
                        warn!(value = %value, "Invalid --count, using default");
                        DEFAULT_COUNT
                    });
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.db_path = value.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB_PATH})");
                println!("  -h, --help         Show this help message");
                return None;
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    info!(db = %args.db_path, count = args.count, "Seeding catalog");

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    let products = db.products();

    let existing = products.count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Database already has products, skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    let start = Instant::now();
    let mut generated = 0usize;

    let catalog = AISLES.iter().flat_map(|(aisle, names)| {
        names.iter().flat_map(move |name| {
            SIZES
                .iter()
                .map(move |(size, addon)| (*aisle, *name, *size, *addon))
        })
    });

    for (seed, (aisle, name, size, addon)) in catalog.enumerate().take(args.count) {
        let product = generate_product(aisle, name, size, addon, seed);

        if let Err(e) = products.insert(&product).await {
            warn!(sku = %product.sku, error = %e, "Failed to insert product");
            continue;
        }

        generated += 1;
        if generated % 100 == 0 {
            info!(generated, "Progress");
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    if generated < args.count {
        warn!(
            requested = args.count,
            generated, "Catalog template exhausted before reaching the requested count"
        );
    }

    let hits = products.search("cola", 10).await?;
    info!(results = hits.len(), "Search 'cola'");

    db.close().await;
    Ok(())
}

/// Builds one product with deterministic pseudo-random figures.
fn generate_product(aisle: &str, name: &str, size: &str, addon: i64, seed: usize) -> CatalogProduct {
    let abbr: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:03}", aisle, abbr, seed);

    let retail = 99 + ((seed * 37) % 900) as i64 + addon;
    let wholesale = retail * (75 + (seed % 16) as i64) / 100;
    let cost = retail * (55 + (seed % 21) as i64) / 100;

    let product = CatalogProduct::new("", sku, format!("{} {}", name, size), Money::from_cents(retail))
        .with_wholesale_price(Money::from_cents(wholesale))
        .with_unit_cost(Money::from_cents(cost))
        .with_barcode(format!("200{:010}", seed));

    if aisle == "DELI" {
        product
    } else {
        product.with_stock(Quantity::from_units((seed % 101) as i64))
    }
}
