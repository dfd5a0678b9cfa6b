//! # Seed Data Generator
//!
//! Populates the database with demo bars, liquor products and prices.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database
//! cargo run -p shiftbook-db --bin seed
//!
//! # Specify database path
//! cargo run -p shiftbook-db --bin seed -- --db ./data/shiftbook.db
//!
//! # Also run one demo shift to completion
//! cargo run -p shiftbook-db --bin seed -- --demo-shift
//! ```
//!
//! ## Generated Data
//! - Three bars (Main Bar, Rooftop, Lobby Lounge)
//! - Products across Whisky, Vodka, Rum, Gin, Tequila, Beer, Wine
//! - A selling and cost price for every product at every bar, varied per bar

use std::env;
use std::path::PathBuf;

use shiftbook_core::{Money, Quantity, StockroomCount, WellCount, WellName};
use shiftbook_db::{init_tracing, Database, NewProduct, ShiftbookConfig};

/// (category, [(name, brand, volume in ml, unit, selling cents, cost cents)])
const CATALOG: &[(&str, &[(&str, &str, i64, &str, i64, i64)])] = &[
    (
        "Whisky",
        &[
            ("Johnnie Walker Black 750ml", "Johnnie Walker", 750, "BOTTLE", 1200, 700),
            ("Jameson 750ml", "Jameson", 750, "BOTTLE", 900, 500),
            ("Glenfiddich 12 750ml", "Glenfiddich", 750, "BOTTLE", 1500, 900),
            ("Jack Daniel's 750ml", "Jack Daniel's", 750, "BOTTLE", 1000, 600),
        ],
    ),
    (
        "Vodka",
        &[
            ("Smirnoff 750ml", "Smirnoff", 750, "BOTTLE", 700, 350),
            ("Absolut 750ml", "Absolut", 750, "BOTTLE", 800, 400),
            ("Grey Goose 750ml", "Grey Goose", 750, "BOTTLE", 1400, 850),
        ],
    ),
    (
        "Rum",
        &[
            ("Bacardi Carta Blanca 750ml", "Bacardi", 750, "BOTTLE", 700, 350),
            ("Captain Morgan Spiced 750ml", "Captain Morgan", 750, "BOTTLE", 750, 380),
        ],
    ),
    (
        "Gin",
        &[
            ("Tanqueray 750ml", "Tanqueray", 750, "BOTTLE", 900, 480),
            ("Bombay Sapphire 750ml", "Bombay", 750, "BOTTLE", 950, 500),
        ],
    ),
    (
        "Tequila",
        &[("Jose Cuervo Especial 750ml", "Jose Cuervo", 750, "BOTTLE", 850, 450)],
    ),
    (
        "Beer",
        &[
            ("Heineken 330ml", "Heineken", 330, "BOTTLE", 450, 200),
            ("Guinness 440ml", "Guinness", 440, "CAN", 550, 260),
            ("Corona Extra 355ml", "Corona", 355, "BOTTLE", 500, 230),
        ],
    ),
    (
        "Wine",
        &[
            ("House Red 750ml", "House", 750, "BOTTLE", 2800, 1200),
            ("House White 750ml", "House", 750, "BOTTLE", 2600, 1100),
        ],
    ),
];

/// (name, location, price markup in percent)
const BARS: &[(&str, &str, i64)] = &[
    ("Main Bar", "Ground Floor", 100),
    ("Rooftop", "Level 9", 120),
    ("Lobby Lounge", "Lobby", 110),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut demo_shift = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--demo-shift" => demo_shift = true,
            "--help" | "-h" => {
                println!("Shiftbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: from config)");
                println!("  -c, --config <PATH>   Config file path");
                println!("      --demo-shift      Run one shift at the first bar to completion");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    let mut config = ShiftbookConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging);

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("Shiftbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database.path.display());
    println!();

    // Connect to database
    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut bars = Vec::with_capacity(BARS.len());
    for (name, location, markup) in BARS {
        let bar = db.bars().create(name, Some(*location)).await?;
        println!("  Bar: {} ({})", bar.name, bar.id);
        bars.push((bar, *markup));
    }

    let mut products = Vec::new();
    for (category, items) in CATALOG {
        for (name, brand, volume, unit, selling, cost) in items.iter() {
            let product = db
                .products()
                .create(NewProduct {
                    name,
                    category: Some(*category),
                    brand: Some(*brand),
                    volume_ml: Some(Quantity::from_units(*volume)),
                    unit,
                })
                .await?;

            for (bar, markup) in &bars {
                db.prices()
                    .set_price(
                        &bar.id,
                        &product.id,
                        Money::from_cents(selling * markup / 100),
                        Some(Money::from_cents(*cost)),
                    )
                    .await?;
            }
            products.push(product);
        }
    }

    println!();
    println!(
        "✓ Created {} products with {} prices",
        products.len(),
        products.len() * bars.len()
    );

    if demo_shift {
        if let (Some((bar, _)), Some(product)) = (bars.first(), products.first()) {
            run_demo_shift(&db, &bar.id, &product.id).await?;
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Runs one shift of a single product through every stage and commits it.
async fn run_demo_shift(
    db: &Database,
    bar_id: &str,
    product_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Running demo shift...");

    let shift = db.workflow();
    let session = shift.initialize(bar_id, Some("EVENING"), Some("Demo shift")).await?;

    shift
        .save_stockroom(
            &session.id,
            vec![StockroomCount {
                product_id: product_id.to_string(),
                opening_stock: Quantity::from_units(10),
                received_stock: Quantity::from_units(5),
                closing_stock: Quantity::from_units(3),
                remarks: None,
            }],
        )
        .await?;
    shift.create_or_refresh_distribution(&session.id).await?;

    let wells = [(WellName::Bar1, 7), (WellName::Bar2, 5)]
        .into_iter()
        .map(|(well_name, received)| WellCount {
            product_id: product_id.to_string(),
            well_name,
            opening_stock: Quantity::zero(),
            received_from_distribution: Quantity::from_units(received),
            closing_stock: Quantity::zero(),
            remarks: None,
        })
        .collect();
    shift.save_wells(&session.id, wells).await?;

    let outcome = shift.commit(&session.id).await?;
    let revenue: Money = outcome.sales.iter().map(|s| s.total_revenue).sum();
    println!(
        "✓ Session {} {}: {} sales records, revenue {}",
        outcome.session.id,
        outcome.session.status,
        outcome.sales.len(),
        revenue
    );
    Ok(())
}
