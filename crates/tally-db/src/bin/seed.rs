//! # Seed Data Generator
//!
//! Populates the database with a few weeks of bakery sales for development.
//!
//! ## Usage
//! ```bash
//! # 14 closed days (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom history length
//! cargo run -p tally-db --bin seed -- --days 60
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - 20-60 sales per day between 07:00 and 21:59 local, busier around
//!   breakfast and the evening rush
//! - Roughly one in three paid in cash
//! - Amounts from 20.00 to 520.00, in steps of 0.50
//! - Every seeded day is closed into the report archive

use chrono::{Duration, NaiveTime, Utc};
use std::env;
use tally_core::{BusinessClock, Money, NewSale, PaymentMode, DEFAULT_TIMEZONE};
use tally_db::{Database, DbConfig};

/// Hours weighted towards the morning and evening rush.
const HOURS: &[u32] = &[7, 8, 8, 9, 9, 10, 11, 12, 13, 15, 16, 17, 17, 18, 18, 19, 20, 21];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 14;
    let mut db_path = String::from("./tally_dev.db");
    let mut tz_name = String::from(DEFAULT_TIMEZONE);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(14);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tz" => {
                if i + 1 < args.len() {
                    tz_name = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Closed days of history to generate (default: 14)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("      --tz <ZONE>    Business timezone (default: {DEFAULT_TIMEZONE})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let tz: chrono_tz::Tz = tz_name.parse()?;
    let clock = BusinessClock::system(tz);

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!("Timezone: {}", tz_name);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.sale_events().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} sale events", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating sales...");

    let start = std::time::Instant::now();
    let today = clock.today();
    let mut generated = 0usize;

    for back in (1..=days).rev() {
        let date = today - Duration::days(back);
        let per_day = 20 + (date_seed(back) % 41) as usize;

        for n in 0..per_day {
            let seed = date_seed(back) ^ (n as u64).wrapping_mul(2_654_435_761);
            let hour = HOURS[(seed % HOURS.len() as u64) as usize];
            let minute = ((seed >> 8) % 60) as u32;
            let second = ((seed >> 16) % 60) as u32;
            let Some(time) = NaiveTime::from_hms_opt(hour, minute, second) else {
                continue;
            };
            let Some(occurred_at) = clock.resolve_local(date, time) else {
                continue;
            };

            let mode = if (seed >> 24) % 3 == 0 {
                PaymentMode::Cash
            } else {
                PaymentMode::Electronic
            };
            let amount = Money::from_cents(2000 + ((seed >> 32) % 1001) as i64 * 50);

            if let Err(e) = db
                .ingest_sale(NewSale {
                    amount,
                    mode,
                    occurred_at,
                })
                .await
            {
                eprintln!("Failed to insert sale on {}: {}", date, e);
                continue;
            }
            generated += 1;
        }

        let report = db.close_business_day(date, Utc::now()).await?;
        println!(
            "  {}  {:>3} visits  {:>10}",
            date, report.visit_count, report.combined_total
        );
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} sales in {:?}", generated, elapsed);

    let latest = db.reports().latest().await?;
    println!("  Latest report: {} ({})", latest.business_date, latest.combined_total);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Small deterministic mix so reruns against a fresh file give the same data.
fn date_seed(back: i64) -> u64 {
    let mut x = (back as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
