//! # Seed Data Generator
//!
//! Populates a SQLite database with demo transactions for development.
//!
//! ## Usage
//! ```bash
//! # 14 days of sales for store "toko-demo" (default)
//! cargo run -p kasir-db --bin seed
//!
//! # Custom store and history length
//! cargo run -p kasir-db --bin seed -- --store toko-1 --days 30
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//! ```
//!
//! ## Generated Transactions
//! Spreads sales over opening hours (08:00-21:00 WIB) across every payment
//! method. Roughly one in twelve is left pending, failed, or refunded so the
//! settlement screen and reports have something to exclude.

use std::env;

use chrono::{Duration, Utc};
use kasir_core::{
    normalize_timestamp, BusinessCalendar, Money, PaymentMethod, PaymentStatus, Transaction,
};
use kasir_db::{Database, DbConfig, TransactionStore};
use uuid::Uuid;

/// Ticket sizes in rupiah.
const TICKETS: &[i64] = &[
    5_000, 8_500, 12_000, 15_000, 18_000, 22_500, 27_000, 35_000, 48_000, 65_000, 120_000,
];

/// Cashier ids rotated across transactions.
const CASHIERS: &[&str] = &["kasir-01", "kasir-02", "kasir-03"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 14;
    let mut per_day: usize = 40;
    let mut store_id = String::from("toko-demo");
    let mut db_path = String::from("./kasir_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(14);
                    i += 1;
                }
            }
            "--per-day" | "-n" => {
                if i + 1 < args.len() {
                    per_day = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    store_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kasir POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("      --days <N>      Days of history to generate (default: 14)");
                println!("  -n, --per-day <N>   Transactions per day (default: 40)");
                println!("  -s, --store <ID>    Store id (default: toko-demo)");
                println!("  -d, --db <PATH>     Database file path (default: ./kasir_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kasir POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Store:    {}", store_id);
    println!("Days:     {} x {} transactions", days, per_day);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.transactions().list_completed(&store_id).await?;
    if !existing.is_empty() {
        println!("⚠ Store already has {} completed transactions", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating transactions...");

    let calendar = BusinessCalendar::default();
    let today = calendar.local_date(Utc::now());
    let now = Utc::now();
    let start = std::time::Instant::now();
    let mut generated = 0usize;

    for day_offset in (0..days).rev() {
        let date = today - Duration::days(day_offset);
        // 08:00 local
        let opening = calendar.start_of_date(date) + Duration::hours(8);

        for n in 0..per_day {
            let seed = (day_offset as usize) * 1_000 + n;
            let tx = generate_transaction(&store_id, opening, seed, per_day);

            // Today's later hours have not happened yet
            if tx.created_at > now {
                continue;
            }

            if let Err(e) = db.insert_transaction(&tx).await {
                eprintln!("Failed to insert {}: {}", tx.id, e);
                continue;
            }

            generated += 1;
        }

        println!("  {} done", date);
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} transactions in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} transactions/second",
        generated as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates one transaction spread across a 13-hour trading day.
fn generate_transaction(
    store_id: &str,
    opening: chrono::DateTime<Utc>,
    seed: usize,
    per_day: usize,
) -> Transaction {
    let trading_secs = 13 * 3_600;
    let step = trading_secs / per_day.max(1) as i64;
    let jitter = ((seed * 37) % 60) as i64;
    let created_at = normalize_timestamp(
        opening + Duration::seconds((seed % per_day.max(1)) as i64 * step + jitter),
    );

    let total = TICKETS[(seed * 7) % TICKETS.len()];
    // Cost of goods 55-75% of the ticket
    let cost = total * (55 + (seed % 21) as i64) / 100;

    let payment_method = match seed % 10 {
        0..=4 => PaymentMethod::Cash,
        5..=6 => PaymentMethod::Transfer,
        _ => PaymentMethod::Qris,
    };

    let payment_status = match seed % 12 {
        3 => PaymentStatus::Pending,
        7 => PaymentStatus::Failed,
        11 => PaymentStatus::Refunded,
        _ => PaymentStatus::Completed,
    };

    Transaction {
        id: Uuid::new_v4().to_string(),
        store_id: store_id.to_string(),
        total: Money::from_minor(total),
        cost_total: Money::from_minor(cost),
        payment_method,
        payment_status,
        cashier_id: Some(CASHIERS[seed % CASHIERS.len()].to_string()),
        created_at,
        // Demo sales are paid at the till
        completed_at: matches!(payment_status, PaymentStatus::Completed | PaymentStatus::Refunded)
            .then_some(created_at),
    }
}
