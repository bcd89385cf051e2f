use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Date, Month, PrimitiveDateTime, Time};

use transaction_reports::{Transaction, TransactionBuilder, create_transactions, initialize_db};

const CATEGORIES: [&str; 4] = ["electronics", "jewelery", "men's clothing", "women's clothing"];

/// A utility for creating a test database for the REST API server of transaction_reports.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The year to spread the transactions over.
    #[arg(long, default_value_t = 2023)]
    year: i32,

    /// How many transactions to create for each month.
    #[arg(long, default_value_t = 12)]
    per_month: u32,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test transactions...");

    let mut builders = Vec::new();
    let mut month = Month::January;
    for _ in 0..12 {
        builders.extend(month_of_transactions(args.year, month, args.per_month)?);
        month = month.next();
    }

    let inserted = create_transactions(builders, &conn)?;

    println!("Created {inserted} transactions. Success!");

    Ok(())
}

/// Spread `count` transactions over the first 28 days of `month`, cycling
/// through the categories and every price band.
fn month_of_transactions(
    year: i32,
    month: Month,
    count: u32,
) -> Result<Vec<TransactionBuilder>, Box<dyn Error>> {
    (0..count)
        .map(|i| -> Result<TransactionBuilder, Box<dyn Error>> {
            let day = (i % 28 + 1) as u8;
            let date = Date::from_calendar_date(year, month, day)?;
            let date_of_sale = PrimitiveDateTime::new(date, Time::from_hms(12, 0, 0)?).assume_utc();
            let price = (i % 10) as f64 * 100.0 + 49.99;
            let category = CATEGORIES[i as usize % CATEGORIES.len()];

            Ok(
                Transaction::build(&format!("{month} item #{}", i + 1), price, date_of_sale)
                    .description(&format!("A test {category} product"))
                    .category(category)
                    .sold(i % 3 != 0),
            )
        })
        .collect()
}
