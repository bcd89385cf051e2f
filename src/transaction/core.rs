//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row, Transaction as SqlTransaction, types::Type};
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::Error;

// ============================================================================
// MODELS
// ============================================================================

/// A product listing and whether it sold.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction, assigned by the database.
    pub id: i64,
    /// The name of the product.
    pub title: String,
    /// A longer text description of the product.
    pub description: String,
    /// The listed price of the product.
    pub price: f64,
    /// A short label grouping similar products, e.g. "electronics".
    pub category: String,
    /// A URL for a picture of the product.
    pub image: Option<String>,
    /// Whether the product has been sold.
    pub sold: bool,
    /// When the product was sold, or listed if it has not sold.
    #[serde(with = "time::serde::rfc3339")]
    pub date_of_sale: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(title: &str, price: f64, date_of_sale: OffsetDateTime) -> TransactionBuilder {
        TransactionBuilder {
            title: title.to_owned(),
            description: String::new(),
            price,
            category: String::new(),
            image: None,
            sold: false,
            date_of_sale,
        }
    }
}

/// A transaction that has not been stored yet.
///
/// This is also the shape of each record in the seed dataset, so it can be
/// deserialized straight from the external JSON feed. Keys in the feed that
/// are not listed here, such as the feed's own `id`, are ignored.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBuilder {
    /// The name of the product.
    pub title: String,

    /// A longer text description of the product.
    pub description: String,

    /// The listed price of the product.
    ///
    /// Search matches against this value rendered as text, so a search for
    /// "10" will match prices such as 10, 100 and 10.5.
    pub price: f64,

    /// A short label grouping similar products.
    ///
    /// The pie chart has one slice for each distinct category.
    pub category: String,

    /// A URL for a picture of the product.
    pub image: Option<String>,

    /// Whether the product has been sold.
    pub sold: bool,

    /// When the product was sold.
    ///
    /// The offset is preserved in the input but the date is stored in UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date_of_sale: OffsetDateTime,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set the image URL for the transaction.
    pub fn image(mut self, image: Option<&str>) -> Self {
        self.image = image.map(str::to_owned);
        self
    }

    /// Set whether the transaction's product has sold.
    pub fn sold(mut self, sold: bool) -> Self {
        self.sold = sold;
        self
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// The text format for sale dates in the database.
///
/// Every value is in UTC with a fixed width, so comparing the text in SQL
/// gives the same order as comparing the instants.
const STORAGE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

/// Format `instant` for storage or for comparison against stored sale dates.
///
/// # Errors
/// Returns [Error::InvalidTimestamp] if `instant` cannot be expressed in UTC
/// or formatted.
pub(crate) fn to_storage_timestamp(instant: OffsetDateTime) -> Result<String, Error> {
    instant
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(|| Error::InvalidTimestamp(instant.to_string()))?
        .format(STORAGE_FORMAT)
        .map_err(|error| {
            tracing::error!("could not format {instant} for storage: {error}");
            Error::InvalidTimestamp(instant.to_string())
        })
}

fn from_storage_timestamp(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(text, STORAGE_FORMAT).map(PrimitiveDateTime::assume_utc)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTimestamp] if the sale date cannot be stored,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let date_of_sale = to_storage_timestamp(builder.date_of_sale)?;

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (title, description, price, category, image, sold, date_of_sale)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, title, description, price, category, image, sold, date_of_sale",
        )?
        .query_row(
            (
                builder.title,
                builder.description,
                builder.price,
                builder.category,
                builder.image,
                builder.sold,
                date_of_sale,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Insert all of `builders` as new transactions inside a single SQL transaction.
///
/// Either every transaction is inserted or none are. No attempt is made to
/// detect duplicates, inserting the same builders twice stores them twice.
///
/// Returns the number of transactions inserted.
///
/// # Errors
/// Returns the first error from [create_transaction], after rolling back.
pub fn create_transactions(
    builders: Vec<TransactionBuilder>,
    connection: &Connection,
) -> Result<usize, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let count = builders.len();
    for builder in builders {
        create_transaction(builder, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    Ok(count)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                price REAL NOT NULL,
                category TEXT NOT NULL,
                image TEXT,
                sold INTEGER NOT NULL,
                date_of_sale TEXT NOT NULL
                )",
        (),
    )?;

    // Every report filters on the sale date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date_of_sale ON \"transaction\"(date_of_sale);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// Expects the columns in table order: id, title, description, price, category,
/// image, sold, date_of_sale.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let title = row.get(1)?;
    let description = row.get(2)?;
    let price = row.get(3)?;
    let category = row.get(4)?;
    let image = row.get(5)?;
    let sold = row.get(6)?;

    let raw_date: String = row.get(7)?;
    let date_of_sale = from_storage_timestamp(&raw_date).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id,
        title,
        description,
        price,
        category,
        image,
        sold,
        date_of_sale,
    })
}

// ============================================================================
// TESTS
// ============================================================================
