//! Seeds the database from the external product transaction dataset.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    db::with_connection,
    transaction::{TransactionBuilder, count_transactions, create_transactions},
};

/// Where the seed dataset is downloaded from unless configured otherwise.
pub const DEFAULT_SEED_URL: &str = "https://s3.amazonaws.com/roxiler.com/product_transaction.json";

/// The state needed for seeding the database.
#[derive(Debug, Clone)]
pub struct SeedState {
    /// The database connection the dataset is inserted into.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The URL of the JSON dataset.
    pub seed_url: String,
}

impl FromRef<AppState> for SeedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            seed_url: state.seed_url.clone(),
        }
    }
}

/// Download the dataset and insert every record as a new transaction.
///
/// Responds with plain text. Calling this more than once inserts the dataset
/// again, so the table will contain duplicates.
pub async fn initialize_endpoint(State(state): State<SeedState>) -> Response {
    match seed_database(state.db_connection, state.seed_url).await {
        Ok(total) => {
            tracing::info!("Seeded database, it now holds {total} transactions");
            (StatusCode::OK, "Database initialized").into_response()
        }
        Err(error) => {
            tracing::error!("Could not seed database: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error initializing database",
            )
                .into_response()
        }
    }
}

/// Fetch the dataset at `seed_url` and insert it.
///
/// Returns the number of transactions in the table afterwards.
///
/// # Errors
/// Returns [Error::SeedFetch] or [Error::SeedDecode] if the dataset cannot be
/// loaded, or any error from [create_transactions]. Nothing is inserted on error.
pub async fn seed_database(
    db_connection: Arc<Mutex<Connection>>,
    seed_url: String,
) -> Result<u32, Error> {
    let records = tokio::task::spawn_blocking(move || fetch_seed_records(&seed_url))
        .await
        .map_err(|error| Error::BlockingTaskFailed(error.to_string()))??;

    with_connection(db_connection, move |connection| {
        let inserted = create_transactions(records, connection)?;
        tracing::debug!("Inserted {inserted} seed transactions");

        count_transactions(connection)
    })
    .await
}

/// Download the dataset and decode it as a list of transactions.
///
/// This blocks on network I/O, call it from a blocking task.
///
/// # Errors
/// Returns [Error::SeedFetch] if the request fails or the server does not
/// respond with a success status, or [Error::SeedDecode] if the body is not a
/// JSON array of transactions.
pub fn fetch_seed_records(seed_url: &str) -> Result<Vec<TransactionBuilder>, Error> {
    tracing::info!("Fetching seed dataset from {seed_url}");

    let response = ureq::get(seed_url)
        .call()
        .map_err(|error| Error::SeedFetch(format!("request to {seed_url} failed: {error}")))?;

    let body = response
        .into_body()
        .read_to_string()
        .map_err(|error| Error::SeedFetch(format!("could not read response body: {error}")))?;

    parse_seed_records(&body)
}

fn parse_seed_records(body: &str) -> Result<Vec<TransactionBuilder>, Error> {
    serde_json::from_str(body).map_err(|error| Error::SeedDecode(error.to_string()))
}
