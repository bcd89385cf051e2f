//! A small HTTP backend for reporting on product sale transactions.
//!
//! The server seeds a SQLite table from an external JSON dataset and serves
//! paginated search, monthly statistics, and chart-ready aggregations over it.
//! All routes live under `/api` and respond with JSON, apart from the seed route
//! which responds with plain text.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod combined;
mod db;
mod endpoints;
mod logging;
mod month;
mod pagination;
mod report;
mod routing;
mod seed;
mod timezone;
mod transaction;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use seed::DEFAULT_SEED_URL;
pub use transaction::{Transaction, TransactionBuilder, create_transactions};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The month query parameter was missing or is not one of the twelve
    /// recognised month names, abbreviations or numbers.
    #[error("\"{0}\" is not a valid month")]
    InvalidMonth(String),

    /// The year cannot be combined with a month to form a valid date.
    #[error("{0} is not a valid year")]
    InvalidYear(i32),

    /// Pages are numbered from 1.
    #[error("page {0} is not valid, pages start at 1")]
    InvalidPage(u64),

    /// The query string could not be deserialized into the expected parameters.
    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A task on the blocking thread pool panicked or was cancelled.
    #[error("a blocking task failed: {0}")]
    BlockingTaskFailed(String),

    /// An error occurred while getting the offset for a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// A stored sale date could not be parsed or a date could not be formatted for storage.
    #[error("invalid timestamp \"{0}\"")]
    InvalidTimestamp(String),

    /// The seed dataset could not be downloaded.
    #[error("could not fetch the seed dataset: {0}")]
    SeedFetch(String),

    /// The seed dataset was not a JSON array of transactions.
    #[error("could not decode the seed dataset: {0}")]
    SeedDecode(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to the client for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl Error {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::InvalidMonth(_) => (StatusCode::BAD_REQUEST, "invalid_month"),
            Error::InvalidYear(_) => (StatusCode::BAD_REQUEST, "invalid_year"),
            Error::InvalidPage(_) => (StatusCode::BAD_REQUEST, "invalid_page"),
            Error::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            Error::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidTimezoneError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_timezone")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Error::InvalidMonth(_)
            | Error::InvalidYear(_)
            | Error::InvalidPage(_)
            | Error::InvalidQuery(_)
            | Error::NotFound => self.to_string(),
            Error::InvalidTimezoneError(timezone) => format!(
                "Could not get the offset for timezone \"{timezone}\". Check your server settings and \
                ensure the timezone has been set to a valid, canonical timezone string"
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
        };

        (
            status,
            Json(ErrorBody {
                error: code,
                message,
            }),
        )
            .into_response()
    }
}
