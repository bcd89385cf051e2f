//! Month-scoped reports over the transaction table: a sales summary, a price
//! histogram and a category breakdown.
//!
//! Each report has a plain function that runs against a [rusqlite::Connection]
//! and a route handler that validates the month and runs that function on the
//! blocking thread pool.

mod bar_chart;
mod pie_chart;
mod statistics;

use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, Query, rejection::QueryRejection};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    month::{MonthQuery, MonthWindow},
    transaction::to_storage_timestamp,
};

pub use bar_chart::{PriceBandCount, get_bar_chart_endpoint, load_bar_chart};
pub use pie_chart::{CategoryCount, get_pie_chart_endpoint, load_pie_chart};
pub use statistics::{Statistics, get_statistics_endpoint, load_statistics};

/// The state needed for the report routes.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The canonical name of the timezone that month boundaries are computed in.
    pub local_timezone: String,
    /// The year used when a request does not give one.
    pub report_year: i32,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            report_year: state.report_year,
        }
    }
}

impl ReportState {
    /// Validate the `month` and `year` query parameters and compute the window they describe.
    ///
    /// # Errors
    /// Returns [Error::InvalidQuery] if the query string is malformed, or any error from
    /// [MonthQuery::window].
    pub fn window_for(
        &self,
        query: Result<Query<MonthQuery>, QueryRejection>,
    ) -> Result<MonthWindow, Error> {
        let Query(query) = query.map_err(|rejection| Error::InvalidQuery(rejection.body_text()))?;

        query.window(self.report_year, &self.local_timezone)
    }
}

/// The window's start and end in the same text format as stored sale dates.
///
/// Bind these as `date_of_sale >= ?start AND date_of_sale < ?end`.
fn window_bounds(window: &MonthWindow) -> Result<(String, String), Error> {
    Ok((
        to_storage_timestamp(window.start)?,
        to_storage_timestamp(window.end)?,
    ))
}

#[cfg(test)]
mod test_fixtures {
    use rusqlite::Connection;
    use time::{Month, OffsetDateTime, UtcOffset};

    use crate::{
        db::initialize,
        month::MonthWindow,
        transaction::{Transaction, create_transaction},
    };

    pub(super) fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    pub(super) fn january_2023() -> MonthWindow {
        MonthWindow::new(2023, Month::January, UtcOffset::UTC).unwrap()
    }

    pub(super) fn create(
        conn: &Connection,
        price: f64,
        sold: bool,
        category: &str,
        date_of_sale: OffsetDateTime,
    ) {
        create_transaction(
            Transaction::build("item", price, date_of_sale)
                .category(category)
                .sold(sold),
            conn,
        )
        .expect("Could not create transaction");
    }
}
