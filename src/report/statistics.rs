//! The monthly sales summary.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::with_connection,
    month::{MonthQuery, MonthWindow},
};

use super::{ReportState, window_bounds};

/// Totals for the transactions sold in one month.
///
/// A month with no transactions has every field set to zero.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// The sum of the prices of every transaction in the month, sold or not.
    pub total_amount: f64,
    /// How many transactions in the month were sold.
    pub sold_items: u32,
    /// How many transactions in the month were not sold.
    pub not_sold_items: u32,
}

/// Summarise the transactions for the month given by the `month` query parameter.
pub async fn get_statistics_endpoint(
    State(state): State<ReportState>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> Result<Json<Statistics>, Error> {
    let window = state.window_for(query)?;

    load_statistics(state.db_connection, window).await.map(Json)
}

/// Run [get_statistics] on the blocking thread pool.
pub async fn load_statistics(
    db_connection: Arc<Mutex<Connection>>,
    window: MonthWindow,
) -> Result<Statistics, Error> {
    with_connection(db_connection, move |connection| {
        get_statistics(&window, connection)
    })
    .await
}

/// Summarise the transactions whose sale date falls in `window`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_statistics(window: &MonthWindow, connection: &Connection) -> Result<Statistics, Error> {
    let (start, end) = window_bounds(window)?;

    connection
        .query_row(
            "SELECT
                TOTAL(price),
                COUNT(*) FILTER (WHERE sold),
                COUNT(*) FILTER (WHERE NOT sold)
            FROM \"transaction\"
            WHERE date_of_sale >= ?1 AND date_of_sale < ?2",
            (start, end),
            |row| {
                Ok(Statistics {
                    total_amount: row.get(0)?,
                    sold_items: row.get(1)?,
                    not_sold_items: row.get(2)?,
                })
            },
        )
        .map_err(|error| error.into())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::report::test_fixtures::{create, get_test_connection, january_2023};

    use super::{Statistics, get_statistics};

    #[test]
    fn summarises_month() {
        let conn = get_test_connection();
        create(&conn, 50.0, true, "A", datetime!(2023-01-05 0:00 UTC));
        create(&conn, 150.0, false, "B", datetime!(2023-01-20 0:00 UTC));

        let got = get_statistics(&january_2023(), &conn).unwrap();

        assert_eq!(
            got,
            Statistics {
                total_amount: 200.0,
                sold_items: 1,
                not_sold_items: 1,
            }
        );
    }

    #[test]
    fn empty_month_is_zero_filled() {
        let conn = get_test_connection();
        create(&conn, 50.0, true, "A", datetime!(2023-02-05 0:00 UTC));

        let got = get_statistics(&january_2023(), &conn).unwrap();

        assert_eq!(got, Statistics::default());
    }

    #[test]
    fn ignores_transactions_outside_window() {
        let conn = get_test_connection();
        create(&conn, 1.0, true, "A", datetime!(2022-12-31 23:59:59 UTC));
        create(&conn, 2.0, true, "A", datetime!(2023-01-01 0:00 UTC));
        create(&conn, 4.0, false, "A", datetime!(2023-01-31 23:59:59 UTC));
        create(&conn, 8.0, false, "A", datetime!(2023-02-01 0:00 UTC));
        // Same month in a different year.
        create(&conn, 16.0, true, "A", datetime!(2022-01-15 0:00 UTC));

        let got = get_statistics(&january_2023(), &conn).unwrap();

        assert_eq!(got.total_amount, 6.0);
        assert_eq!(got.sold_items, 1);
        assert_eq!(got.not_sold_items, 1);
    }

    #[test]
    fn total_keeps_fractional_prices() {
        let conn = get_test_connection();
        create(&conn, 0.25, true, "A", datetime!(2023-01-02 0:00 UTC));
        create(&conn, 0.5, false, "A", datetime!(2023-01-03 0:00 UTC));

        let got = get_statistics(&january_2023(), &conn).unwrap();

        assert_eq!(got.total_amount, 0.75);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let stats = Statistics {
            total_amount: 200.0,
            sold_items: 1,
            not_sold_items: 1,
        };

        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            serde_json::json!({"totalAmount": 200.0, "soldItems": 1, "notSoldItems": 1})
        );
    }
}
