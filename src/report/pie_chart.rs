//! The monthly category breakdown.

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

/// One slice of the pie chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// The category name.
    #[serde(rename = "_id")]
    pub category: String,
    /// The number of transactions in the month with this category.
    pub count: u32,
}

/// Count the transactions per category for the month given by the `month` query parameter.
pub async fn get_pie_chart_endpoint(
    State(state): State<ReportState>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> Result<Json<Vec<CategoryCount>>, Error> {
    let window = state.window_for(query)?;

    load_pie_chart(state.db_connection, window).await.map(Json)
}

/// Run [get_pie_chart] on the blocking thread pool.
pub async fn load_pie_chart(
    db_connection: Arc<Mutex<Connection>>,
    window: MonthWindow,
) -> Result<Vec<CategoryCount>, Error> {
    with_connection(db_connection, move |connection| {
        get_pie_chart(&window, connection)
    })
    .await
}

/// Count the transactions per category whose sale date falls in `window`.
///
/// Only categories that appear in the month are returned, sorted by name.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_pie_chart(
    window: &MonthWindow,
    connection: &Connection,
) -> Result<Vec<CategoryCount>, Error> {
    let (start, end) = window_bounds(window)?;

    connection
        .prepare(
            "SELECT category, COUNT(*) FROM \"transaction\"
            WHERE date_of_sale >= ?1 AND date_of_sale < ?2
            GROUP BY category
            ORDER BY category ASC",
        )?
        .query_map((start, end), |row| {
            Ok(CategoryCount {
                category: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<CategoryCount>, rusqlite::Error>>()
        .map_err(|error| error.into())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::report::test_fixtures::{create, get_test_connection, january_2023};

    use super::{CategoryCount, get_pie_chart};

    fn slice(category: &str, count: u32) -> CategoryCount {
        CategoryCount {
            category: category.to_owned(),
            count,
        }
    }

    #[test]
    fn counts_example_month() {
        let conn = get_test_connection();
        create(&conn, 50.0, true, "A", datetime!(2023-01-05 0:00 UTC));
        create(&conn, 150.0, false, "B", datetime!(2023-01-20 0:00 UTC));

        let got = get_pie_chart(&january_2023(), &conn).unwrap();

        assert_eq!(got, [slice("A", 1), slice("B", 1)]);
    }

    #[test]
    fn groups_by_category() {
        let conn = get_test_connection();
        for category in ["jewelery", "electronics", "jewelery", "men's clothing", "jewelery"] {
            create(&conn, 10.0, true, category, datetime!(2023-01-15 0:00 UTC));
        }
        create(&conn, 10.0, true, "women's clothing", datetime!(2023-03-15 0:00 UTC));

        let got = get_pie_chart(&january_2023(), &conn).unwrap();

        assert_eq!(
            got,
            [
                slice("electronics", 1),
                slice("jewelery", 3),
                slice("men's clothing", 1)
            ]
        );
    }

    #[test]
    fn empty_month_has_no_slices() {
        let conn = get_test_connection();

        let got = get_pie_chart(&january_2023(), &conn).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn serializes_category_as_id() {
        assert_eq!(
            serde_json::to_value(slice("A", 1)).unwrap(),
            serde_json::json!({"_id": "A", "count": 1})
        );
    }
}
