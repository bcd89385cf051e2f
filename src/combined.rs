//! The combined view: search, statistics and both charts for one month in a single response.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State, rejection::QueryRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    db::with_connection,
    month::{MonthQuery, MonthWindow},
    pagination::{Page, PaginationConfig},
    report::{
        CategoryCount, PriceBandCount, ReportState, Statistics, load_bar_chart, load_pie_chart,
        load_statistics,
    },
    transaction::{Transaction, search_transactions},
};

/// The state needed for the combined view.
#[derive(Debug, Clone)]
pub struct CombinedState {
    /// The state shared with the individual report routes.
    pub report: ReportState,
    /// Configuration for the size of the page of transactions.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CombinedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            report: ReportState::from_ref(state),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Every view of one month, keyed the same way as the individual routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedView {
    /// The first page of all transactions, unfiltered.
    pub transactions: Vec<Transaction>,
    /// The month's sales summary.
    pub statistics: Statistics,
    /// The month's price histogram.
    pub bar_chart: Vec<PriceBandCount>,
    /// The month's category breakdown.
    pub pie_chart: Vec<CategoryCount>,
}

/// Return the transactions, statistics, bar chart and pie chart for the month
/// given by the `month` query parameter.
pub async fn get_combined_endpoint(
    State(state): State<CombinedState>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> Result<Json<CombinedView>, Error> {
    let window = state.report.window_for(query)?;
    let page = Page::first(&state.pagination_config);

    load_combined_view(state.report.db_connection, window, page)
        .await
        .map(Json)
}

/// Run the four views concurrently and wait for all of them.
///
/// If any view fails the whole combined view fails.
pub async fn load_combined_view(
    db_connection: Arc<Mutex<Connection>>,
    window: MonthWindow,
    page: Page,
) -> Result<CombinedView, Error> {
    let (transactions, statistics, bar_chart, pie_chart) = tokio::try_join!(
        with_connection(db_connection.clone(), move |connection| {
            search_transactions("", page, connection)
        }),
        load_statistics(db_connection.clone(), window),
        load_bar_chart(db_connection.clone(), window),
        load_pie_chart(db_connection, window),
    )?;

    Ok(CombinedView {
        transactions,
        statistics,
        bar_chart,
        pie_chart,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::{Month, UtcOffset, macros::datetime};

    use crate::{
        db::initialize,
        month::MonthWindow,
        pagination::Page,
        report::Statistics,
        transaction::{Transaction, create_transaction},
    };

    use super::load_combined_view;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn window(month: Month) -> MonthWindow {
        MonthWindow::new(2023, month, UtcOffset::UTC).unwrap()
    }

    #[tokio::test]
    async fn empty_month_returns_empty_views() {
        let conn = get_test_connection();
        create_transaction(
            Transaction::build("elsewhere", 10.0, datetime!(2023-05-01 0:00 UTC)),
            &conn,
        )
        .unwrap();

        let got = load_combined_view(
            Arc::new(Mutex::new(conn)),
            window(Month::January),
            Page { number: 1, size: 10 },
        )
        .await
        .unwrap();

        // The transaction page is not scoped to the month.
        assert_eq!(got.transactions.len(), 1);
        assert_eq!(got.statistics, Statistics::default());
        assert_eq!(got.bar_chart.len(), 10);
        assert!(got.bar_chart.iter().all(|bar| bar.count == 0));
        assert!(got.pie_chart.is_empty());
    }

    #[tokio::test]
    async fn views_agree_on_month_totals() {
        let conn = get_test_connection();
        let sales = [
            (12.5, true, "electronics", datetime!(2023-03-01 0:00 UTC)),
            (150.0, false, "jewelery", datetime!(2023-03-09 12:00 UTC)),
            (999.0, true, "jewelery", datetime!(2023-03-31 23:59 UTC)),
            (100.5, false, "men's clothing", datetime!(2023-03-15 0:00 UTC)),
            (42.0, true, "electronics", datetime!(2023-04-01 0:00 UTC)),
        ];
        for (price, sold, category, date) in sales {
            create_transaction(
                Transaction::build("item", price, date)
                    .category(category)
                    .sold(sold),
                &conn,
            )
            .unwrap();
        }

        let got = load_combined_view(
            Arc::new(Mutex::new(conn)),
            window(Month::March),
            Page { number: 1, size: 2 },
        )
        .await
        .unwrap();

        let stats_total = got.statistics.sold_items + got.statistics.not_sold_items;
        let bar_total: u32 = got.bar_chart.iter().map(|bar| bar.count).sum();
        let pie_total: u32 = got.pie_chart.iter().map(|slice| slice.count).sum();

        assert_eq!(stats_total, 4);
        assert_eq!(bar_total, stats_total);
        assert_eq!(pie_total, stats_total);
        assert_eq!(got.statistics.total_amount, 12.5 + 150.0 + 999.0 + 100.5);
        assert_eq!(got.transactions.len(), 2);
    }
}
