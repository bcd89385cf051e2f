//! Defines the route handler for searching transactions a page at a time.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State, rejection::QueryRejection},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    db::with_connection,
    pagination::{Page, PaginationConfig},
};

use super::core::{Transaction, map_transaction_row};

/// The state needed for searching transactions.
#[derive(Debug, Clone)]
pub struct SearchState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Configuration for default page number and size.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for SearchState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters for the search route.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// The page number to return. Starts from 1.
    pub page: Option<u64>,
    /// The maximum number of transactions to return.
    pub per_page: Option<u64>,
    /// Text to look for in the title, description or price.
    pub search: Option<String>,
}

/// Return one page of transactions matching the `search` query parameter.
pub async fn search_transactions_endpoint(
    State(state): State<SearchState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let Query(query) = query.map_err(|rejection| Error::InvalidQuery(rejection.body_text()))?;
    let page = Page::resolve(query.page, query.per_page, &state.pagination_config)?;
    let term = query.search.unwrap_or_default();

    let transactions = with_connection(state.db_connection, move |connection| {
        search_transactions(&term, page, connection)
    })
    .await?;

    Ok(Json(transactions))
}

/// Get the transactions on `page` whose title, description or price contains `term`.
///
/// Matching is a case-insensitive substring test. The price is compared as
/// text, with whole numbers written without a fractional part, e.g. `10` for
/// ten and `10.5` for ten and a half. An empty `term` matches every transaction. Results are ordered by ID so that pages do not overlap.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn search_transactions(
    term: &str,
    page: Page,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let pattern = format!("%{}%", escape_like(term));
    let (limit, offset) = page.limit_and_offset();

    connection
        .prepare(
            "SELECT id, title, description, price, category, image, sold, date_of_sale
             FROM \"transaction\"
             WHERE title LIKE ?1 ESCAPE '\\'
                OR description LIKE ?1 ESCAPE '\\'
                OR (CASE WHEN price = CAST(price AS INTEGER)
                         THEN CAST(CAST(price AS INTEGER) AS TEXT)
                         ELSE CAST(price AS TEXT)
                    END) LIKE ?1 ESCAPE '\\'
             ORDER BY id ASC
             LIMIT ?2 OFFSET ?3",
        )?
        .query_map((pattern, limit, offset), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Escape the `LIKE` wildcards in `term` so they match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());

    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        db::initialize,
        pagination::Page,
        transaction::{Transaction, create_transaction},
    };

    use super::{escape_like, search_transactions};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create(conn: &Connection, title: &str, description: &str, price: f64) {
        create_transaction(
            Transaction::build(title, price, datetime!(2023-01-05 0:00 UTC)).description(description),
            conn,
        )
        .expect("Could not create transaction");
    }

    fn all(size: u64) -> Page {
        Page { number: 1, size }
    }

    fn titles(transactions: &[Transaction]) -> Vec<&str> {
        transactions.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn matches_title_case_insensitively() {
        let conn = get_test_connection();
        create(&conn, "Mens Casual Slim Fit", "", 15.99);
        create(&conn, "Solid Gold Petite", "", 168.0);

        let got = search_transactions("slim", all(10), &conn).unwrap();

        assert_eq!(titles(&got), ["Mens Casual Slim Fit"]);
    }

    #[test]
    fn matches_description() {
        let conn = get_test_connection();
        create(&conn, "Jacket", "Great outerwear for SNOW", 56.99);
        create(&conn, "Shirt", "Cotton", 22.3);

        let got = search_transactions("snow", all(10), &conn).unwrap();

        assert_eq!(titles(&got), ["Jacket"]);
    }

    #[test]
    fn matches_price_as_text() {
        let conn = get_test_connection();
        for (title, price) in [
            ("a", 10.0),
            ("b", 100.0),
            ("c", 110.0),
            ("d", 1000.0),
            ("e", 10.5),
            ("f", 25.0),
            ("g", 9.99),
        ] {
            create(&conn, title, "", price);
        }

        let got = search_transactions("10", all(10), &conn).unwrap();

        assert_eq!(titles(&got), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn whole_number_prices_have_no_fractional_part() {
        let conn = get_test_connection();
        for (title, price) in [("p695", 695.0), ("p168", 168.0), ("p15", 15.0), ("p20.5", 20.5)] {
            create(&conn, title, "", price);
        }

        let zero = search_transactions("0", all(10), &conn).unwrap();
        let point_zero = search_transactions(".0", all(10), &conn).unwrap();
        let whole = search_transactions("695", all(10), &conn).unwrap();

        assert_eq!(titles(&zero), ["p20.5"]);
        assert!(point_zero.is_empty());
        assert_eq!(titles(&whole), ["p695"]);
    }

    #[test]
    fn empty_search_equals_unfiltered_listing() {
        let conn = get_test_connection();
        for i in 0..7 {
            create(&conn, &format!("item {i}"), "", i as f64);
        }

        let searched = search_transactions("", all(100), &conn).unwrap();
        let listed: Vec<Transaction> = conn
            .prepare(
                "SELECT id, title, description, price, category, image, sold, date_of_sale
                 FROM \"transaction\" ORDER BY id",
            )
            .unwrap()
            .query_map([], super::map_transaction_row)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(searched.len(), 7);
        assert_eq!(searched, listed);
    }

    #[test]
    fn pages_concatenate_to_full_result() {
        let conn = get_test_connection();
        for i in 0..23 {
            create(&conn, &format!("shoe {i}"), "", 50.0 + i as f64);
        }
        create(&conn, "hat", "", 5.0);

        let full = search_transactions("shoe", all(1000), &conn).unwrap();
        let mut concatenated = Vec::new();
        for number in 1..=5 {
            let page = search_transactions("shoe", Page { number, size: 5 }, &conn).unwrap();
            concatenated.extend(page);
        }

        assert_eq!(full.len(), 23);
        assert_eq!(concatenated, full);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let conn = get_test_connection();
        create(&conn, "only", "", 1.0);

        let got = search_transactions("", Page { number: 3, size: 10 }, &conn).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn wildcards_match_literally() {
        let conn = get_test_connection();
        create(&conn, "100% cotton", "", 1.0);
        create(&conn, "1000 cotton", "", 2.0);
        create(&conn, "snake_case", "", 3.0);
        create(&conn, "snakeXcase", "", 4.0);

        let percent = search_transactions("0%", all(10), &conn).unwrap();
        let underscore = search_transactions("e_c", all(10), &conn).unwrap();

        assert_eq!(titles(&percent), ["100% cotton"]);
        assert_eq!(titles(&underscore), ["snake_case"]);
    }

    #[test]
    fn escape_like_escapes_wildcards_and_backslash() {
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
