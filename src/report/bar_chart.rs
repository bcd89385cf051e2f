//! The monthly price histogram with ten fixed price bands.

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

/// A price range in the histogram.
///
/// The first band holds prices in `[0, up_to]`. Every other band holds
/// prices in `(above, up_to]`, where `above` is the previous band's `up_to`,
/// and the last band has no upper limit. For whole-number prices this reads
/// the same as the labels, e.g. `101-200` holds 101 through 200, and a price
/// such as 100.5 still lands in exactly one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    /// The label shown on the chart.
    pub label: &'static str,
    /// Prices must be greater than this value, or at least zero when `None`.
    pub above: Option<f64>,
    /// Prices must be at most this value, or are unbounded when `None`.
    pub up_to: Option<f64>,
}

impl PriceBand {
    const fn new(label: &'static str, above: Option<f64>, up_to: Option<f64>) -> Self {
        Self {
            label,
            above,
            up_to,
        }
    }

    /// Whether `price` falls in this band.
    #[cfg(test)]
    pub fn contains(&self, price: f64) -> bool {
        let above_lower = match self.above {
            Some(above) => price > above,
            None => price >= 0.0,
        };
        let below_upper = self.up_to.is_none_or(|up_to| price <= up_to);

        above_lower && below_upper
    }

    /// The `WHERE` clause fragment for this band, over the `price` column.
    fn sql_condition(&self) -> String {
        let lower = match self.above {
            Some(above) => format!("price > {above}"),
            None => "price >= 0".to_owned(),
        };

        match self.up_to {
            Some(up_to) => format!("{lower} AND price <= {up_to}"),
            None => lower,
        }
    }
}

/// The histogram bands in chart order.
pub const PRICE_BANDS: [PriceBand; 10] = [
    PriceBand::new("0-100", None, Some(100.0)),
    PriceBand::new("101-200", Some(100.0), Some(200.0)),
    PriceBand::new("201-300", Some(200.0), Some(300.0)),
    PriceBand::new("301-400", Some(300.0), Some(400.0)),
    PriceBand::new("401-500", Some(400.0), Some(500.0)),
    PriceBand::new("501-600", Some(500.0), Some(600.0)),
    PriceBand::new("601-700", Some(600.0), Some(700.0)),
    PriceBand::new("701-800", Some(700.0), Some(800.0)),
    PriceBand::new("801-900", Some(800.0), Some(900.0)),
    PriceBand::new("901-above", Some(900.0), None),
];

/// One bar of the histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBandCount {
    /// The band's label, e.g. "101-200".
    pub range: String,
    /// The number of transactions in the month priced within the band.
    pub count: u32,
}

/// Count the transactions in each price band for the month given by the `month` query parameter.
pub async fn get_bar_chart_endpoint(
    State(state): State<ReportState>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> Result<Json<Vec<PriceBandCount>>, Error> {
    let window = state.window_for(query)?;

    load_bar_chart(state.db_connection, window).await.map(Json)
}

/// Count every band concurrently on the blocking thread pool.
///
/// The counts are returned in [PRICE_BANDS] order regardless of which query
/// finishes first. If any band fails the whole chart fails.
pub async fn load_bar_chart(
    db_connection: Arc<Mutex<Connection>>,
    window: MonthWindow,
) -> Result<Vec<PriceBandCount>, Error> {
    let band_tasks: Vec<_> = PRICE_BANDS
        .iter()
        .map(|band| {
            let band = *band;
            tokio::spawn(with_connection(db_connection.clone(), move |connection| {
                count_in_band(&band, &window, connection)
            }))
        })
        .collect();

    let mut counts = Vec::with_capacity(PRICE_BANDS.len());
    for (band, task) in PRICE_BANDS.iter().zip(band_tasks) {
        let count = task.await.map_err(|error| {
            tracing::error!("price band task for {} failed: {error}", band.label);
            Error::BlockingTaskFailed(error.to_string())
        })??;

        counts.push(PriceBandCount {
            range: band.label.to_owned(),
            count,
        });
    }

    Ok(counts)
}

/// Count the transactions in each price band whose sale date falls in `window`.
///
/// This is the sequential counterpart of [load_bar_chart].
///
/// # Errors
/// Returns [Error::SqlError] if any of the queries fail.
#[cfg(test)]
pub fn get_bar_chart(
    window: &MonthWindow,
    connection: &Connection,
) -> Result<Vec<PriceBandCount>, Error> {
    PRICE_BANDS
        .iter()
        .map(|band| {
            Ok(PriceBandCount {
                range: band.label.to_owned(),
                count: count_in_band(band, window, connection)?,
            })
        })
        .collect()
}

fn count_in_band(
    band: &PriceBand,
    window: &MonthWindow,
    connection: &Connection,
) -> Result<u32, Error> {
    let (start, end) = window_bounds(window)?;
    let query = format!(
        "SELECT COUNT(*) FROM \"transaction\"
        WHERE {} AND date_of_sale >= ?1 AND date_of_sale < ?2",
        band.sql_condition()
    );

    connection
        .query_row(&query, (start, end), |row| row.get(0))
        .map_err(|error| error.into())
}
