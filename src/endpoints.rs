//! The API endpoints URIs.

/// The route that seeds the database from the external dataset.
pub const INITIALIZE: &str = "/api/initialize";
/// The route for searching transactions page by page.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for the monthly sales summary.
pub const STATISTICS: &str = "/api/statistics";
/// The route for the monthly price histogram.
pub const BAR_CHART: &str = "/api/bar-chart";
/// The route for the monthly category breakdown.
pub const PIE_CHART: &str = "/api/pie-chart";
/// The route that returns all of the above for one month in a single response.
pub const COMBINED: &str = "/api/combined";
