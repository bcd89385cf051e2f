//! Month parsing and the half-open date windows that scope every report.

use serde::Deserialize;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::{Error, timezone::get_offset_at};

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Parse a month from its English name, three-letter abbreviation, or number.
///
/// Names are case-insensitive and numbers may be zero-padded, so "March",
/// "mar", "3" and "03" all parse to [Month::March].
///
/// # Errors
/// Returns [Error::InvalidMonth] for anything outside those twelve months.
pub fn parse_month(text: &str) -> Result<Month, Error> {
    let trimmed = text.trim();

    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        let number = trimmed
            .parse::<u8>()
            .map_err(|_| Error::InvalidMonth(text.to_owned()))?;
        return Month::try_from(number).map_err(|_| Error::InvalidMonth(text.to_owned()));
    }

    let lowercase = trimmed.to_lowercase();

    MONTHS
        .into_iter()
        .find(|month| {
            let name = month.to_string().to_lowercase();
            lowercase == name || (lowercase.len() == 3 && name.starts_with(&lowercase))
        })
        .ok_or_else(|| Error::InvalidMonth(text.to_owned()))
}

/// The instants `[start, end)` that bound one calendar month.
///
/// Both ends are in UTC so they can be compared directly with stored sale dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    /// The first instant of the month.
    pub start: OffsetDateTime,
    /// The first instant of the following month.
    pub end: OffsetDateTime,
}

impl MonthWindow {
    /// Create the window for `month` of `year` using fixed `offset` for both boundaries.
    ///
    /// # Errors
    /// Returns [Error::InvalidYear] if the month or the following month cannot be represented.
    #[cfg(test)]
    pub fn new(year: i32, month: Month, offset: UtcOffset) -> Result<Self, Error> {
        Self::with_offsets(year, month, |_| Ok(offset))
    }

    /// Create the window for `month` of `year` with the boundaries in `canonical_timezone`.
    ///
    /// # Errors
    /// Returns [Error::InvalidYear] if the dates cannot be represented, or
    /// [Error::InvalidTimezoneError] if `canonical_timezone` is not a known timezone.
    pub fn in_timezone(year: i32, month: Month, canonical_timezone: &str) -> Result<Self, Error> {
        Self::with_offsets(year, month, |local_time| {
            get_offset_at(canonical_timezone, local_time).ok_or_else(|| {
                tracing::error!("Invalid timezone {}", canonical_timezone);
                Error::InvalidTimezoneError(canonical_timezone.to_owned())
            })
        })
    }

    fn with_offsets(
        year: i32,
        month: Month,
        offset_at: impl Fn(PrimitiveDateTime) -> Result<UtcOffset, Error>,
    ) -> Result<Self, Error> {
        let (next_year, next_month) = match month {
            Month::December => (year.checked_add(1).ok_or(Error::InvalidYear(year))?, Month::January),
            month => (year, month.next()),
        };

        let start = first_instant(year, month, &offset_at)?;
        let end = first_instant(next_year, next_month, &offset_at)
            .map_err(|error| match error {
                Error::InvalidYear(_) => Error::InvalidYear(year),
                error => error,
            })?;

        Ok(Self { start, end })
    }

    /// Whether `instant` falls inside the window.
    #[cfg(test)]
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn first_instant(
    year: i32,
    month: Month,
    offset_at: &impl Fn(PrimitiveDateTime) -> Result<UtcOffset, Error>,
) -> Result<OffsetDateTime, Error> {
    let date = Date::from_calendar_date(year, month, 1).map_err(|_| Error::InvalidYear(year))?;
    let local_midnight = PrimitiveDateTime::new(date, Time::MIDNIGHT);
    let offset = offset_at(local_midnight)?;

    local_midnight
        .assume_offset(offset)
        .checked_to_offset(UtcOffset::UTC)
        .ok_or(Error::InvalidYear(year))
}

/// The query parameters shared by the month-scoped report routes.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    /// The month to report on, see [parse_month]. Required.
    pub month: Option<String>,
    /// The year the month falls in, defaults to the configured report year.
    pub year: Option<i32>,
}

impl MonthQuery {
    /// Validate the query and compute its window.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if the month is missing or unrecognised, or any error
    /// from [MonthWindow::in_timezone].
    pub fn window(&self, default_year: i32, canonical_timezone: &str) -> Result<MonthWindow, Error> {
        let month = match &self.month {
            Some(text) => parse_month(text)?,
            None => return Err(Error::InvalidMonth(String::new())),
        };

        MonthWindow::in_timezone(self.year.unwrap_or(default_year), month, canonical_timezone)
    }
}
