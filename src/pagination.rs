//! This modules defines the common functionality for paging data.

use crate::Error;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum number of transactions to return per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
        }
    }
}

/// A resolved page request, ready to be turned into `LIMIT`/`OFFSET` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-indexed page number.
    pub number: u64,
    /// The maximum number of rows in the page.
    pub size: u64,
}

impl Page {
    /// Apply the defaults in `config` to the optional request values.
    ///
    /// # Errors
    /// Returns [Error::InvalidPage] if `page` is zero.
    pub fn resolve(
        page: Option<u64>,
        page_size: Option<u64>,
        config: &PaginationConfig,
    ) -> Result<Self, Error> {
        let number = page.unwrap_or(config.default_page);

        if number == 0 {
            return Err(Error::InvalidPage(number));
        }

        Ok(Self {
            number,
            size: page_size.unwrap_or(config.default_page_size),
        })
    }

    /// The first page with the default size.
    pub fn first(config: &PaginationConfig) -> Self {
        Self {
            number: 1,
            size: config.default_page_size,
        }
    }

    /// The number of rows to skip, `(page - 1) * size`. Page 0 is treated as page 1.
    pub fn offset(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    /// The `LIMIT` and `OFFSET` values as SQLite integers.
    ///
    /// Values too large for SQLite are clamped, which returns an empty page.
    pub fn limit_and_offset(&self) -> (i64, i64) {
        let clamp = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);

        (clamp(self.size), clamp(self.offset()))
    }
}
