//! Pagination and sorting for list endpoints


use serde::Serialize;

use crate::validator::{self, Validator};


pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;


/// Direction in which a list is sorted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}


/// Paging and sorting parameters for a single list request
#[derive(Clone, Debug)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,

    /// Sort values accepted by the endpoint, including `-` prefixed variants
    pub sort_safelist: &'static [&'static str],
}

impl Filters {

    /// Builds filters from raw query string values
    ///
    /// Absent values fall back to defaults. Values that are not integers are
    /// reported to `v` and replaced by their default so that the remaining
    /// checks still run.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        sort: Option<&str>,
        default_sort: &str,
        sort_safelist: &'static [&'static str],
        v: &mut Validator,
    ) -> Self {
        Filters {
            page: read_int(page, "page", DEFAULT_PAGE, v),
            page_size: read_int(page_size, "page_size", DEFAULT_PAGE_SIZE, v),
            sort: sort.unwrap_or(default_sort).to_owned(),
            sort_safelist,
        }
    }

    /// Records any out-of-range or unknown values in `v`
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(self.page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
        v.check(
            validator::permitted_value(&self.sort.as_str(), self.sort_safelist),
            "sort",
            "invalid sort value",
        );
    }

    /// Column name to sort by, without any direction prefix
    pub fn sort_column(&self) -> &str {
        self.sort.trim_start_matches('-')
    }

    pub fn sort_direction(&self) -> Direction {
        if self.sort.starts_with('-') {
            Direction::Descending
        } else {
            Direction::Ascending
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}


fn read_int(raw: Option<&str>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}


/// Pagination details returned alongside a page of records
///
/// All fields are omitted when no records matched.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

impl Metadata {

    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Metadata::default();
        }

        Metadata {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}
