//! Period keys for the three bucket sizes.
//!
//! Every bucket size maps to one [`BucketStrategy`]: a grouping function that
//! snaps a date to the first day of its bucket, and a formatter that renders
//! that bucket start as a canonical [`PeriodKey`]. The strategy is picked once
//! per request; nothing else branches on the bucket size.
//!
//! Key shapes (`YYYY`, `YYYY-MM`, `YYYY-Qn`) are fixed-width for years
//! `0..=9999`, so plain string order equals chronological order.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::types::BucketSize;

/// Canonical, ascending-sortable identifier of one time bucket.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bucket size whose shape this key has, if any.
    pub fn shape(&self) -> Option<BucketSize> {
        key_shape(&self.0)
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for PeriodKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Grouping and formatting functions for one bucket size.
#[derive(Debug)]
pub struct BucketStrategy {
    pub bucket: BucketSize,
    /// First calendar day of the bucket containing the date.
    pub group: fn(NaiveDate) -> NaiveDate,
    /// Renders a bucket start as its key.
    pub format: fn(NaiveDate) -> String,
}

impl BucketStrategy {
    pub fn period_key(&self, date: NaiveDate) -> PeriodKey {
        PeriodKey((self.format)((self.group)(date)))
    }
}

static STRATEGIES: [BucketStrategy; 3] = [
    BucketStrategy {
        bucket: BucketSize::Month,
        group: month_start,
        format: format_month,
    },
    BucketStrategy {
        bucket: BucketSize::Quarter,
        group: quarter_start,
        format: format_quarter,
    },
    BucketStrategy {
        bucket: BucketSize::Year,
        group: year_start,
        format: format_year,
    },
];

/// Look up the strategy for `bucket`.
pub fn strategy(bucket: BucketSize) -> &'static BucketStrategy {
    match bucket {
        BucketSize::Month => &STRATEGIES[0],
        BucketSize::Quarter => &STRATEGIES[1],
        BucketSize::Year => &STRATEGIES[2],
    }
}

/// Period key of `date` under `bucket`.
pub fn period_key(date: NaiveDate, bucket: BucketSize) -> PeriodKey {
    strategy(bucket).period_key(date)
}

/// Quarter number (1-4) of a calendar month (1-12).
pub fn quarter_of(month: u32) -> u32 {
    month.div_ceil(3)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn quarter_start(date: NaiveDate) -> NaiveDate {
    let first_month = (quarter_of(date.month()) - 1) * 3 + 1;
    date.with_day(1)
        .and_then(|d| d.with_month(first_month))
        .unwrap_or(date)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

fn format_year(start: NaiveDate) -> String {
    format!("{:04}", start.year())
}

fn format_month(start: NaiveDate) -> String {
    format!("{:04}-{:02}", start.year(), start.month())
}

fn format_quarter(start: NaiveDate) -> String {
    format!("{:04}-Q{}", start.year(), quarter_of(start.month()))
}

fn key_shape(key: &str) -> Option<BucketSize> {
    let bytes = key.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    match bytes.len() {
        4 if digits(0..4) => Some(BucketSize::Year),
        7 if digits(0..4) && bytes[4] == b'-' && bytes[5] == b'Q' => {
            matches!(bytes[6], b'1'..=b'4').then_some(BucketSize::Quarter)
        }
        7 if digits(0..4) && bytes[4] == b'-' && digits(5..7) => {
            let month = (bytes[5] - b'0') * 10 + (bytes[6] - b'0');
            (1..=12).contains(&month).then_some(BucketSize::Month)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
