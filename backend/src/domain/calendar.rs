//! Calendar helpers: year-month arithmetic and day clamping.
//!
//! Billing cycles are anchored to calendar day-of-month values that may
//! not exist in every month (a close day of 31 in February), so all
//! date construction goes through [`make_date`], which clamps the day
//! to the target month.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

const MONTH_NAMES_ES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// A (year, month) pair, month in 1-12. Serialized as `"YYYY-MM"`.
///
/// Ordering follows the derived lexicographic order on (year, month),
/// which is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month), "month out of range: {month}");
        Self { year, month }
    }

    /// The year-month a date falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Add (or subtract) months, rolling over year boundaries.
    pub fn add_months(self, delta: i32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: zero_based.div_euclid(12),
            month: (zero_based.rem_euclid(12) + 1) as u32,
        }
    }

    /// Human-readable label, e.g. "Marzo 2024".
    pub fn label(self) -> String {
        format!("{} {}", MONTH_NAMES_ES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid year-month: {s}"))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid year in: {s}"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in: {s}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in: {s}"));
        }
        Ok(Self { year, month })
    }
}

/// Number of days in a month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Clamp a day-of-month into the valid range for the given month.
pub fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.max(1).min(days_in_month(year, month))
}

/// Build a date from possibly out-of-range components, clamping the
/// day to the month. Always yields a valid date.
pub fn make_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let clamped = clamp_day(year, month, day);
    // The clamped day always exists for this month.
    NaiveDate::from_ymd_opt(year, month, clamped)
        .unwrap_or_else(|| panic!("unrepresentable date {year}-{month:02}-{clamped:02}"))
}

/// Extract a calendar date from a wire date cell. Accepts plain
/// `YYYY-MM-DD` as well as RFC 3339 timestamps (only the date part is
/// used). Returns `None` for anything else.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// `dd/mm/yyyy`, the display convention used everywhere in the UI.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
