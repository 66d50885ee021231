//! Spreadsheet date casting.
//!
//! Serial numbers are converted with the workbook's date epoch; text falls
//! back to a list of common free-text layouts. Failures are `None`, never
//! errors.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// Workbook date system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DateEpoch {
    /// Windows default: day 1 is 1900-01-01, with the phantom 1900-02-29
    #[default]
    #[serde(rename = "1900")]
    Excel1900,
    /// Classic Mac default: day 0 is 1904-01-01
    #[serde(rename = "1904")]
    Excel1904,
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Serial day that Excel's 1900 system assigns to the nonexistent 1900-02-29
const PHANTOM_LEAP_DAY: i64 = 60;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%Y%m%d",
];

/// Month-and-year layouts; parsed with the day set to 1
const MONTH_FORMATS: &[&str] = &["%d %B %Y", "%d %B, %Y", "%d %m/%Y", "%d %Y-%m"];

/// Convert a spreadsheet serial date number to a date and time
pub fn serial_to_datetime(serial: f64, epoch: DateEpoch) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let mut days = serial.trunc() as i64;
    let mut seconds = ((serial - serial.trunc()) * SECONDS_PER_DAY).round() as i64;
    if seconds >= SECONDS_PER_DAY as i64 {
        days += 1;
        seconds = 0;
    }

    let base = match epoch {
        DateEpoch::Excel1900 if days == PHANTOM_LEAP_DAY => return None,
        DateEpoch::Excel1900 if days < PHANTOM_LEAP_DAY => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        DateEpoch::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
        DateEpoch::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
    };

    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Parse free text as a date and time
///
/// Date-only layouts resolve to midnight; month-and-year layouts such as
/// `"March 2020"` resolve to the first of the month.
pub fn parse_free_text(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }

    let first_of_month = format!("1 {}", s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            MONTH_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&first_of_month, fmt).ok())
        })
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Cast a cell to a date and time
pub fn cast_datetime(cell: &Cell, epoch: DateEpoch) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Int(_) | Cell::Float(_) => cell.as_f64().and_then(|v| serial_to_datetime(v, epoch)),
        Cell::String(s) => match s.trim().parse::<f64>() {
            Ok(serial) => serial_to_datetime(serial, epoch),
            Err(_) => parse_free_text(s),
        },
        _ => None,
    }
}

/// Cast a cell to a calendar date
pub fn cast_date(cell: &Cell, epoch: DateEpoch) -> Option<NaiveDate> {
    cast_datetime(cell, epoch).map(|dt| dt.date())
}
