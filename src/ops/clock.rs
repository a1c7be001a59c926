use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::model::DEFAULT_ROLLOVER_HOUR;

/// The logical date for a moment: before the rollover hour, the previous
/// calendar day is still "today"
pub fn logical_date(now: NaiveDateTime, rollover_hour: u32) -> NaiveDate {
    let hour = if rollover_hour <= 23 {
        rollover_hour
    } else {
        DEFAULT_ROLLOVER_HOUR
    };
    let date = now.date();
    if now.hour() < hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Date key of the logical date for a moment
pub fn logical_date_key(now: NaiveDateTime, rollover_hour: u32) -> String {
    date_key(logical_date(now, rollover_hour))
}

/// `YYYY-MM-DD`, zero-padded, local calendar fields
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inverse of [`date_key`]; malformed keys yield None
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Weekday index with 0 = Sunday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
