use chrono::NaiveDate;
use thiserror::Error;

/// Construction-time failures.
///
/// Schedule violations are not errors; they are reported inside a
/// `ValidationResult`. Only malformed input ends up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid time format: {0:?} (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("invalid weekday index {0} (expected 0..=6)")]
    InvalidWeekday(u8),

    #[error("unknown comparison operator: {0:?}")]
    UnknownOperator(String),

    #[error("unknown count unit: {0:?}")]
    UnknownUnit(String),
}
