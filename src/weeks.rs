/*
Week partitioning.
Frequency targets are only meaningful over complete 7-day windows, so every
date-range check starts by slicing the range here.
*/

use chrono::{Datelike, Duration, NaiveDate};
use tracing::trace;

use crate::error::ScheduleError;
use crate::models::{WeekBoundary, Window};

// Split [start, end] into consecutive 7-day windows.
//
// Rules:
// - StartWeekday: first window begins on `start`
// - IsoWeek: first window begins on the Monday on or before `start`
// - windows are emitted while their first day is <= end
// - a window running past either edge is kept, marked partial
pub fn partition(
    start: NaiveDate,
    end: NaiveDate,
    boundary: WeekBoundary,
) -> Result<Vec<Window>, ScheduleError> {
    if start > end {
        return Err(ScheduleError::InvalidRange { start, end });
    }

    let anchor = match boundary {
        WeekBoundary::StartWeekday => start,
        WeekBoundary::IsoWeek => start
            .checked_sub_signed(Duration::days(start.weekday().num_days_from_monday() as i64))
            .unwrap_or(NaiveDate::MIN),
    };

    let mut windows = Vec::new();
    let mut from = anchor;
    while from <= end {
        let window = Window::new(from, start, end);
        trace!(%window, active_days = window.active_days, partial = window.is_partial, "window");
        windows.push(window);
        match from.checked_add_signed(Duration::days(7)) {
            Some(next) => from = next,
            None => break,
        }
    }

    Ok(windows)
}

/// Number of calendar days in `[start, end]`, 0 when inverted.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(0)
}

pub fn complete_windows(windows: &[Window]) -> impl Iterator<Item = &Window> {
    windows.iter().filter(|w| !w.is_partial)
}
