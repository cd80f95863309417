/*
Matching primitives shared by every validator.
Kept free of any orchestration so each rule can be tested on its own.
*/

use std::collections::BTreeSet;

use chrono::Duration;

use crate::models::{ComparisonOp, CountRule, CountUnit, GoalSpecification, Time, TimeRange, Weekday};

// Monthly targets are checked against weekly count * 4, not calendar months
pub const WEEKS_PER_MONTH: u32 = 4;

// Whether `t` falls inside any of `ranges` (union, boundaries inclusive).
//
// Rules:
// - point range (start == end) -> widened by `tolerance` both ways, clamped to 00:00..23:59
// - start < end -> plain inclusive interval
// - start > end -> wraps past midnight
pub fn matches(t: Time, ranges: &[TimeRange], tolerance: Duration) -> bool {
    ranges.iter().any(|r| in_range(t, r, tolerance))
}

fn in_range(t: Time, r: &TimeRange, tolerance: Duration) -> bool {
    if r.is_point() {
        let (lo, hi) = widened(r.start, tolerance);
        return lo <= t && t <= hi;
    }
    if r.start < r.end {
        r.start <= t && t <= r.end
    } else {
        t >= r.start || t <= r.end
    }
}

/// Bounds of a point range once tolerance is applied.
pub fn widened(point: Time, tolerance: Duration) -> (Time, Time) {
    let tol = tolerance.num_minutes().max(0);
    (
        Time::clamped(point.minutes() - tol),
        Time::clamped(point.minutes() + tol),
    )
}

/// Ok when `selected` is a subset of the allow-list (or there is no allow-list).
/// On failure returns the weekdays that are not allowed.
pub fn check_weekdays(
    selected: &BTreeSet<Weekday>,
    allowed: Option<&BTreeSet<Weekday>>,
) -> Result<(), BTreeSet<Weekday>> {
    let Some(allowed) = allowed.filter(|a| !a.is_empty()) else {
        return Ok(());
    };

    let offending: BTreeSet<Weekday> = selected.difference(allowed).copied().collect();
    if offending.is_empty() { Ok(()) } else { Err(offending) }
}

pub fn evaluate(observed: u32, op: ComparisonOp, required: u32) -> bool {
    match op {
        ComparisonOp::Ge => observed >= required,
        ComparisonOp::Eq => observed == required,
        ComparisonOp::Le => observed <= required,
        ComparisonOp::Lt => observed < required,
        ComparisonOp::Gt => observed > required,
    }
}

/// Check a rule against the count observed over one week.
///
/// `per_day_counts` holds one entry per scheduled day and is only consulted
/// for `PerDay`, where every day must satisfy the rule on its own. With no
/// scheduled day the rule is evaluated once against zero.
pub fn weekly_rule_holds(rule: &CountRule, weekly_count: u32, per_day_counts: &[u32]) -> bool {
    match rule.unit {
        CountUnit::PerWeek => evaluate(weekly_count, rule.operator, rule.count),
        CountUnit::PerMonth => {
            evaluate(weekly_count.saturating_mul(WEEKS_PER_MONTH), rule.operator, rule.count)
        }
        CountUnit::PerDay => {
            if per_day_counts.is_empty() {
                evaluate(0, rule.operator, rule.count)
            } else {
                per_day_counts
                    .iter()
                    .all(|c| evaluate(*c, rule.operator, rule.count))
            }
        }
    }
}

// Allowed ranges for one weekday.
//
// Day-specific rules win: global windows are only consulted when no time rule
// names this weekday. An empty result means "no time constraint".
pub fn effective_ranges(weekday: Weekday, spec: &GoalSpecification) -> Vec<TimeRange> {
    let day_specific: Vec<TimeRange> = spec
        .time_rules
        .iter()
        .filter(|rule| rule.days.contains(&weekday))
        .map(|rule| rule.range)
        .collect();

    if !day_specific.is_empty() {
        return day_specific;
    }

    spec.time_windows.iter().map(|w| w.range).collect()
}

pub fn format_ranges(ranges: &[TimeRange]) -> String {
    ranges
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}
