/*
Schedule compatibility for a repeating weekly pattern.
Every check runs and records into its own category; nothing short-circuits,
so one pass reports every problem at once.
*/

use std::collections::BTreeSet;

use tracing::debug;

use crate::diagnostics::ValidationDetails;
use crate::fixes::{build_fix, suggest_time_settings, suggest_weekday_fix};
use crate::logic::{check_weekdays, effective_ranges, format_ranges, matches, weekly_rule_holds};
use crate::models::{
    format_weekdays, CountUnit, GoalSpecification, LocationMode, Time, ValidationOptions,
    ValidationResult, Weekday, WeeklyPattern,
};

pub fn validate_pattern(pattern: &WeeklyPattern, spec: &GoalSpecification) -> ValidationResult {
    validate_pattern_with(pattern, spec, &ValidationOptions::default())
}

/// Validate a weekly pattern against a goal specification.
///
/// Process:
/// - weekday subset check against the allow-list
/// - every proposed time against the effective ranges of its day
/// - the frequency target against the pattern's weekly count
/// - fixes only for the dimensions that failed
pub fn validate_pattern_with(
    pattern: &WeeklyPattern,
    spec: &GoalSpecification,
    options: &ValidationOptions,
) -> ValidationResult {
    let mut details = ValidationDetails::default();

    // 1) weekdays
    let allowed = spec.weekday_restriction();
    if let Err(offending) = check_weekdays(&pattern.weekdays, allowed) {
        details.weekday.record(format!(
            "Weekdays not allowed: {} (allowed: {})",
            format_weekdays(&offending),
            format_weekdays(allowed.into_iter().flatten()),
        ));
    }

    // 2) times, per selected day
    let mut offending_times: Vec<(Weekday, Time)> = Vec::new();
    for day in &pattern.weekdays {
        let ranges = effective_ranges(*day, spec);
        if ranges.is_empty() {
            continue;
        }
        for time in pattern.times_on(*day) {
            if !matches(*time, &ranges, options.point_tolerance) {
                details.time.record(format!(
                    "{day} {time} is outside the allowed time ({})",
                    format_ranges(&ranges)
                ));
                offending_times.push((*day, *time));
            }
        }
    }

    // 3) frequency
    let partial_policy_applies =
        spec.enforce_partial_weeks && pattern.weekdays.iter().any(|d| pattern.times_on(*d).next().is_some());
    if let Some(rule) = &spec.count_rule {
        let weekly = pattern.weekly_count();
        let per_day: Vec<u32> = pattern
            .weekdays
            .iter()
            .map(|d| pattern.times_on(*d).count() as u32)
            .collect();

        if !partial_policy_applies && !weekly_rule_holds(rule, weekly, &per_day) {
            let observed = match rule.unit {
                CountUnit::PerDay => format!("per-day counts {per_day:?}"),
                CountUnit::PerWeek => format!("{weekly} per week"),
                CountUnit::PerMonth => {
                    format!("about {} per month", weekly.saturating_mul(crate::logic::WEEKS_PER_MONTH))
                }
            };
            details.frequency.record(format!("Frequency {observed} does not meet {rule}"));
        }
    }

    // 4) compatibility, lenient for fixable or unconstrained cases
    let only_time_issues = details.weekday.passed() && details.frequency.passed();
    let is_compatible = details.all_passed()
        || only_time_issues
        || allowed.is_none()
        || (spec.enforce_partial_weeks && details.frequency.passed());

    // 5) fixes, only for what failed
    let weekday_fix = if details.weekday.passed() {
        None
    } else {
        suggest_weekday_fix(&pattern.weekdays, allowed)
    };
    let time_fix = suggest_time_settings(
        &offending_times,
        |d| pattern.times_on(d).copied().collect(),
        |d| effective_ranges(d, spec),
        options.point_tolerance,
    );
    let fixes = build_fix(weekday_fix, time_fix);

    let issues = details.issues();
    let summary = summarize(is_compatible, &issues, &pattern.weekdays, spec);

    debug!(
        compatible = is_compatible,
        issues = issues.len(),
        has_fix = fixes.is_some(),
        "pattern validated"
    );

    ValidationResult {
        is_compatible,
        issues,
        fixes,
        summary,
        complete_week_count: None,
        validation_details: details,
    }
}

fn summarize(
    is_compatible: bool,
    issues: &[String],
    weekdays: &BTreeSet<Weekday>,
    spec: &GoalSpecification,
) -> String {
    let mut summary = match (is_compatible, issues.len()) {
        (true, 0) => format!("Schedule on {} fits the goal.", describe_days(weekdays)),
        (true, n) => format!("Schedule fits the goal after {n} suggested adjustment(s)."),
        (false, n) => format!("Schedule does not fit the goal: {n} issue(s) found."),
    };

    if spec.location_mode == Some(LocationMode::Movement) {
        summary.push_str(" Movement goal: no fixed place is required.");
    }
    if spec.enforce_partial_weeks {
        summary.push_str(" Partial weeks count toward the goal.");
    }
    summary
}

fn describe_days(weekdays: &BTreeSet<Weekday>) -> String {
    if weekdays.is_empty() {
        "no days".to_string()
    } else {
        format_weekdays(weekdays)
    }
}
