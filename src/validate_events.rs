/*
Schedule compatibility for a concrete, dated list of events.
A schedule is judged week by week over complete windows only; every offending
week is appended to the detail trail.
*/

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::diagnostics::ValidationDetails;
use crate::error::ScheduleError;
use crate::fixes::{build_fix, suggest_time_settings, suggest_weekday_fix};
use crate::logic::{check_weekdays, effective_ranges, format_ranges, matches, weekly_rule_holds};
use crate::models::{
    format_weekdays, CalendarEvent, CountRule, CountUnit, EventSource, GoalSpecification, LocationMode,
    Time, ValidationOptions, ValidationResult, Weekday, Window,
};
use crate::weeks::{complete_windows, partition, span_days};

pub fn validate_events(
    events: &[CalendarEvent],
    spec: &GoalSpecification,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ValidationResult, ScheduleError> {
    validate_events_with(events, spec, start, end, &ValidationOptions::default())
}

/// Validate dated events over `[start, end]`.
///
/// Ranges shorter than a week are accepted outright. Otherwise each complete
/// window is checked for frequency, allowed weekdays and (for events coming
/// from a repeating pattern) allowed times. With `enforce_partial_weeks` the
/// partial windows are also held to a frequency target scaled to their length.
pub fn validate_events_with(
    events: &[CalendarEvent],
    spec: &GoalSpecification,
    start: NaiveDate,
    end: NaiveDate,
    options: &ValidationOptions,
) -> Result<ValidationResult, ScheduleError> {
    if start > end {
        return Err(ScheduleError::InvalidRange { start, end });
    }

    let span = span_days(start, end);
    if span < 7 {
        debug!(span, "range shorter than a week, skipping checks");
        return Ok(accepted(
            format!(
                "Range covers {span} day(s); frequency targets need at least one full week, so the schedule is accepted as is."
            ),
            spec,
        ));
    }

    let windows = partition(start, end, spec.week_boundary)?;
    let complete = complete_windows(&windows).count() as u32;
    if complete == 0 && !spec.enforce_partial_weeks {
        return Ok(accepted(
            "Range contains no complete week; the schedule is accepted as is.".to_string(),
            spec,
        ));
    }

    let allowed = spec.weekday_restriction();
    let mut details = ValidationDetails::default();
    let mut failing_weeks = 0u32;
    let mut failing_partial = 0u32;
    let mut repeating_days: BTreeSet<Weekday> = BTreeSet::new();
    let mut repeating_times: BTreeMap<Weekday, BTreeSet<Time>> = BTreeMap::new();
    let mut offending_times: Vec<(Weekday, Time)> = Vec::new();

    for window in &windows {
        let (first, last) = window.active_range();
        let in_window: Vec<&CalendarEvent> = events
            .iter()
            .filter(|e| first <= e.date && e.date <= last)
            .collect();

        if window.is_partial {
            if spec.enforce_partial_weeks {
                if let Some(rule) = &spec.count_rule {
                    let scaled = scaled_rule(rule, window);
                    if let Some(entry) = frequency_violation(&scaled, window, &in_window) {
                        details.frequency.record(format!("{entry} (partial week, {} day(s))", window.active_days));
                        failing_partial += 1;
                    }
                }
            }
            continue;
        }

        let mut week_failed = false;

        if let Some(rule) = &spec.count_rule {
            if let Some(entry) = frequency_violation(rule, window, &in_window) {
                details.frequency.record(entry);
                week_failed = true;
            }
        }

        let present: BTreeSet<Weekday> = in_window.iter().map(|e| e.weekday()).collect();
        if let Err(offending) = check_weekdays(&present, allowed) {
            details.weekday.record(format!(
                "Week {window}: events on disallowed weekdays {}",
                format_weekdays(&offending)
            ));
            week_failed = true;
        }

        for event in in_window.iter().filter(|e| e.source == EventSource::Weekly) {
            let day = event.weekday();
            repeating_days.insert(day);
            let Some(time) = event.time else {
                continue;
            };
            repeating_times.entry(day).or_default().insert(time);

            let ranges = effective_ranges(day, spec);
            if !ranges.is_empty() && !matches(time, &ranges, options.point_tolerance) {
                details.time.record(format!(
                    "Week {window}: {} ({day}) at {time} is outside the allowed time ({})",
                    event.date,
                    format_ranges(&ranges)
                ));
                offending_times.push((day, time));
                week_failed = true;
            }
        }

        if week_failed {
            failing_weeks += 1;
        }
    }

    let is_compatible = details.all_passed();

    let weekday_fix = if details.weekday.passed() {
        None
    } else {
        suggest_weekday_fix(&repeating_days, allowed)
    };
    let time_fix = suggest_time_settings(
        &offending_times,
        |d| repeating_times.get(&d).into_iter().flatten().copied().collect(),
        |d| effective_ranges(d, spec),
        options.point_tolerance,
    );

    let partial = windows.len() as u32 - complete;
    let mut summary = if is_compatible {
        format!("Schedule fits the goal across {complete} complete week(s).")
    } else {
        format!("Schedule misses the goal in {failing_weeks} week(s) out of {complete} complete week(s).")
    };
    if partial > 0 && !spec.enforce_partial_weeks {
        summary.push_str(&format!(" {partial} partial week(s) were not evaluated."));
    }
    if failing_partial > 0 {
        summary.push_str(&format!(" {failing_partial} of {partial} partial week(s) fall short of the scaled target."));
    }
    append_notes(&mut summary, spec);

    debug!(
        compatible = is_compatible,
        complete_weeks = complete,
        failing_weeks,
        failing_partial,
        "calendar events validated"
    );

    Ok(ValidationResult {
        is_compatible,
        issues: details.issues(),
        fixes: build_fix(weekday_fix, time_fix),
        summary,
        complete_week_count: Some(complete),
        validation_details: details,
    })
}

fn frequency_violation(rule: &CountRule, window: &Window, events: &[&CalendarEvent]) -> Option<String> {
    let count = events.len() as u32;
    let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for e in events {
        *per_day.entry(e.date).or_default() += 1;
    }
    let per_day: Vec<u32> = per_day.into_values().collect();

    if weekly_rule_holds(rule, count, &per_day) {
        None
    } else {
        Some(format!("Week {window}: {count} occurrence(s), needs {rule}"))
    }
}

// Partial windows: weekly and monthly targets shrink to the active share of
// the week, rounded up. Per-day targets are unchanged.
fn scaled_rule(rule: &CountRule, window: &Window) -> CountRule {
    match rule.unit {
        CountUnit::PerDay => *rule,
        CountUnit::PerWeek | CountUnit::PerMonth => {
            let scaled = (u64::from(rule.count) * u64::from(window.active_days)).div_ceil(7);
            CountRule {
                count: u32::try_from(scaled).unwrap_or(rule.count),
                ..*rule
            }
        }
    }
}

fn accepted(mut summary: String, spec: &GoalSpecification) -> ValidationResult {
    append_notes(&mut summary, spec);
    ValidationResult {
        is_compatible: true,
        issues: Vec::new(),
        fixes: None,
        summary,
        complete_week_count: Some(0),
        validation_details: ValidationDetails::default(),
    }
}

fn append_notes(summary: &mut String, spec: &GoalSpecification) {
    if spec.location_mode == Some(LocationMode::Movement) {
        summary.push_str(" Movement goal: no fixed place is required.");
    }
    if spec.enforce_partial_weeks {
        summary.push_str(" Partial weeks count toward the goal.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonOp, TimeRange, TimeRule, WeekBoundary};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekly_at(date: NaiveDate, time: &str) -> CalendarEvent {
        CalendarEvent { date, time: Some(time.parse().unwrap()), source: EventSource::Weekly }
    }

    fn one_off(date: NaiveDate) -> CalendarEvent {
        CalendarEvent { date, time: None, source: EventSource::OneOff }
    }

    fn at_least(count: u32) -> Option<CountRule> {
        Some(CountRule { operator: ComparisonOp::Ge, count, unit: CountUnit::PerWeek })
    }

    #[test]
    fn inverted_range_is_an_error() {
        let r = validate_events(&[], &GoalSpecification::default(), d(2024, 3, 9), d(2024, 3, 1));
        assert!(matches!(r, Err(ScheduleError::InvalidRange { .. })));
    }

    #[test]
    fn every_failing_week_is_reported() {
        // Mon 2024-03-04 .. Sun 2024-03-24: three complete weeks
        let spec = GoalSpecification { count_rule: at_least(2), ..Default::default() };
        let events = vec![
            one_off(d(2024, 3, 4)),
            one_off(d(2024, 3, 12)),
            one_off(d(2024, 3, 13)),
            one_off(d(2024, 3, 20)),
        ];

        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 24)).unwrap();
        assert!(!r.is_compatible);
        assert_eq!(r.complete_week_count, Some(3));
        let trail = r.validation_details.frequency.trail();
        assert_eq!(trail.len(), 2);
        assert!(trail[0].contains("2024-03-04"));
        assert!(trail[1].contains("2024-03-18"));
        assert!(r.summary.contains("2 week(s) out of 3"));
    }

    #[test]
    fn disallowed_weekday_and_time_are_flagged() {
        use Weekday::*;
        let spec = GoalSpecification {
            weekday_constraints: Some([Monday, Wednesday].into()),
            time_rules: vec![TimeRule {
                days: [Monday, Wednesday, Thursday].into(),
                range: TimeRange::point("07:00".parse().unwrap()),
                source: None,
            }],
            ..Default::default()
        };
        let events = vec![
            weekly_at(d(2024, 3, 4), "07:10"),
            weekly_at(d(2024, 3, 6), "09:00"),
            weekly_at(d(2024, 3, 7), "07:00"),
        ];

        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert!(!r.is_compatible);
        assert!(!r.validation_details.weekday.passed());
        assert_eq!(r.validation_details.time.trail().len(), 1);

        let fix = r.fixes.unwrap();
        assert_eq!(fix.weekly_weekdays, Some(BTreeSet::from([Monday, Wednesday])));
        let times = fix.weekly_time_settings.unwrap();
        assert_eq!(times[&Wednesday], BTreeSet::from(["07:00".parse::<Time>().unwrap()]));
    }

    #[test]
    fn one_off_times_are_not_checked() {
        let spec = GoalSpecification {
            time_windows: vec![crate::models::TimeWindow {
                range: TimeRange::new("06:00".parse().unwrap(), "07:00".parse().unwrap()),
                source: None,
            }],
            ..Default::default()
        };
        let events = vec![CalendarEvent {
            date: d(2024, 3, 5),
            time: Some("22:00".parse().unwrap()),
            source: EventSource::OneOff,
        }];
        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert!(r.is_compatible);
    }

    #[test]
    fn iso_range_without_complete_week_is_accepted() {
        // Wed .. Tue under ISO weeks: 5 + 2 days, no complete window
        let spec = GoalSpecification {
            count_rule: at_least(5),
            week_boundary: WeekBoundary::IsoWeek,
            ..Default::default()
        };
        let r = validate_events(&[], &spec, d(2024, 3, 6), d(2024, 3, 12)).unwrap();
        assert!(r.is_compatible);
        assert_eq!(r.complete_week_count, Some(0));
    }

    #[test]
    fn partial_weeks_use_scaled_target_when_enforced() {
        // Mon 2024-03-04 .. Wed 2024-03-13: one full week + 3 days
        let spec = GoalSpecification {
            count_rule: at_least(7),
            enforce_partial_weeks: true,
            ..Default::default()
        };
        let full: Vec<CalendarEvent> = (4..=10).map(|day| one_off(d(2024, 3, day))).collect();

        let mut events = full.clone();
        events.extend((11..=13).map(|day| one_off(d(2024, 3, day))));
        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 13)).unwrap();
        assert!(r.is_compatible, "{:?}", r.issues);

        let r = validate_events(&full, &spec, d(2024, 3, 4), d(2024, 3, 13)).unwrap();
        assert!(!r.is_compatible);
        assert!(r.issues[0].contains("partial week, 3 day(s)"));
        // the complete week passed; only the tail is short
        assert!(r.summary.contains("0 week(s) out of 1 complete week(s)"), "{}", r.summary);
        assert!(r.summary.contains("1 of 1 partial week(s) fall short"), "{}", r.summary);
    }

    #[test]
    fn huge_weekly_target_on_a_partial_week() {
        let spec = GoalSpecification {
            count_rule: Some(CountRule { operator: ComparisonOp::Le, count: u32::MAX, unit: CountUnit::PerWeek }),
            enforce_partial_weeks: true,
            ..Default::default()
        };
        let events: Vec<CalendarEvent> = (4..=13).map(|day| one_off(d(2024, 3, day))).collect();
        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 13)).unwrap();
        assert!(r.is_compatible, "{:?}", r.issues);

        let window = Window::new(d(2024, 3, 11), d(2024, 3, 4), d(2024, 3, 13));
        let scaled = scaled_rule(spec.count_rule.as_ref().unwrap(), &window);
        assert_eq!(scaled.count, (u64::from(u32::MAX) * 3).div_ceil(7) as u32);
    }

    #[test]
    fn daily_target_counts_each_day_on_its_own() {
        // Mon 2024-03-04 .. Sun 2024-03-10: one complete week
        let spec = GoalSpecification {
            count_rule: Some(CountRule { operator: ComparisonOp::Ge, count: 2, unit: CountUnit::PerDay }),
            ..Default::default()
        };
        let mut events = vec![
            weekly_at(d(2024, 3, 4), "07:00"),
            weekly_at(d(2024, 3, 4), "19:00"),
            weekly_at(d(2024, 3, 6), "07:00"),
            weekly_at(d(2024, 3, 6), "19:00"),
        ];
        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert!(r.is_compatible, "{:?}", r.issues);

        // Friday only has one
        events.push(weekly_at(d(2024, 3, 8), "07:00"));
        let r = validate_events(&events, &spec, d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert!(!r.is_compatible);
        assert_eq!(r.validation_details.frequency.trail().len(), 1);
    }

    #[test]
    fn monthly_target_uses_four_weeks() {
        let spec = GoalSpecification {
            count_rule: Some(CountRule { operator: ComparisonOp::Ge, count: 8, unit: CountUnit::PerMonth }),
            ..Default::default()
        };
        let two = vec![one_off(d(2024, 3, 5)), one_off(d(2024, 3, 7))];
        let r = validate_events(&two, &spec, d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert!(r.is_compatible, "{:?}", r.issues);

        let r = validate_events(&two[..1], &spec, d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert!(!r.is_compatible);
        assert!(r.issues[0].contains("1 occurrence(s)"));
    }

    #[test]
    fn iso_weeks_skip_the_leading_partial_week() {
        // Wed 2024-03-06 .. Sun 2024-03-17: 03-04..03-10 is partial, 03-11..03-17 complete
        let spec = GoalSpecification {
            count_rule: at_least(2),
            week_boundary: WeekBoundary::IsoWeek,
            ..Default::default()
        };
        let lead = [one_off(d(2024, 3, 6)), one_off(d(2024, 3, 7)), one_off(d(2024, 3, 8))];

        let mut events = lead.to_vec();
        events.push(one_off(d(2024, 3, 12)));
        let r = validate_events(&events, &spec, d(2024, 3, 6), d(2024, 3, 17)).unwrap();
        assert!(!r.is_compatible);
        assert_eq!(r.complete_week_count, Some(1));
        let trail = r.validation_details.frequency.trail();
        assert_eq!(trail.len(), 1);
        assert!(trail[0].contains("2024-03-11..2024-03-17"));
        assert!(r.summary.contains("1 partial week(s) were not evaluated"));

        events.push(one_off(d(2024, 3, 15)));
        let r = validate_events(&events, &spec, d(2024, 3, 6), d(2024, 3, 17)).unwrap();
        assert!(r.is_compatible, "{:?}", r.issues);
    }
}
