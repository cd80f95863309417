/*
Readiness gate for the goal creation flow.
Decides whether enough is filled in (dates, schedule, verification) for the
goal to be created.
*/

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logic::weekly_rule_holds;
use crate::models::{CalendarEvent, CountUnit, GoalSpecification, Weekday, WeeklyPattern};
use crate::weeks::{complete_windows, partition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    #[default]
    Schedule,
    Frequency, // "N times a week", no fixed calendar
    Partner,
}

impl GoalCategory {
    fn needs_schedule(self) -> bool {
        matches!(self, GoalCategory::Schedule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Photo,
    Location,
    Time,
    Manual,
    Screentime,
}

/// Everything the creation flow knows about the goal so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessContext {
    pub title: String,
    pub category: GoalCategory,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pattern: WeeklyPattern,
    pub include_dates: BTreeSet<NaiveDate>,
    pub exclude_dates: BTreeSet<NaiveDate>,
    pub external_events: Vec<CalendarEvent>,
    pub verification_methods: BTreeSet<VerificationMethod>,
    pub target_place: Option<String>,
    pub spec: GoalSpecification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Default)]
struct Gate {
    reasons: Vec<String>,
    suggestions: Vec<String>,
}

impl Gate {
    fn fail(&mut self, reason: impl Into<String>, suggestion: impl Into<String>) {
        self.reasons.push(reason.into());
        self.suggestions.push(suggestion.into());
    }
}

// Gates, in order:
// - title and verification methods (every category)
// - valid date range
// - at least one scheduled date
// - weekly frequency reachable in some complete week
// Frequency and partner goals stop after the first gate.
pub fn evaluate_readiness(ctx: &ReadinessContext) -> ReadinessReport {
    let mut gate = Gate::default();

    check_basics(ctx, &mut gate);

    if ctx.category.needs_schedule() {
        check_schedule(ctx, &mut gate);
    }

    let ready = gate.reasons.is_empty();
    debug!(ready, category = ?ctx.category, failed = ?gate.reasons, "readiness evaluated");

    ReadinessReport {
        ready,
        reasons: gate.reasons,
        suggestions: gate.suggestions,
    }
}

fn check_basics(ctx: &ReadinessContext, gate: &mut Gate) {
    if ctx.title.trim().is_empty() {
        gate.fail("Goal title is missing", "Give the goal a title");
    }

    if ctx.verification_methods.is_empty() {
        gate.fail(
            "No verification method selected",
            "Choose at least one way to verify the goal",
        );
    } else if ctx.verification_methods.contains(&VerificationMethod::Location)
        && ctx.target_place.as_deref().is_none_or(|p| p.trim().is_empty())
    {
        gate.fail(
            "Location verification needs a target place",
            "Pick the place where the goal happens",
        );
    }
}

fn check_schedule(ctx: &ReadinessContext, gate: &mut Gate) {
    let (Some(start), Some(end)) = (ctx.start_date, ctx.end_date) else {
        gate.fail("Start or end date is missing", "Set both a start and an end date");
        return;
    };
    if start > end {
        gate.fail(
            format!("End date {end} is before start date {start}"),
            "Move the end date after the start date",
        );
        return;
    }

    let occurrences = scheduled_occurrences(ctx, start, end);
    if occurrences.is_empty() {
        gate.fail(
            "No day in the date range is scheduled",
            "Select weekdays or add specific dates inside the range",
        );
        return;
    }

    let Some(rule) = ctx.spec.count_rule.filter(|r| r.unit == CountUnit::PerWeek) else {
        return;
    };

    // start <= end was checked above
    let Ok(windows) = partition(start, end, ctx.spec.week_boundary) else {
        return;
    };
    let mut complete = complete_windows(&windows).peekable();
    if complete.peek().is_none() {
        return;
    }

    let reachable = complete.any(|w| {
        let count: u32 = occurrences
            .range(w.from..=w.to)
            .map(|(_, n)| *n)
            .sum();
        weekly_rule_holds(&rule, count, &[])
    });
    if !reachable {
        gate.fail(
            format!("No complete week reaches the target ({rule})"),
            "Schedule more days per week or lower the weekly target",
        );
    }
}

// Occurrences per scheduled date inside [start, end].
//
// A date is scheduled when its weekday is selected and it is not excluded,
// when it is explicitly included, or when an external event falls on it.
// Pattern dates count once per proposed time (at least once); every external
// event adds one more. Selected weekdays are walked a week at a time.
fn scheduled_occurrences(
    ctx: &ReadinessContext,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, u32> {
    let mut occurrences: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    let per_day = |day: Weekday| ctx.pattern.times_on(day).count().max(1) as u32;

    let first_day = Weekday::of(start).index() as i64;
    for day in &ctx.pattern.weekdays {
        let offset = (day.index() as i64 - first_day).rem_euclid(7);
        let mut next = start.checked_add_signed(Duration::days(offset));
        while let Some(date) = next.filter(|d| *d <= end) {
            if !ctx.exclude_dates.contains(&date) {
                occurrences.insert(date, per_day(*day));
            }
            next = date.checked_add_signed(Duration::days(7));
        }
    }

    for date in ctx.include_dates.range(start..=end) {
        occurrences.entry(*date).or_insert_with(|| per_day(Weekday::of(*date)));
    }

    for event in &ctx.external_events {
        if start <= event.date && event.date <= end {
            *occurrences.entry(event.date).or_default() += 1;
        }
    }

    occurrences
}
