use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::diagnostics::ValidationDetails;
use crate::error::ScheduleError;

// Default symmetric tolerance applied to point ranges ("07:00-07:00")
pub const DEFAULT_POINT_TOLERANCE_MIN: i64 = 15;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Time of day with minute precision, always written as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Time {
    minutes: u16, // 0..=1439
}

impl Time {
    pub const MIDNIGHT: Time = Time { minutes: 0 };
    pub const LAST_MINUTE: Time = Time { minutes: 23 * 60 + 59 };

    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeFormat(format!("{hour}:{minute:02}")));
        }
        Ok(Time { minutes: (hour * 60 + minute) as u16 })
    }

    /// Minutes since midnight, clamped into `[00:00, 23:59]`.
    pub fn clamped(minutes: i64) -> Self {
        let m = minutes.clamp(0, MINUTES_PER_DAY - 1);
        Time { minutes: m as u16 }
    }

    pub fn minutes(&self) -> i64 {
        self.minutes as i64
    }

    pub fn hour(&self) -> u32 {
        self.minutes as u32 / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes as u32 % 60
    }
}

// Accepts "7:05" and "07:05"; minutes must be two digits.
impl FromStr for Time {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTimeFormat(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;

        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
            return Err(invalid());
        }

        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Time::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Time {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Time> for String {
    fn from(t: Time) -> Self {
        t.to_string()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Day of week, indexed 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Result<Self, ScheduleError> {
        Weekday::ALL
            .get(index as usize)
            .copied()
            .ok_or(ScheduleError::InvalidWeekday(index))
    }

    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        Weekday::ALL[weekday.num_days_from_sunday() as usize]
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_chrono(date.weekday())
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }
}

impl TryFrom<u8> for Weekday {
    type Error = ScheduleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Weekday::from_index(value)
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.index()
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

// "Mon, Wed, Fri"
pub fn format_weekdays<'a, I: IntoIterator<Item = &'a Weekday>>(days: I) -> String {
    days.into_iter()
        .map(|d| d.short_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Allowed time range. `start == end` is a point range (matched with tolerance),
/// `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
}

impl TimeRange {
    pub fn new(start: Time, end: Time) -> Self {
        TimeRange { start, end }
    }

    pub fn point(t: Time) -> Self {
        TimeRange { start: t, end: t }
    }

    pub fn is_point(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Time range bound to specific weekdays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRule {
    pub days: BTreeSet<Weekday>,
    pub range: TimeRange,
    #[serde(default)]
    pub source: Option<String>, // phrase the rule was derived from
}

/// Global fallback range, used for days no `TimeRule` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub range: TimeRange,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "GE", alias = ">=")]
    Ge,
    #[serde(rename = "EQ", alias = "==")]
    Eq,
    #[serde(rename = "LE", alias = "<=")]
    Le,
    #[serde(rename = "LT", alias = "<")]
    Lt,
    #[serde(rename = "GT", alias = ">")]
    Gt,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Ge => ">=",
            ComparisonOp::Eq => "==",
            ComparisonOp::Le => "<=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GE" | ">=" => Ok(ComparisonOp::Ge),
            "EQ" | "==" | "=" => Ok(ComparisonOp::Eq),
            "LE" | "<=" => Ok(ComparisonOp::Le),
            "LT" | "<" => Ok(ComparisonOp::Lt),
            "GT" | ">" => Ok(ComparisonOp::Gt),
            _ => Err(ScheduleError::UnknownOperator(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountUnit {
    #[serde(alias = "day")]
    PerDay,
    #[serde(alias = "week")]
    PerWeek,
    #[serde(alias = "month")]
    PerMonth,
}

impl CountUnit {
    pub fn label(self) -> &'static str {
        match self {
            CountUnit::PerDay => "per day",
            CountUnit::PerWeek => "per week",
            CountUnit::PerMonth => "per month",
        }
    }
}

impl FromStr for CountUnit {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_day" | "perday" | "day" => Ok(CountUnit::PerDay),
            "per_week" | "perweek" | "week" => Ok(CountUnit::PerWeek),
            "per_month" | "permonth" | "month" => Ok(CountUnit::PerMonth),
            _ => Err(ScheduleError::UnknownUnit(s.to_string())),
        }
    }
}

/// Frequency target, e.g. "at least 3 times per week".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRule {
    pub operator: ComparisonOp,
    pub count: u32,
    pub unit: CountUnit,
}

impl fmt::Display for CountRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operator.symbol(), self.count, self.unit.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekBoundary {
    /// Windows start on the range's own start date.
    #[default]
    StartWeekday,
    /// Windows start on Monday.
    IsoWeek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMode {
    Fixed,
    Movement, // no fixed place required
}

/// Declarative recurrence contract a schedule must satisfy.
///
/// Produced upstream and passed in verbatim; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalSpecification {
    pub count_rule: Option<CountRule>,
    pub weekday_constraints: Option<BTreeSet<Weekday>>,
    pub time_rules: Vec<TimeRule>,
    pub time_windows: Vec<TimeWindow>,
    pub week_boundary: WeekBoundary,
    pub enforce_partial_weeks: bool,
    pub location_mode: Option<LocationMode>,
}

impl GoalSpecification {
    /// The weekday allow-list, if it actually restricts anything.
    pub fn weekday_restriction(&self) -> Option<&BTreeSet<Weekday>> {
        self.weekday_constraints.as_ref().filter(|days| !days.is_empty())
    }
}

/// Repeating weekly proposal: selected weekdays plus per-day times.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyPattern {
    pub weekdays: BTreeSet<Weekday>,
    pub times: BTreeMap<Weekday, BTreeSet<Time>>,
}

impl WeeklyPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `day` and add `times` to it.
    pub fn with_times<I: IntoIterator<Item = Time>>(mut self, day: Weekday, times: I) -> Self {
        self.weekdays.insert(day);
        self.times.entry(day).or_default().extend(times);
        self
    }

    /// Select `day` without proposing any time.
    pub fn with_day(mut self, day: Weekday) -> Self {
        self.weekdays.insert(day);
        self
    }

    /// Proposed times of a selected day. Times for unselected days are ignored.
    pub fn times_on(&self, day: Weekday) -> impl Iterator<Item = &Time> {
        self.times
            .get(&day)
            .filter(|_| self.weekdays.contains(&day))
            .into_iter()
            .flatten()
    }

    /// Sum of proposed times across selected weekdays.
    pub fn weekly_count(&self) -> u32 {
        self.weekdays.iter().map(|d| self.times_on(*d).count() as u32).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Weekly,
    OneOff,
}

/// Concrete, dated occurrence of a materialized schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<Time>,
    pub source: EventSource,
}

impl CalendarEvent {
    pub fn weekday(&self) -> Weekday {
        Weekday::of(self.date)
    }
}

/// One 7-day slice of a partitioned date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub active_days: u8,
    pub is_partial: bool,
    active_from: NaiveDate,
    active_to: NaiveDate,
}

impl Window {
    pub(crate) fn new(from: NaiveDate, range_start: NaiveDate, range_end: NaiveDate) -> Self {
        let to = from
            .checked_add_signed(Duration::days(6))
            .unwrap_or(NaiveDate::MAX);
        let active_from = from.max(range_start);
        let active_to = to.min(range_end);
        let active_days = ((active_to - active_from).num_days() + 1).clamp(0, 7) as u8;
        Window {
            from,
            to,
            active_days,
            is_partial: active_days < 7,
            active_from,
            active_to,
        }
    }

    /// First and last date of this window that lie inside the partitioned range.
    pub fn active_range(&self) -> (NaiveDate, NaiveDate) {
        (self.active_from, self.active_to)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Minimal corrective change; only dimensions that failed are present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fix {
    pub weekly_weekdays: Option<BTreeSet<Weekday>>,
    pub weekly_time_settings: Option<BTreeMap<Weekday, BTreeSet<Time>>>,
}

impl Fix {
    pub fn is_empty(&self) -> bool {
        self.weekly_weekdays.is_none() && self.weekly_time_settings.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_compatible: bool,
    pub issues: Vec<String>,
    pub fixes: Option<Fix>,
    pub summary: String,
    // Only set by calendar-event validation
    pub complete_week_count: Option<u32>,
    pub validation_details: ValidationDetails,
}

/// Tunables shared by every validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub point_tolerance: Duration,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            point_tolerance: Duration::minutes(DEFAULT_POINT_TOLERANCE_MIN),
        }
    }
}
