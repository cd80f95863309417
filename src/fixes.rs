/*
Fix suggestions.
Only the dimensions that actually failed get a suggestion; everything that
already passes is left exactly as the caller proposed it.
*/

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use crate::logic::matches;
use crate::models::{Fix, Time, TimeRange, Weekday, WeeklyPattern};

/// Nearest allowed time for `time`.
///
/// Returns `time` unchanged when it already matches (or when there is nothing
/// to match against); otherwise the closest range boundary by minute
/// distance, first range winning ties.
pub fn suggest_time_fix(time: Time, ranges: &[TimeRange], tolerance: Duration) -> Time {
    if ranges.is_empty() || matches(time, ranges, tolerance) {
        return time;
    }

    let mut best = time;
    let mut best_dist = i64::MAX;
    for boundary in ranges.iter().flat_map(|r| [r.start, r.end]) {
        let dist = (boundary.minutes() - time.minutes()).abs();
        if dist < best_dist {
            best = boundary;
            best_dist = dist;
        }
    }
    best
}

// Weekday set with disallowed days removed.
//
// Some only when the result differs from `selected`. The result may be empty
// when none of the selected days is allowed: dropping them is still the fix.
pub fn suggest_weekday_fix(
    selected: &BTreeSet<Weekday>,
    allowed: Option<&BTreeSet<Weekday>>,
) -> Option<BTreeSet<Weekday>> {
    let allowed = allowed.filter(|a| !a.is_empty())?;
    let kept: BTreeSet<Weekday> = selected.intersection(allowed).copied().collect();
    (kept.len() < selected.len()).then_some(kept)
}

/// Corrected time sets for the days that had at least one offending time.
///
/// `offending` is the list of `(weekday, time)` pairs that failed; `times_of`
/// yields the full proposal of a day and `ranges_of` its effective ranges.
/// Times that already match stay put. Each offending time moves to its
/// nearest boundary, or to the closest free allowed minute when that boundary
/// is taken, so a day keeps as many times as it had.
pub fn suggest_time_settings<T, R>(
    offending: &[(Weekday, Time)],
    times_of: T,
    ranges_of: R,
    tolerance: Duration,
) -> Option<BTreeMap<Weekday, BTreeSet<Time>>>
where
    T: Fn(Weekday) -> Vec<Time>,
    R: Fn(Weekday) -> Vec<TimeRange>,
{
    let days: BTreeSet<Weekday> = offending.iter().map(|(d, _)| *d).collect();
    if days.is_empty() {
        return None;
    }

    let settings = days
        .into_iter()
        .map(|day| {
            let ranges = ranges_of(day);
            let (mut fixed, moved): (BTreeSet<Time>, BTreeSet<Time>) = times_of(day)
                .into_iter()
                .partition(|t| ranges.is_empty() || matches(*t, &ranges, tolerance));

            for time in moved {
                let target = suggest_time_fix(time, &ranges, tolerance);
                let slot = if fixed.contains(&target) {
                    nearest_free(target, &ranges, tolerance, &fixed).unwrap_or(target)
                } else {
                    target
                };
                fixed.insert(slot);
            }
            (day, fixed)
        })
        .collect();

    Some(settings)
}

// Closest minute to `target` that matches `ranges` and is not in `taken`.
fn nearest_free(
    target: Time,
    ranges: &[TimeRange],
    tolerance: Duration,
    taken: &BTreeSet<Time>,
) -> Option<Time> {
    let origin = target.minutes();
    (1..=Time::LAST_MINUTE.minutes())
        .flat_map(|step| [origin - step, origin + step])
        .filter(|m| (0..=Time::LAST_MINUTE.minutes()).contains(m))
        .map(Time::clamped)
        .find(|t| !taken.contains(t) && matches(*t, ranges, tolerance))
}

pub fn build_fix(
    weekdays: Option<BTreeSet<Weekday>>,
    time_settings: Option<BTreeMap<Weekday, BTreeSet<Time>>>,
) -> Option<Fix> {
    let fix = Fix {
        weekly_weekdays: weekdays,
        weekly_time_settings: time_settings,
    };
    (!fix.is_empty()).then_some(fix)
}

impl WeeklyPattern {
    /// Copy of this pattern with `fix` applied. Days dropped by the weekday
    /// fix lose their times as well.
    pub fn apply_fix(&self, fix: &Fix) -> WeeklyPattern {
        let mut next = self.clone();

        if let Some(settings) = &fix.weekly_time_settings {
            for (day, times) in settings {
                next.times.insert(*day, times.clone());
            }
        }

        if let Some(days) = &fix.weekly_weekdays {
            next.weekdays = days.clone();
            next.times.retain(|day, _| days.contains(day));
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Time {
        s.parse().unwrap()
    }

    fn tol() -> Duration {
        Duration::minutes(15)
    }

    #[test]
    fn time_inside_range_is_kept() {
        let ranges = [TimeRange::new(t("09:00"), t("11:00"))];
        assert_eq!(suggest_time_fix(t("10:00"), &ranges, tol()), t("10:00"));
        assert_eq!(suggest_time_fix(t("10:00"), &[], tol()), t("10:00"));
    }

    #[test]
    fn time_moves_to_nearest_boundary() {
        let ranges = [
            TimeRange::new(t("09:00"), t("11:00")),
            TimeRange::point(t("18:00")),
        ];
        assert_eq!(suggest_time_fix(t("08:10"), &ranges, tol()), t("09:00"));
        assert_eq!(suggest_time_fix(t("12:00"), &ranges, tol()), t("11:00"));
        assert_eq!(suggest_time_fix(t("16:00"), &ranges, tol()), t("18:00"));
    }

    #[test]
    fn weekday_fix_only_when_something_changes() {
        use Weekday::*;
        let allowed: BTreeSet<_> = [Monday, Wednesday].into();

        assert_eq!(suggest_weekday_fix(&[Monday].into(), Some(&allowed)), None);
        assert_eq!(suggest_weekday_fix(&allowed, Some(&allowed)), None);
        assert_eq!(
            suggest_weekday_fix(&[Monday, Tuesday].into(), Some(&allowed)),
            Some(BTreeSet::from([Monday]))
        );
        assert_eq!(
            suggest_weekday_fix(&[Tuesday].into(), Some(&allowed)),
            Some(BTreeSet::new())
        );
        assert_eq!(suggest_weekday_fix(&[Tuesday].into(), None), None);
    }

    #[test]
    fn time_settings_cover_only_offending_days() {
        use Weekday::*;
        let pattern = WeeklyPattern::new()
            .with_times(Monday, [t("07:00"), t("10:00")])
            .with_times(Wednesday, [t("07:00")]);
        let range = TimeRange::point(t("07:00"));

        let settings = suggest_time_settings(
            &[(Monday, t("10:00"))],
            |d| pattern.times_on(d).copied().collect(),
            |_| vec![range],
            tol(),
        )
        .unwrap();

        assert_eq!(settings.len(), 1);
        assert_eq!(settings[&Monday], BTreeSet::from([t("07:00")]));
        assert!(suggest_time_settings(&[], |_| vec![], |_| vec![], tol()).is_none());
    }

    #[test]
    fn time_settings_keep_the_count_per_day() {
        use Weekday::*;
        let pattern = WeeklyPattern::new().with_times(Monday, [t("09:00"), t("10:00")]);
        let point = TimeRange::point(t("07:00"));

        let settings = suggest_time_settings(
            &[(Monday, t("09:00")), (Monday, t("10:00"))],
            |d| pattern.times_on(d).copied().collect(),
            |_| vec![point],
            tol(),
        )
        .unwrap();
        assert_eq!(settings[&Monday], BTreeSet::from([t("06:59"), t("07:00")]));

        // a time that already fits is never displaced
        let pattern = WeeklyPattern::new().with_times(Monday, [t("09:00"), t("10:00")]);
        let interval = TimeRange::new(t("09:00"), t("09:30"));
        let settings = suggest_time_settings(
            &[(Monday, t("10:00"))],
            |d| pattern.times_on(d).copied().collect(),
            |_| vec![interval],
            tol(),
        )
        .unwrap();
        assert_eq!(settings[&Monday], BTreeSet::from([t("09:00"), t("09:30")]));
    }

    #[test]
    fn apply_fix_returns_new_pattern() {
        use Weekday::*;
        let pattern = WeeklyPattern::new()
            .with_times(Monday, [t("07:00")])
            .with_times(Tuesday, [t("07:00")]);
        let fix = Fix {
            weekly_weekdays: Some([Monday].into()),
            weekly_time_settings: Some([(Monday, BTreeSet::from([t("07:10")]))].into()),
        };

        let fixed = pattern.apply_fix(&fix);
        assert_eq!(fixed.weekdays, BTreeSet::from([Monday]));
        assert_eq!(fixed.times.len(), 1);
        assert_eq!(fixed.times[&Monday], BTreeSet::from([t("07:10")]));
        assert_eq!(pattern.weekdays.len(), 2);
        assert!(build_fix(None, None).is_none());
    }
}
