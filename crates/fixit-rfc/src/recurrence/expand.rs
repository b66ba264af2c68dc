//! Expansion of a recurrence rule into dated occurrences.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use fixit_core::types::DateWindow;

use super::{RecurrenceDate, RecurrenceRule};

/// One concrete (start, end) pair produced by expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Occurrence {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Effective bounds for one expansion: the rule's own span narrowed by a window.
struct Bounds {
    lower: DateTime<Utc>,
    upper: Option<DateTime<Utc>>,
    upper_inclusive: bool,
}

impl Bounds {
    fn contains(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&Utc);
        instant >= self.lower
            && self.upper.is_none_or(|upper| {
                if self.upper_inclusive {
                    instant <= upper
                } else {
                    instant < upper
                }
            })
    }
}

impl RecurrenceRule {
    /// ## Summary
    /// Expands the rule into chronologically ordered occurrences.
    ///
    /// Occurrences start no earlier than the rule start and no later than
    /// `until`, and are further clamped to `window` when one is supplied.
    /// Generated occurrences matching an exclusion date (by day for
    /// daily-or-coarser rules, by date-time for sub-daily rules) are dropped;
    /// inclusion dates inside the bounds are then added if not already
    /// present. The rule is not consumed, so repeated calls return the same
    /// sequence.
    ///
    /// An invalid window yields no occurrences.
    #[must_use]
    pub fn occurrences(&self, window: Option<&DateWindow>) -> Vec<Occurrence> {
        let Some(bounds) = self.bounds(window) else {
            return Vec::new();
        };

        let excluded: HashSet<RecurrenceDate> = self
            .exclusions
            .iter()
            .map(|exclusion| {
                self.recurrence_date(&exclusion.with_timezone(&self.start.timezone()))
            })
            .collect();

        let mut present = HashSet::new();
        let mut occurrences: Vec<Occurrence> = self
            .raw_series(&bounds)
            .into_iter()
            .filter(|start| {
                let date = self.recurrence_date(start);
                if excluded.contains(&date) {
                    tracing::trace!(%start, "Occurrence excluded");
                    return false;
                }
                if !present.insert(date) {
                    tracing::debug!(%start, %date, "Dropping occurrence with a taken date");
                    return false;
                }
                true
            })
            .map(|start| self.occurrence_at(start))
            .collect();

        for inclusion in &self.inclusions {
            let start = inclusion.with_timezone(&self.start.timezone());
            if bounds.contains(&start) && present.insert(self.recurrence_date(&start)) {
                occurrences.push(self.occurrence_at(start));
            }
        }

        occurrences.sort();
        if occurrences.len() > self.max_occurrences {
            tracing::debug!(
                rule = %self.text,
                max = self.max_occurrences,
                "Expansion truncated"
            );
            occurrences.truncate(self.max_occurrences);
        }
        occurrences
    }

    fn occurrence_at(&self, start: DateTime<Tz>) -> Occurrence {
        Occurrence {
            start,
            end: start + self.duration,
        }
    }

    fn bounds(&self, window: Option<&DateWindow>) -> Option<Bounds> {
        let mut bounds = Bounds {
            lower: self.start.with_timezone(&Utc),
            upper: self.until.map(|until| until.with_timezone(&Utc)),
            upper_inclusive: true,
        };

        if let Some(window) = window {
            if !window.is_valid() {
                tracing::debug!(?window, "Invalid expansion window");
                return None;
            }
            bounds.lower = bounds.lower.max(window.start());
            let narrower = bounds.upper.is_none_or(|upper| {
                window.end() < upper || (window.end() == upper && !window.is_end_inclusive())
            });
            if narrower {
                bounds.upper = Some(window.end());
                bounds.upper_inclusive = window.is_end_inclusive();
            }
        }

        match bounds.upper {
            Some(upper) if upper < bounds.lower => None,
            _ => Some(bounds),
        }
    }

    /// Raw series from the `rrule` crate, limited to `bounds`.
    fn raw_series(&self, bounds: &Bounds) -> Vec<DateTime<Tz>> {
        let tz = self.start.timezone();
        let slack = TimeDelta::seconds(1);

        // The rrule crate's own after/before filters are widened by a second
        // and the exact bound semantics are applied below.
        let mut series = self
            .series
            .clone()
            .after((bounds.lower - slack).with_timezone(&rrule::Tz::UTC));
        if let Some(upper) = bounds.upper {
            series = series.before((upper + slack).with_timezone(&rrule::Tz::UTC));
        }

        let limit = u16::try_from(self.max_occurrences).unwrap_or(u16::MAX);
        let result = series.all(limit);
        if result.limited {
            tracing::debug!(rule = %self.text, limit, "Raw series hit the occurrence limit");
        }

        result
            .dates
            .into_iter()
            .map(|start| start.with_timezone(&tz))
            .filter(|start| bounds.contains(start))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{Frequency, RecurrenceRuleBuilder, RuleText};
    use chrono::{Datelike, TimeZone};

    fn toronto(month: u32, day: u32, hour: u32) -> DateTime<Tz> {
        Tz::America__Toronto
            .with_ymd_and_hms(2026, month, day, hour, 0, 0)
            .unwrap()
    }

    fn weekly_from_march_7() -> RecurrenceRule {
        RecurrenceRule::builder("FREQ=WEEKLY;INTERVAL=1")
            .unwrap()
            .start(toronto(3, 7, 10))
            .end(toronto(3, 7, 14))
            .build()
            .unwrap()
    }

    #[test_log::test]
    fn test_weekly_window_inclusive_upper_bound() {
        let rule = weekly_from_march_7();
        // 21 days later is exactly the fourth occurrence
        let window = DateWindow::inclusive(&toronto(3, 7, 10), &toronto(3, 28, 10));

        let occurrences = rule.occurrences(Some(&window));
        assert_eq!(occurrences.len(), 4);
        assert_eq!(occurrences[3].start, toronto(3, 28, 10));
    }

    #[test_log::test]
    fn test_weekly_window_exclusive_upper_bound() {
        let rule = weekly_from_march_7();
        let window = DateWindow::half_open(&toronto(3, 7, 10), &toronto(3, 28, 10));

        let occurrences = rule.occurrences(Some(&window));
        assert_eq!(occurrences.len(), 3);
        assert!(occurrences.iter().all(|occ| window.contains(&occ.start)));
    }

    #[test]
    fn test_lower_bound_is_inclusive() {
        let rule = weekly_from_march_7();
        let window = DateWindow::half_open(&toronto(3, 14, 10), &toronto(3, 22, 0));

        let occurrences = rule.occurrences(Some(&window));
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].start, toronto(3, 14, 10));
    }

    #[test]
    fn test_occurrences_keep_duration_across_dst() {
        let rule = weekly_from_march_7();
        let window = DateWindow::half_open(&toronto(3, 7, 0), &toronto(3, 15, 0));

        let occurrences = rule.occurrences(Some(&window));
        // DST starts on March 8th in Toronto; wall-clock time is preserved
        assert_eq!(occurrences[1].start, toronto(3, 14, 10));
        assert_eq!(occurrences[1].end - occurrences[1].start, TimeDelta::hours(4));
    }

    #[test_log::test]
    fn test_same_day_occurrences_of_daily_rule_keep_the_first() {
        let rule = RecurrenceRule::builder("FREQ=DAILY;BYHOUR=10,14")
            .unwrap()
            .start(toronto(4, 1, 10))
            .end(toronto(4, 1, 12))
            .build()
            .unwrap();
        let window = DateWindow::half_open(&toronto(4, 1, 0), &toronto(4, 4, 0));

        let occurrences = rule.occurrences(Some(&window));
        let starts: Vec<_> = occurrences.iter().map(|occ| occ.start).collect();
        assert_eq!(starts, vec![toronto(4, 1, 10), toronto(4, 2, 10), toronto(4, 3, 10)]);
    }

    #[test_log::test]
    fn test_daily_exclusion_and_inclusion() {
        let rule = RecurrenceRule::builder("FREQ=DAILY;COUNT=5")
            .unwrap()
            .start(toronto(4, 1, 18))
            .end(toronto(4, 1, 20))
            // Excluded by date even though the time differs
            .exclusions([toronto(4, 3, 9)])
            .inclusions([toronto(4, 13, 18)])
            .build()
            .unwrap();

        let occurrences = rule.occurrences(None);
        let days: Vec<u32> = occurrences.iter().map(|occ| occ.start.day()).collect();

        assert_eq!(days, vec![1, 2, 4, 5, 13]);
        assert_eq!(occurrences[4].end, toronto(4, 13, 20));
    }

    #[test]
    fn test_hourly_exclusion_matches_date_time() {
        let rule = RecurrenceRule::builder("FREQ=HOURLY;COUNT=4")
            .unwrap()
            .start(toronto(4, 1, 9))
            .exclusions([toronto(4, 1, 10), toronto(4, 2, 11)])
            .build()
            .unwrap();

        let hours: Vec<_> = rule
            .occurrences(None)
            .iter()
            .map(|occ| occ.start)
            .collect();
        assert_eq!(hours, vec![toronto(4, 1, 9), toronto(4, 1, 11), toronto(4, 1, 12)]);
    }

    #[test]
    fn test_inclusion_already_generated_is_not_duplicated() {
        let rule = RecurrenceRule::builder("FREQ=DAILY;COUNT=3")
            .unwrap()
            .start(toronto(4, 1, 18))
            .inclusions([toronto(4, 2, 18)])
            .build()
            .unwrap();

        assert_eq!(rule.occurrences(None).len(), 3);
    }

    #[test]
    fn test_inclusion_outside_window_is_dropped() {
        let rule = RecurrenceRule::builder("FREQ=DAILY;COUNT=3")
            .unwrap()
            .start(toronto(4, 1, 18))
            .inclusions([toronto(5, 1, 18)])
            .build()
            .unwrap();
        let window = DateWindow::inclusive(&toronto(4, 1, 0), &toronto(4, 30, 0));

        assert_eq!(rule.occurrences(Some(&window)).len(), 3);
    }

    #[test]
    fn test_until_bounds_unwindowed_expansion() {
        let rule = RecurrenceRuleBuilder::new(RuleText::new(Frequency::Daily, 2))
            .start(toronto(4, 1, 18))
            .until(toronto(4, 9, 18))
            .build()
            .unwrap();

        let days: Vec<u32> = rule
            .occurrences(None)
            .iter()
            .map(|occ| occ.start.day())
            .collect();
        assert_eq!(days, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_unbounded_rule_is_capped() {
        let rule = RecurrenceRule::builder("FREQ=DAILY")
            .unwrap()
            .start(toronto(4, 1, 18))
            .max_occurrences(25)
            .build()
            .unwrap();

        assert_eq!(rule.occurrences(None).len(), 25);
    }

    #[test]
    fn test_invalid_window_yields_nothing() {
        let rule = weekly_from_march_7();
        let inverted = DateWindow::inclusive(&toronto(4, 1, 0), &toronto(3, 1, 0));
        let before_start = DateWindow::inclusive(&toronto(1, 1, 0), &toronto(2, 1, 0));

        assert!(rule.occurrences(Some(&inverted)).is_empty());
        assert!(rule.occurrences(Some(&before_start)).is_empty());
    }

    #[test]
    fn test_expansion_is_restartable() {
        let rule = weekly_from_march_7();
        let window = DateWindow::half_open(&toronto(3, 1, 0), &toronto(5, 1, 0));

        assert_eq!(rule.occurrences(Some(&window)), rule.occurrences(Some(&window)));
    }

    #[test]
    fn test_monthly_by_month_day() {
        let rule = RecurrenceRule::builder("FREQ=MONTHLY;BYMONTHDAY=1;INTERVAL=1")
            .unwrap()
            .start(toronto(1, 1, 13))
            .build()
            .unwrap();
        let window = DateWindow::half_open(&toronto(1, 1, 0), &toronto(4, 1, 0));

        let months: Vec<u32> = rule
            .occurrences(Some(&window))
            .iter()
            .map(|occ| occ.start.month())
            .collect();
        assert_eq!(months, vec![1, 2, 3]);
    }
}
