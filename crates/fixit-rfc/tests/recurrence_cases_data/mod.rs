use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::types::DateWindow;
use fixit_rfc::datetime::{parse_datetime_list, parse_datetime_token};
use fixit_rfc::recurrence::RecurrenceRule;
use fixit_rfc::timezone::TimeZoneResolver;

pub struct RecurrenceCase {
    pub name: &'static str,
    pub rule: &'static str,
    pub start: &'static str,
    pub end: &'static str,
    pub exclusions: &'static str,
    pub inclusions: &'static str,
    /// Inclusive window bounds as datetime tokens.
    pub window: Option<(&'static str, &'static str)>,
    pub expected: &'static [&'static str],
}

pub fn recurrence_cases() -> Vec<RecurrenceCase> {
    vec![
        RecurrenceCase {
            name: "monthly_first_saturday",
            rule: "FREQ=MONTHLY;BYDAY=1SA;INTERVAL=1",
            start: "TZID=America/Toronto:20260103T100000",
            end: "TZID=America/Toronto:20260103T140000",
            exclusions: "",
            inclusions: "",
            window: Some(("20260101T000000Z", "20260501T000000Z")),
            expected: &[
                "2026-01-03T10:00:00-05:00",
                "2026-02-07T10:00:00-05:00",
                "2026-03-07T10:00:00-05:00",
                "2026-04-04T10:00:00-04:00",
            ],
        },
        RecurrenceCase {
            name: "weekly_with_exclusion_token",
            rule: "FREQ=WEEKLY;INTERVAL=1",
            start: "TZID=America/Toronto:20201101T120000",
            end: "TZID=America/Toronto:20201101T150000",
            exclusions: "TZID=America/Toronto:20201115T120000",
            inclusions: "",
            window: Some((
                "TZID=America/Toronto:20201101T000000",
                "TZID=America/Toronto:20201130T000000",
            )),
            expected: &[
                "2020-11-01T12:00:00-05:00",
                "2020-11-08T12:00:00-05:00",
                "2020-11-22T12:00:00-05:00",
                "2020-11-29T12:00:00-05:00",
            ],
        },
        RecurrenceCase {
            name: "daily_exclusion_by_day_inclusion_added",
            rule: "FREQ=DAILY;COUNT=5",
            start: "20260601T090000Z",
            end: "20260601T110000Z",
            exclusions: "20260603T180000Z",
            inclusions: "20260615T090000Z",
            window: None,
            expected: &[
                "2026-06-01T09:00:00+00:00",
                "2026-06-02T09:00:00+00:00",
                "2026-06-04T09:00:00+00:00",
                "2026-06-05T09:00:00+00:00",
                "2026-06-15T09:00:00+00:00",
            ],
        },
        RecurrenceCase {
            name: "hourly_exclusion_by_time",
            rule: "FREQ=HOURLY;INTERVAL=2;COUNT=4",
            start: "20260601T080000Z",
            end: "20260601T090000Z",
            exclusions: "20260601T100000Z",
            inclusions: "",
            window: None,
            expected: &[
                "2026-06-01T08:00:00+00:00",
                "2026-06-01T12:00:00+00:00",
                "2026-06-01T14:00:00+00:00",
            ],
        },
        RecurrenceCase {
            name: "yearly_inside_window",
            rule: "FREQ=YEARLY",
            start: "TZID=Europe/Amsterdam:20200321T130000",
            end: "TZID=Europe/Amsterdam:20200321T170000",
            exclusions: "",
            inclusions: "",
            window: Some((
                "TZID=Europe/Amsterdam:20230101T000000",
                "TZID=Europe/Amsterdam:20251231T000000",
            )),
            expected: &[
                "2023-03-21T13:00:00+01:00",
                "2024-03-21T13:00:00+01:00",
                "2025-03-21T13:00:00+01:00",
            ],
        },
    ]
}

pub fn assert_case(case: &RecurrenceCase) {
    let mut resolver = TimeZoneResolver::new();
    let token = |value: &str, resolver: &mut TimeZoneResolver| {
        parse_datetime_token(value, Tz::UTC, resolver)
            .unwrap_or_else(|err| panic!("Case {}: bad token {value}: {err}", case.name))
    };

    let start = token(case.start, &mut resolver);
    let end = token(case.end, &mut resolver);
    let exclusions = parse_datetime_list(case.exclusions, Tz::UTC, &mut resolver)
        .unwrap_or_else(|err| panic!("Case {}: bad exclusions: {err}", case.name));
    let inclusions = parse_datetime_list(case.inclusions, Tz::UTC, &mut resolver)
        .unwrap_or_else(|err| panic!("Case {}: bad inclusions: {err}", case.name));

    let rule = RecurrenceRule::builder(case.rule)
        .and_then(|builder| {
            builder
                .start(start)
                .end(end)
                .exclusions(exclusions)
                .inclusions(inclusions)
                .build()
        })
        .unwrap_or_else(|err| panic!("Failed to build {}: {}", case.name, err));

    let window = case.window.map(|(from, to)| {
        DateWindow::inclusive(&token(from, &mut resolver), &token(to, &mut resolver))
    });

    let actual: Vec<i64> = rule
        .occurrences(window.as_ref())
        .iter()
        .map(|occurrence| occurrence.start.timestamp())
        .collect();
    let expected: Vec<i64> = case
        .expected
        .iter()
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .unwrap_or_else(|err| panic!("Failed to parse rfc3339 value {value}: {err}"))
                .timestamp()
        })
        .collect();

    assert_eq!(actual, expected, "Case {} did not match", case.name);
}
