//! Placeholder reconciliation for registration references.
//!
//! Registrations (repaired items, volunteer sign-ups, supplemental visitor
//! records) refer to events by key string. Keys that do not resolve to a
//! known event get a placeholder event so no registration is orphaned.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use fixit_core::types::DateWindow;
use serde::{Deserialize, Serialize};

use crate::catalog::EventCatalog;
use crate::descriptor::{Descriptor, EventDescriptor, PlaceholderDescriptor};
use crate::event::{Event, EventKey, occurrence_start};

/// Kind of registration record referencing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Item,
    Volunteer,
    Visitor,
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Item => "item",
            Self::Volunteer => "volunteer",
            Self::Visitor => "visitor",
        })
    }
}

/// A collection of registration records of one kind.
pub trait RegistrationSource {
    fn kind(&self) -> RegistrationKind;

    /// Key strings referenced by records dated between `min_date` and
    /// `max_date`, both inclusive. The same key may appear more than once.
    fn event_key_strings_in_date_range(&self, min_date: NaiveDate, max_date: NaiveDate)
    -> Vec<String>;
}

/// Registration source backed by a list of (date, key) entries.
#[derive(Debug, Clone)]
pub struct RegistrationLedger {
    kind: RegistrationKind,
    entries: Vec<(NaiveDate, String)>,
}

impl RegistrationLedger {
    #[must_use]
    pub const fn new(kind: RegistrationKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, date: NaiveDate, event_key: impl Into<String>) {
        self.entries.push((date, event_key.into()));
    }

    #[must_use]
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = (NaiveDate, String)>) -> Self {
        self.entries.extend(entries);
        self
    }
}

impl RegistrationSource for RegistrationLedger {
    fn kind(&self) -> RegistrationKind {
        self.kind
    }

    fn event_key_strings_in_date_range(
        &self,
        min_date: NaiveDate,
        max_date: NaiveDate,
    ) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(date, _)| (min_date..=max_date).contains(date))
            .map(|(_, key)| key.clone())
            .collect()
    }
}

/// ## Summary
/// Appends a placeholder event for every referenced key not among `known`.
///
/// Each missing key yields exactly one placeholder. When the key's
/// descriptor exists the placeholder is bound to it; otherwise a
/// [`PlaceholderDescriptor`] carrying the key's identity is synthesized.
/// Malformed keys are logged and skipped. Placeholders whose start cannot be
/// recovered from the key or descriptor start at the beginning of `window`.
///
/// Returns the number of placeholders added.
pub fn add_placeholder_events<I, S>(
    catalog: &EventCatalog<'_>,
    known: &mut Vec<Event>,
    referenced: I,
    window: &DateWindow,
) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<EventKey> = known.iter().map(|event| event.key().clone()).collect();
    let before = known.len();

    for reference in referenced {
        let reference = reference.as_ref();
        let key = match EventKey::parse(reference) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(
                    key = reference,
                    error = %err,
                    "Registration references malformed key"
                );
                continue;
            }
        };
        if !seen.insert(key.clone()) {
            continue;
        }

        let descriptor = catalog
            .descriptor(key.provider_id(), key.descriptor_id())
            .unwrap_or_else(|| {
                tracing::debug!(%key, "Synthesizing placeholder descriptor");
                Arc::new(Descriptor::from(PlaceholderDescriptor::from_key(
                    &key,
                    catalog.default_tz(),
                )))
            });
        let start = occurrence_start(
            key.recurrence_date(),
            descriptor.start_time(),
            catalog.default_tz(),
        )
        .unwrap_or_else(|| window.start().with_timezone(&catalog.default_tz()));

        tracing::trace!(%key, %start, "Adding placeholder event");
        known.push(Event::placeholder(descriptor, key, start));
    }

    known.len() - before
}

/// ## Summary
/// Resolves every registration reference in `window` against `known`.
///
/// Key strings are gathered from each source for the window's date range and
/// passed to [`add_placeholder_events`]. The known events are returned with
/// the placeholders appended.
#[must_use]
pub fn reconcile_registrations(
    catalog: &EventCatalog<'_>,
    mut known: Vec<Event>,
    sources: &[&dyn RegistrationSource],
    window: &DateWindow,
) -> Vec<Event> {
    let (min_date, max_date) = window.date_range(&catalog.default_tz());
    let mut referenced = Vec::new();
    for source in sources {
        let keys = source.event_key_strings_in_date_range(min_date, max_date);
        tracing::debug!(kind = %source.kind(), count = keys.len(), "Collected registration keys");
        referenced.extend(keys);
    }

    let added = add_placeholder_events(catalog, &mut known, referenced, window);
    tracing::debug!(added, total = known.len(), "Reconciled registrations");
    known
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryProvider;
    use crate::descriptor::{EventDetails, InternalDescriptor};
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;
    use fixit_core::constants::PLACEHOLDER_SUMMARY;
    use fixit_rfc::recurrence::RecurrenceRule;

    fn amsterdam(month: u32, day: u32, hour: u32) -> DateTime<Tz> {
        Tz::Europe__Amsterdam
            .with_ymd_and_hms(2026, month, day, hour, 0, 0)
            .unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn provider() -> InMemoryProvider {
        let rule = RecurrenceRule::builder("FREQ=WEEKLY;INTERVAL=1")
            .unwrap()
            .start(amsterdam(5, 2, 13))
            .end(amsterdam(5, 2, 16))
            .build()
            .unwrap();
        let mut provider = InMemoryProvider::new("fixit");
        provider
            .insert(InternalDescriptor::new(
                "fixit",
                "1",
                EventDetails::new("Weekly", amsterdam(5, 2, 13), amsterdam(5, 2, 16))
                    .with_recurrence(rule),
            ))
            .unwrap();
        provider
    }

    fn may() -> DateWindow {
        DateWindow::half_open(&amsterdam(5, 1, 0), &amsterdam(5, 15, 0))
    }

    #[test_log::test]
    fn test_only_missing_reference_is_added() {
        let provider = provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&provider);
        let mut events = catalog.events_in_window(&may());
        assert_eq!(events.len(), 2);

        let added = add_placeholder_events(
            &catalog,
            &mut events,
            ["fixit.1.20260502", "fixit.1.20260509", "fixit.1.20260523"],
            &may(),
        );

        assert_eq!(added, 1);
        assert_eq!(events.len(), 3);
        let placeholder = &events[2];
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.key().to_string(), "fixit.1.20260523");
        assert_eq!(placeholder.summary(), "Weekly");
        assert_eq!(*placeholder.start(), amsterdam(5, 23, 13));
    }

    #[test]
    fn test_repeated_references_yield_one_placeholder() {
        let provider = provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&provider);
        let mut events = Vec::new();

        let added = add_placeholder_events(
            &catalog,
            &mut events,
            ["ical.gone.20260505", "ical.gone.20260505", "not a key"],
            &may(),
        );

        assert_eq!(added, 1);
        assert_eq!(events[0].summary(), PLACEHOLDER_SUMMARY);
        assert!(events[0].descriptor().is_placeholder());
        assert_eq!(
            *events[0].start(),
            Tz::UTC.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_placeholder_without_date_starts_at_window() {
        let catalog = EventCatalog::new(Tz::UTC);
        let mut events = Vec::new();

        add_placeholder_events(&catalog, &mut events, ["ical.gone"], &may());

        assert_eq!(*events[0].start(), may().start().with_timezone(&Tz::UTC));
    }

    #[test]
    fn test_reconcile_registrations_reads_every_source() {
        let provider = provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&provider);
        let known = catalog.events_in_window(&may());

        let mut items = RegistrationLedger::new(RegistrationKind::Item);
        items.record(date(5, 2), "fixit.1.20260502");
        items.record(date(6, 20), "fixit.1.20260620");
        let volunteers = RegistrationLedger::new(RegistrationKind::Volunteer)
            .with_entries([(date(5, 9), "fixit.7".to_string())]);
        let visitors = RegistrationLedger::new(RegistrationKind::Visitor)
            .with_entries([(date(5, 14), "fixit.1.20260509".to_string())]);

        let events = reconcile_registrations(
            &catalog,
            known,
            &[&items, &volunteers, &visitors],
            &may(),
        );

        let placeholders: Vec<String> = events
            .iter()
            .filter(|event| event.is_placeholder())
            .map(|event| event.key().to_string())
            .collect();
        assert_eq!(placeholders, vec!["fixit.7"]);
    }

    #[test_log::test]
    fn test_registration_dates_follow_local_window() {
        let rule = RecurrenceRule::builder("FREQ=DAILY;INTERVAL=1")
            .unwrap()
            .start(amsterdam(4, 25, 13))
            .end(amsterdam(4, 25, 16))
            .build()
            .unwrap();
        let mut provider = InMemoryProvider::new("fixit");
        provider
            .insert(InternalDescriptor::new(
                "fixit",
                "d",
                EventDetails::new("Daily", amsterdam(4, 25, 13), amsterdam(4, 25, 16))
                    .with_recurrence(rule),
            ))
            .unwrap();
        let catalog = EventCatalog::new(Tz::Europe__Amsterdam).with_provider(&provider);
        let window = DateWindow::half_open(&amsterdam(5, 1, 0), &amsterdam(5, 3, 0));
        let known = catalog.events_in_window(&window);
        assert_eq!(known.len(), 2);

        let items = RegistrationLedger::new(RegistrationKind::Item).with_entries([
            (date(4, 30), "fixit.d.20260430".to_string()),
            (date(5, 2), "fixit.d.20260502".to_string()),
            (date(5, 3), "fixit.d.20260503".to_string()),
        ]);

        let events = reconcile_registrations(&catalog, known, &[&items], &window);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| !event.is_placeholder()));
    }

    #[test]
    fn test_ledger_range_is_inclusive() {
        let ledger = RegistrationLedger::new(RegistrationKind::Item).with_entries([
            (date(5, 1), "a.1".to_string()),
            (date(5, 15), "a.2".to_string()),
            (date(5, 16), "a.3".to_string()),
        ]);

        assert_eq!(
            ledger.event_key_strings_in_date_range(date(5, 1), date(5, 15)),
            vec!["a.1", "a.2"]
        );
    }
}
