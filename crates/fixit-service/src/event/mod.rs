//! Materialized event occurrences.

mod key;

use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use fixit_core::constants::{CANCELLED_MARKER, TENTATIVE_MARKER};
use fixit_core::types::{DateWindow, EventStatus};
use fixit_rfc::recurrence::{RecurrenceDate, RecurrenceRule};
use fixit_rfc::timezone::localize;

use crate::descriptor::{Descriptor, EventDescriptor};

pub use key::EventKey;

const TITLE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// ## Summary
/// One concrete occurrence of a descriptor.
///
/// The descriptor is shared between all occurrences of a series. The key and
/// effective status are computed on first use and cached for the lifetime of
/// the value; events are rebuilt for every resolution pass.
#[derive(Debug, Clone)]
pub struct Event {
    descriptor: Arc<Descriptor>,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    is_placeholder: bool,
    key: OnceCell<EventKey>,
    status: OnceCell<EventStatus>,
}

impl Event {
    fn new(descriptor: Arc<Descriptor>, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            descriptor,
            start,
            end,
            is_placeholder: false,
            key: OnceCell::new(),
            status: OnceCell::new(),
        }
    }

    /// ## Summary
    /// Materializes the occurrences of a descriptor.
    ///
    /// A non-recurring descriptor yields exactly one event with the
    /// descriptor's own start and end. A recurring descriptor yields one event
    /// per occurrence of its rule. With a window, only events starting inside
    /// it are returned.
    #[must_use]
    pub fn materialize(descriptor: &Arc<Descriptor>, window: Option<&DateWindow>) -> Vec<Self> {
        if let Some(rule) = descriptor.recurrence_rule() {
            let events: Vec<Self> = rule
                .occurrences(window)
                .into_iter()
                .map(|occurrence| {
                    Self::new(Arc::clone(descriptor), occurrence.start, occurrence.end)
                })
                .collect();
            tracing::trace!(
                descriptor = %descriptor.identity(),
                count = events.len(),
                "Expanded recurring descriptor"
            );
            return events;
        }

        let Some(start) = descriptor.start_time() else {
            tracing::warn!(descriptor = %descriptor.identity(), "Descriptor has no start time");
            return Vec::new();
        };
        if window.is_some_and(|window| !window.contains(&start)) {
            return Vec::new();
        }
        let end = descriptor.end_time().unwrap_or(start);
        vec![Self::new(Arc::clone(descriptor), start, end)]
    }

    /// ## Summary
    /// Builds an event for a referenced key whose occurrence could not be
    /// corroborated.
    ///
    /// The event keeps the referenced key as is, so it deduplicates against
    /// the reference that caused it.
    #[must_use]
    pub fn placeholder(descriptor: Arc<Descriptor>, key: EventKey, start: DateTime<Tz>) -> Self {
        let duration = descriptor_duration(&descriptor);
        Self {
            descriptor,
            start,
            end: start + duration,
            is_placeholder: true,
            key: OnceCell::from(key),
            status: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    #[must_use]
    pub const fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    #[must_use]
    pub const fn end(&self) -> &DateTime<Tz> {
        &self.end
    }

    /// Set when the event was synthesized for an unresolved registration reference.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.is_placeholder
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        self.descriptor.summary()
    }

    /// The event's key, derived from the descriptor identity and start.
    #[must_use]
    pub fn key(&self) -> &EventKey {
        self.key.get_or_init(|| {
            EventKey::create(
                &self.start,
                self.descriptor.descriptor_id(),
                self.descriptor.provider_id(),
                self.descriptor.recurrence_rule().map(RecurrenceRule::frequency),
            )
        })
    }

    #[must_use]
    pub fn recurrence_date(&self) -> Option<RecurrenceDate> {
        self.key().recurrence_date()
    }

    /// Effective status: the descriptor's, unless this occurrence is cancelled.
    #[must_use]
    pub fn status(&self) -> EventStatus {
        *self
            .status
            .get_or_init(|| self.descriptor.status(Some(&self.start)))
    }

    /// Whether the event ended before `as_of`.
    #[must_use]
    pub fn is_complete<T: TimeZone>(&self, as_of: &DateTime<T>) -> bool {
        self.end < *as_of
    }

    /// Summary, prefixed with a status marker when cancelled or tentative.
    #[must_use]
    pub fn label(&self) -> String {
        match status_marker(self.status()) {
            Some(marker) => format!("{marker} {}", self.summary()),
            None => self.summary().to_string(),
        }
    }

    /// Label followed by the local start date and time.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{}, {}", self.label(), self.start.format(TITLE_DATE_FORMAT))
    }
}

/// Marker token shown in labels for a status, if any.
pub(crate) const fn status_marker(status: EventStatus) -> Option<&'static str> {
    match status {
        EventStatus::Cancelled => Some(CANCELLED_MARKER),
        EventStatus::Tentative => Some(TENTATIVE_MARKER),
        EventStatus::Confirmed => None,
    }
}

fn descriptor_duration(descriptor: &Descriptor) -> TimeDelta {
    if let Some(rule) = descriptor.recurrence_rule() {
        return rule.duration();
    }
    match (descriptor.start_time(), descriptor.end_time()) {
        (Some(start), Some(end)) if end >= start => end - start,
        _ => TimeDelta::zero(),
    }
}

/// ## Summary
/// Recovers the start of the occurrence a recurrence date refers to.
///
/// A date-only token takes its time of day from `template` (midnight when
/// there is none); a date-time token is used as is. Both are read in the
/// template's timezone, or `default_tz` without a template. Without a token
/// the template itself is returned.
pub(crate) fn occurrence_start(
    recurrence_date: Option<RecurrenceDate>,
    template: Option<DateTime<Tz>>,
    default_tz: Tz,
) -> Option<DateTime<Tz>> {
    let Some(recurrence_date) = recurrence_date else {
        return template;
    };
    let tz = template.map_or(default_tz, |start| start.timezone());
    let local = match recurrence_date {
        RecurrenceDate::Date(date) => {
            let time = template.map_or(NaiveTime::MIN, |start| start.naive_local().time());
            date.and_time(time)
        }
        RecurrenceDate::DateTime(date_time) => date_time,
    };

    let start = localize(local, tz);
    if let Err(err) = &start {
        tracing::debug!(%local, %tz, error = %err, "Cannot place recurrence date");
    }
    start.ok().or(template)
}
