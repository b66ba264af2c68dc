use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};
use fixit_rfc::recurrence::{RecurrenceDate, RecurrenceRule};

use super::{EventDescriptor, EventDetails};

/// ## Summary
/// A descriptor authored in the internal editor.
///
/// Besides its own fields it owns a per-occurrence cancellation set: when the
/// descriptor recurs, an occurrence whose recurrence date is in that set is
/// reported as cancelled whatever the base status is.
#[derive(Debug, Clone)]
pub struct InternalDescriptor {
    provider_id: String,
    id: String,
    details: EventDetails,
    cancelled: Vec<RecurrenceDate>,
}

impl InternalDescriptor {
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        id: impl Into<String>,
        details: EventDetails,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            id: id.into(),
            details,
            cancelled: Vec::new(),
        }
    }

    /// Marks the given occurrences as cancelled.
    #[must_use]
    pub fn with_cancelled(mut self, dates: impl IntoIterator<Item = RecurrenceDate>) -> Self {
        self.cancelled.extend(dates);
        self.cancelled.sort();
        self.cancelled.dedup();
        self
    }

    #[must_use]
    pub fn cancelled_dates(&self) -> &[RecurrenceDate] {
        &self.cancelled
    }

    #[must_use]
    pub const fn details(&self) -> &EventDetails {
        &self.details
    }

    fn is_cancelled_on(&self, for_date: &DateTime<Tz>) -> bool {
        let Some(rule) = self.details.recurrence.as_ref() else {
            return false;
        };
        let date = rule.recurrence_date(&for_date.with_timezone(&rule.start().timezone()));
        self.cancelled.iter().any(|cancelled| cancelled.covers(&date))
    }
}

impl EventDescriptor for InternalDescriptor {
    fn descriptor_id(&self) -> &str {
        &self.id
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn summary(&self) -> &str {
        &self.details.summary
    }

    fn start_time(&self) -> Option<DateTime<Tz>> {
        self.details.start
    }

    fn end_time(&self) -> Option<DateTime<Tz>> {
        self.details.end
    }

    fn recurrence_rule(&self) -> Option<&RecurrenceRule> {
        self.details.recurrence.as_ref()
    }

    fn status(&self, for_date: Option<&DateTime<Tz>>) -> EventStatus {
        match for_date {
            Some(date) if self.is_cancelled_on(date) => EventStatus::Cancelled,
            _ => self.details.status,
        }
    }

    fn class(&self) -> EventClass {
        self.details.class
    }

    fn venue(&self) -> Option<&Venue> {
        self.details.venue.as_ref()
    }

    fn geo(&self) -> Option<GeoPosition> {
        self.details.effective_geo()
    }

    fn location(&self) -> Option<&str> {
        self.details.location.as_deref()
    }

    fn categories(&self) -> &[String] {
        &self.details.categories
    }

    fn fixer_stations(&self) -> &[String] {
        &self.details.fixer_stations
    }

    fn colour(&self) -> Option<&str> {
        self.details.colour.as_deref()
    }
}
