use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};
use fixit_rfc::recurrence::RecurrenceRule;

use super::{EventDescriptor, EventDetails};

/// A read-only descriptor supplied by an outside calendar provider.
///
/// Individual occurrences cannot be cancelled; every occurrence reports the
/// series status.
#[derive(Debug, Clone)]
pub struct ExternalDescriptor {
    provider_id: String,
    id: String,
    details: EventDetails,
}

impl ExternalDescriptor {
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
        }
    }
}

impl EventDescriptor for ExternalDescriptor {
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

    fn status(&self, _for_date: Option<&DateTime<Tz>>) -> EventStatus {
        self.details.status
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
