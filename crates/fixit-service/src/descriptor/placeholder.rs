use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::constants::PLACEHOLDER_SUMMARY;
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};
use fixit_rfc::recurrence::RecurrenceRule;

use super::EventDescriptor;
use crate::event::{EventKey, occurrence_start};

/// ## Summary
/// Stand-in for a descriptor referenced by a registration but not found in
/// any provider.
///
/// Carries the identity from the referencing key and nothing else, so the
/// resulting event can still be rendered and counted.
#[derive(Debug, Clone)]
pub struct PlaceholderDescriptor {
    provider_id: String,
    id: String,
    start: Option<DateTime<Tz>>,
}

impl PlaceholderDescriptor {
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        id: impl Into<String>,
        start: Option<DateTime<Tz>>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            id: id.into(),
            start,
        }
    }

    /// Placeholder for the descriptor named by `key`, starting on the key's
    /// recurrence date when it has one.
    #[must_use]
    pub fn from_key(key: &EventKey, default_tz: Tz) -> Self {
        Self::new(
            key.provider_id(),
            key.descriptor_id(),
            occurrence_start(key.recurrence_date(), None, default_tz),
        )
    }
}

impl EventDescriptor for PlaceholderDescriptor {
    fn descriptor_id(&self) -> &str {
        &self.id
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn summary(&self) -> &str {
        PLACEHOLDER_SUMMARY
    }

    fn start_time(&self) -> Option<DateTime<Tz>> {
        self.start
    }

    fn end_time(&self) -> Option<DateTime<Tz>> {
        self.start
    }

    fn recurrence_rule(&self) -> Option<&RecurrenceRule> {
        None
    }

    fn status(&self, _for_date: Option<&DateTime<Tz>>) -> EventStatus {
        EventStatus::Confirmed
    }

    fn class(&self) -> EventClass {
        EventClass::Public
    }

    fn venue(&self) -> Option<&Venue> {
        None
    }

    fn geo(&self) -> Option<GeoPosition> {
        None
    }

    fn location(&self) -> Option<&str> {
        None
    }

    fn categories(&self) -> &[String] {
        &[]
    }

    fn fixer_stations(&self) -> &[String] {
        &[]
    }

    fn colour(&self) -> Option<&str> {
        None
    }
}
