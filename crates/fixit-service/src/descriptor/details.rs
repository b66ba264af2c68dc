//! Fields shared by internal and external descriptors.

use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};
use fixit_rfc::recurrence::RecurrenceRule;

/// Schedule, place and presentation fields of a real descriptor.
#[derive(Debug, Clone, Default)]
pub struct EventDetails {
    pub summary: String,
    pub start: Option<DateTime<Tz>>,
    pub end: Option<DateTime<Tz>>,
    pub status: EventStatus,
    pub class: EventClass,
    pub venue: Option<Venue>,
    pub geo: Option<GeoPosition>,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub fixer_stations: Vec<String>,
    pub colour: Option<String>,
    pub recurrence: Option<RecurrenceRule>,
}

impl EventDetails {
    #[must_use]
    pub fn new(summary: impl Into<String>, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            summary: summary.into(),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: EventClass) -> Self {
        self.class = class;
        self
    }

    #[must_use]
    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self
    }

    #[must_use]
    pub fn with_geo(mut self, geo: GeoPosition) -> Self {
        self.geo = Some(geo);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = String>) -> Self {
        self.categories.extend(categories);
        self
    }

    #[must_use]
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Own geo-position, falling back to the venue's.
    pub(super) fn effective_geo(&self) -> Option<GeoPosition> {
        self.geo
            .or_else(|| self.venue.as_ref().and_then(|venue| venue.geo))
    }
}
