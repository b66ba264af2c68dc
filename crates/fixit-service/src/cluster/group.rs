use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fixit_core::constants::{GEO_LOCATION_PREFIX, TBD_LOCATION_PREFIX, VENUE_LOCATION_PREFIX};
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};

use crate::descriptor::{Descriptor, DescriptorIdentity, EventDescriptor};
use crate::event::{Event, EventKey, status_marker};

/// What a group is anchored to on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupLocation {
    Venue(String),
    Geo(GeoPosition),
    /// Neither venue nor position; holds the key of the only member.
    ToBeDetermined(EventKey),
}

impl fmt::Display for GroupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Venue(id) => write!(f, "{VENUE_LOCATION_PREFIX}-{id}"),
            Self::Geo(geo) => write!(f, "{GEO_LOCATION_PREFIX}-{geo}"),
            Self::ToBeDetermined(key) => write!(f, "{TBD_LOCATION_PREFIX}-{key}"),
        }
    }
}

/// Aggregates over the members, computed once per membership.
#[derive(Debug, Clone, Copy)]
struct GroupFlags {
    complete: bool,
    /// Status shared by every descriptor, if they agree.
    status: Option<EventStatus>,
    /// Class shared by every descriptor, if they agree.
    class: Option<EventClass>,
}

/// ## Summary
/// Events shown together as one map marker.
///
/// Occurrences of the same series count as one descriptor. Aggregate flags
/// are computed on first access and recomputed after the membership changes.
#[derive(Debug, Clone)]
pub struct EventGroup {
    location: GroupLocation,
    name: Option<String>,
    location_text: Option<String>,
    geo: Option<GeoPosition>,
    events: Vec<Event>,
    descriptors: BTreeMap<DescriptorIdentity, Arc<Descriptor>>,
    as_of: DateTime<Utc>,
    default_colour: String,
    flags: OnceCell<GroupFlags>,
}

impl EventGroup {
    fn new(location: GroupLocation, as_of: DateTime<Utc>, default_colour: &str) -> Self {
        Self {
            location,
            name: None,
            location_text: None,
            geo: None,
            events: Vec::new(),
            descriptors: BTreeMap::new(),
            as_of,
            default_colour: default_colour.to_string(),
            flags: OnceCell::new(),
        }
    }

    pub(super) fn for_venue(venue: &Venue, as_of: DateTime<Utc>, default_colour: &str) -> Self {
        Self {
            name: Some(venue.name.clone()),
            location_text: venue.location.clone(),
            geo: venue.geo,
            ..Self::new(GroupLocation::Venue(venue.id.clone()), as_of, default_colour)
        }
    }

    pub(super) fn for_geo(
        geo: GeoPosition,
        location_text: Option<&str>,
        as_of: DateTime<Utc>,
        default_colour: &str,
    ) -> Self {
        Self {
            location_text: location_text.map(str::to_string),
            geo: Some(geo),
            ..Self::new(GroupLocation::Geo(geo), as_of, default_colour)
        }
    }

    pub(super) fn to_be_determined(
        event: &Event,
        as_of: DateTime<Utc>,
        default_colour: &str,
    ) -> Self {
        Self {
            location_text: event.descriptor().location().map(str::to_string),
            ..Self::new(
                GroupLocation::ToBeDetermined(event.key().clone()),
                as_of,
                default_colour,
            )
        }
    }

    /// Adds an event and invalidates the cached aggregates.
    pub fn push(&mut self, event: Event) {
        let descriptor = event.descriptor();
        self.descriptors
            .entry(descriptor.identity())
            .or_insert_with(|| Arc::clone(descriptor));
        self.events.push(event);
        self.flags = OnceCell::new();
    }

    #[must_use]
    pub const fn location(&self) -> &GroupLocation {
        &self.location
    }

    /// Stable marker id derived from the location, e.g. `venue-12`.
    #[must_use]
    pub fn marker_id(&self) -> String {
        self.location.to_string()
    }

    /// Venue name, for venue groups.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn location_text(&self) -> Option<&str> {
        self.location_text.as_deref()
    }

    #[must_use]
    pub const fn geo(&self) -> Option<GeoPosition> {
        self.geo
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.descriptors.values()
    }

    fn flags(&self) -> GroupFlags {
        *self.flags.get_or_init(|| {
            let statuses = self.descriptors.values().map(|descriptor| descriptor.status(None));
            let classes = self.descriptors.values().map(|descriptor| descriptor.class());
            GroupFlags {
                complete: self.events.iter().all(|event| event.is_complete(&self.as_of)),
                status: shared(statuses),
                class: shared(classes),
            }
        })
    }

    /// Every member event has ended.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.flags().complete
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flags().status == Some(EventStatus::Cancelled)
    }

    #[must_use]
    pub fn is_tentative(&self) -> bool {
        self.flags().status == Some(EventStatus::Tentative)
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags().class == Some(EventClass::Private)
    }

    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.flags().class == Some(EventClass::Confidential)
    }

    /// Status shared by every member descriptor, if any.
    #[must_use]
    pub fn shared_status(&self) -> Option<EventStatus> {
        self.flags().status
    }

    /// Class shared by every member descriptor, if any.
    #[must_use]
    pub fn shared_class(&self) -> Option<EventClass> {
        self.flags().class
    }

    /// ## Summary
    /// Marker colour for the group.
    ///
    /// The colour of the only descriptor, or the colour every descriptor
    /// shares; the default colour when they disagree or have none.
    #[must_use]
    pub fn colour(&self) -> &str {
        let mut colours = self.descriptors.values().map(|descriptor| descriptor.colour());
        match colours.next() {
            Some(Some(first)) if colours.all(|colour| colour == Some(first)) => first,
            _ => &self.default_colour,
        }
    }

    /// ## Summary
    /// Short marker text.
    ///
    /// A single event's own label; otherwise the event count, prefixed with a
    /// status marker when every descriptor is cancelled or tentative.
    #[must_use]
    pub fn marker_label(&self) -> String {
        if let [event] = self.events.as_slice() {
            return event.label();
        }

        let count = count_text(self.events.len());
        match self.shared_status().and_then(status_marker) {
            Some(marker) => format!("{marker} {count}"),
            None => count,
        }
    }

    /// Long marker text: a single event's own title, otherwise the label
    /// followed by the place.
    #[must_use]
    pub fn marker_title(&self) -> String {
        if let [event] = self.events.as_slice() {
            return event.title();
        }

        match self.name().or_else(|| self.location_text()) {
            Some(place) => format!("{}, {place}", self.marker_label()),
            None => self.marker_label(),
        }
    }
}

fn shared<T: PartialEq>(mut values: impl Iterator<Item = T>) -> Option<T> {
    let first = values.next()?;
    values.all(|value| value == first).then_some(first)
}

fn count_text(count: usize) -> String {
    if count == 1 {
        "1 event".to_string()
    } else {
        format!("{count} events")
    }
}
