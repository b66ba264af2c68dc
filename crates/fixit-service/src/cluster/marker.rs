use fixit_core::types::{EventClass, EventStatus, GeoPosition};
use serde::{Deserialize, Serialize};

use super::EventGroup;

/// Serialisable view of one group, as handed to the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub id: String,
    pub label: String,
    pub title: String,
    pub colour: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub geo: Option<GeoPosition>,
    pub event_count: usize,
    pub descriptor_count: usize,
    pub event_keys: Vec<String>,
    pub complete: bool,
    pub status: Option<EventStatus>,
    pub class: Option<EventClass>,
}

impl EventGroup {
    #[must_use]
    pub fn to_marker(&self) -> MapMarker {
        MapMarker {
            id: self.marker_id(),
            label: self.marker_label(),
            title: self.marker_title(),
            colour: self.colour().to_string(),
            name: self.name().map(str::to_string),
            location: self.location_text().map(str::to_string),
            geo: self.geo(),
            event_count: self.event_count(),
            descriptor_count: self.descriptor_count(),
            event_keys: self
                .events()
                .iter()
                .map(|event| event.key().to_string())
                .collect(),
            complete: self.is_complete(),
            status: self.shared_status(),
            class: self.shared_class(),
        }
    }
}
