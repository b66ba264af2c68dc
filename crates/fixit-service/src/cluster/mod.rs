//! Map-marker clustering of events by venue or approximate position.

mod group;
mod marker;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fixit_core::config::{ClusteringConfig, GeoMetric};

use crate::descriptor::EventDescriptor;
use crate::event::Event;

pub use group::{EventGroup, GroupLocation};
pub use marker::MapMarker;

/// ## Summary
/// Partitions events into map-marker groups.
///
/// Events with a venue are grouped by venue id. The remaining events are
/// grouped by position when they have one, merging positions that are equal
/// within the configured precision. Events with neither get a group of their
/// own. The result depends only on the input order and the configuration.
#[derive(Debug, Clone)]
pub struct MapMarkerClusterer {
    precision: f64,
    metric: GeoMetric,
    default_colour: String,
    as_of: DateTime<Utc>,
}

impl MapMarkerClusterer {
    /// `as_of` is the instant against which groups decide whether their
    /// events are complete.
    #[must_use]
    pub fn new(config: &ClusteringConfig, as_of: DateTime<Utc>) -> Self {
        Self {
            precision: config.precision,
            metric: config.metric,
            default_colour: config.default_colour.clone(),
            as_of,
        }
    }

    /// Groups `events`; venue groups come first, in order of first
    /// appearance, followed by position and undetermined groups.
    #[must_use]
    pub fn cluster(&self, events: Vec<Event>) -> Vec<EventGroup> {
        let mut groups: Vec<EventGroup> = Vec::new();
        let mut venue_groups: HashMap<String, usize> = HashMap::new();
        let mut without_venue = Vec::new();

        for event in events {
            let Some(venue) = event.descriptor().venue() else {
                without_venue.push(event);
                continue;
            };
            let index = *venue_groups.entry(venue.id.clone()).or_insert_with(|| {
                groups.push(EventGroup::for_venue(venue, self.as_of, &self.default_colour));
                groups.len() - 1
            });
            groups[index].push(event);
        }
        let venue_count = groups.len();

        let mut geo_groups: Vec<usize> = Vec::new();
        for event in without_venue {
            let descriptor = event.descriptor();
            let Some(geo) = descriptor.geo() else {
                let mut group =
                    EventGroup::to_be_determined(&event, self.as_of, &self.default_colour);
                group.push(event);
                groups.push(group);
                continue;
            };

            let existing = geo_groups.iter().copied().find(|&index| {
                groups[index]
                    .geo()
                    .is_some_and(|other| other.approx_eq(&geo, self.precision, self.metric))
            });
            let index = existing.unwrap_or_else(|| {
                groups.push(EventGroup::for_geo(
                    geo,
                    descriptor.location(),
                    self.as_of,
                    &self.default_colour,
                ));
                geo_groups.push(groups.len() - 1);
                groups.len() - 1
            });
            groups[index].push(event);
        }

        tracing::debug!(
            groups = groups.len(),
            venue_groups = venue_count,
            geo_groups = geo_groups.len(),
            "Clustered events"
        );
        groups
    }
}
