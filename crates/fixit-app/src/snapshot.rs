//! JSON snapshots of descriptor providers and registrations.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use fixit_core::config::Settings;
use fixit_core::types::DateWindow;
use fixit_service::catalog::{EventCatalog, InMemoryProvider};
use fixit_service::cluster::{MapMarker, MapMarkerClusterer};
use fixit_service::descriptor::{DescriptorRecord, RecordContext};
use fixit_service::reconcile::{
    RegistrationKind, RegistrationLedger, RegistrationSource, reconcile_registrations,
};
use serde::Deserialize;

/// Everything one resolution pass reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub window: SnapshotWindow,
    /// Instant used to decide completeness; defaults to now.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub providers: Vec<ProviderSnapshot>,
    #[serde(default)]
    pub registrations: RegistrationSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub end_inclusive: bool,
}

impl SnapshotWindow {
    #[must_use]
    pub fn to_window(&self) -> DateWindow {
        if self.end_inclusive {
            DateWindow::inclusive(&self.start, &self.end)
        } else {
            DateWindow::half_open(&self.start, &self.end)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSnapshot {
    pub id: String,
    #[serde(default)]
    pub records: Vec<DescriptorRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationSnapshot {
    pub items: Vec<RegistrationEntry>,
    pub volunteers: Vec<RegistrationEntry>,
    pub visitors: Vec<RegistrationEntry>,
}

impl RegistrationSnapshot {
    fn ledger(kind: RegistrationKind, entries: &[RegistrationEntry]) -> RegistrationLedger {
        RegistrationLedger::new(kind).with_entries(
            entries
                .iter()
                .map(|entry| (entry.date, entry.event_key.clone())),
        )
    }

    #[must_use]
    pub fn ledgers(&self) -> [RegistrationLedger; 3] {
        [
            Self::ledger(RegistrationKind::Item, &self.items),
            Self::ledger(RegistrationKind::Volunteer, &self.volunteers),
            Self::ledger(RegistrationKind::Visitor, &self.visitors),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationEntry {
    pub date: NaiveDate,
    pub event_key: String,
}

impl Snapshot {
    /// ## Summary
    /// Reads a snapshot from a JSON file.
    ///
    /// ## Errors
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing snapshot {}", path.display()))
    }

    /// ## Summary
    /// Runs one resolution pass and returns the map markers.
    ///
    /// ## Errors
    /// Returns an error if the window is invalid or the configured default
    /// timezone is unknown.
    pub fn resolve(&self, settings: &Settings) -> anyhow::Result<Vec<MapMarker>> {
        let window = self.window.to_window();
        anyhow::ensure!(window.is_valid(), "snapshot window is empty or inverted");

        let mut context = RecordContext::from_settings(&settings.engine)?;
        let providers: Vec<InMemoryProvider> = self
            .providers
            .iter()
            .map(|provider| {
                InMemoryProvider::from_records(&provider.id, &provider.records, &mut context)
            })
            .collect();

        let mut catalog = EventCatalog::new(context.default_tz());
        for provider in &providers {
            catalog.register(provider);
        }

        let known = catalog.events_in_window(&window);
        let ledgers = self.registrations.ledgers();
        let sources: Vec<&dyn RegistrationSource> = ledgers
            .iter()
            .map(|ledger| ledger as &dyn RegistrationSource)
            .collect();
        let events = reconcile_registrations(&catalog, known, &sources, &window);

        let as_of = self.as_of.unwrap_or_else(Utc::now);
        let groups = MapMarkerClusterer::new(&settings.clustering, as_of).cluster(events);
        tracing::info!(markers = groups.len(), "Resolution pass complete");

        Ok(groups.iter().map(fixit_service::cluster::EventGroup::to_marker).collect())
    }
}
