//! Request-scoped access to descriptors and their events.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::TimeDelta;
use chrono_tz::Tz;
use fixit_core::types::DateWindow;
use fixit_rfc::recurrence::RecurrenceDate;

use crate::descriptor::{
    Descriptor, DescriptorIdentity, DescriptorRecord, EventDescriptor, RecordContext,
};
use crate::error::{ServiceError, ServiceResult};
use crate::event::{Event, EventKey, occurrence_start};

/// Days searched on each side of a date-only recurrence date when looking up
/// a recurring occurrence; covers the shift between local and UTC dates.
const KEY_SEARCH_SLACK_DAYS: i64 = 2;

/// Seconds searched on each side of a date-time recurrence date. Sub-daily
/// series are dense enough that a wider search hits the expansion cap.
const KEY_SEARCH_SLACK_SECONDS: i64 = 1;

/// A source of descriptors for one provider id.
pub trait DescriptorProvider {
    fn provider_id(&self) -> &str;

    /// Looks up one descriptor by id.
    fn descriptor(&self, descriptor_id: &str) -> Option<Arc<Descriptor>>;

    /// Every descriptor of the provider, in a stable order.
    fn descriptors(&self) -> Vec<Arc<Descriptor>>;
}

/// Descriptor provider backed by a map, used for snapshots and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    provider_id: String,
    descriptors: BTreeMap<String, Arc<Descriptor>>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            descriptors: BTreeMap::new(),
        }
    }

    /// ## Summary
    /// Adds a descriptor, replacing any previous one with the same id.
    ///
    /// ## Errors
    ///
    /// Returns `ServiceError::InvalidDescriptor` if the descriptor belongs to
    /// another provider.
    pub fn insert(&mut self, descriptor: impl Into<Descriptor>) -> ServiceResult<()> {
        let descriptor = descriptor.into();
        if descriptor.provider_id() != self.provider_id {
            return Err(ServiceError::InvalidDescriptor {
                id: descriptor.descriptor_id().to_string(),
                reason: format!(
                    "belongs to provider {}, not {}",
                    descriptor.provider_id(),
                    self.provider_id
                ),
            });
        }
        self.descriptors
            .insert(descriptor.descriptor_id().to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// ## Summary
    /// Builds a provider from stored records.
    ///
    /// Records of the internal provider become internal descriptors, all
    /// others external ones. Records that cannot be converted are logged and
    /// skipped.
    #[must_use]
    pub fn from_records(
        provider_id: &str,
        records: &[DescriptorRecord],
        context: &mut RecordContext,
    ) -> Self {
        let internal = provider_id == context.internal_provider_id();
        let mut provider = Self::new(provider_id);

        for record in records {
            let descriptor = if internal {
                context.internal(record).map(Descriptor::from)
            } else {
                context.external(provider_id, record).map(Descriptor::from)
            };
            if let Err(err) = descriptor.and_then(|descriptor| provider.insert(descriptor)) {
                tracing::warn!(
                    provider_id,
                    descriptor_id = %record.id,
                    error = %err,
                    "Skipping descriptor record"
                );
            }
        }

        tracing::debug!(provider_id, count = provider.descriptors.len(), "Loaded descriptors");
        provider
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl DescriptorProvider for InMemoryProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn descriptor(&self, descriptor_id: &str) -> Option<Arc<Descriptor>> {
        self.descriptors.get(descriptor_id).cloned()
    }

    fn descriptors(&self) -> Vec<Arc<Descriptor>> {
        self.descriptors.values().cloned().collect()
    }
}

/// ## Summary
/// Lookup service for one resolution pass.
///
/// Holds the registered providers and memoizes descriptor lookups for the
/// lifetime of the catalog. Build a new catalog per request.
pub struct EventCatalog<'a> {
    providers: Vec<&'a dyn DescriptorProvider>,
    default_tz: Tz,
    descriptors: RefCell<HashMap<DescriptorIdentity, Option<Arc<Descriptor>>>>,
}

impl<'a> EventCatalog<'a> {
    #[must_use]
    pub fn new(default_tz: Tz) -> Self {
        Self {
            providers: Vec::new(),
            default_tz,
            descriptors: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: &'a dyn DescriptorProvider) -> Self {
        self.register(provider);
        self
    }

    pub fn register(&mut self, provider: &'a dyn DescriptorProvider) {
        if self
            .providers
            .iter()
            .any(|known| known.provider_id() == provider.provider_id())
        {
            tracing::warn!(
                provider_id = provider.provider_id(),
                "Provider registered twice, first registration wins"
            );
            return;
        }
        self.providers.push(provider);
    }

    /// Timezone for keys and tokens that carry none.
    #[must_use]
    pub const fn default_tz(&self) -> Tz {
        self.default_tz
    }

    fn provider(&self, provider_id: &str) -> Option<&'a dyn DescriptorProvider> {
        self.providers
            .iter()
            .copied()
            .find(|provider| provider.provider_id() == provider_id)
    }

    /// Looks up a descriptor by provider and descriptor id.
    #[must_use]
    pub fn descriptor(&self, provider_id: &str, descriptor_id: &str) -> Option<Arc<Descriptor>> {
        let identity = DescriptorIdentity::new(provider_id, descriptor_id);
        if let Some(cached) = self.descriptors.borrow().get(&identity) {
            return cached.clone();
        }

        let found = self
            .provider(provider_id)
            .and_then(|provider| provider.descriptor(descriptor_id));
        if found.is_none() {
            tracing::debug!(%identity, "Descriptor not found");
        }
        self.descriptors.borrow_mut().insert(identity, found.clone());
        found
    }

    /// ## Summary
    /// Events of every provider starting inside `window`, ordered by start
    /// and then key.
    #[must_use]
    pub fn events_in_window(&self, window: &DateWindow) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .providers
            .iter()
            .flat_map(|provider| provider.descriptors())
            .flat_map(|descriptor| Event::materialize(&descriptor, Some(window)))
            .collect();
        sort_events(&mut events);

        tracing::debug!(count = events.len(), ?window, "Materialized events in window");
        events
    }

    /// Events of one provider, optionally limited to `window`.
    #[must_use]
    pub fn events_for_provider(
        &self,
        provider_id: &str,
        window: Option<&DateWindow>,
    ) -> Vec<Event> {
        let Some(provider) = self.provider(provider_id) else {
            tracing::debug!(provider_id, "Unknown provider");
            return Vec::new();
        };
        let mut events: Vec<Event> = provider
            .descriptors()
            .iter()
            .flat_map(|descriptor| Event::materialize(descriptor, window))
            .collect();
        sort_events(&mut events);
        events
    }

    /// Events of one descriptor, optionally limited to `window`.
    #[must_use]
    pub fn events_for_descriptor(
        &self,
        provider_id: &str,
        descriptor_id: &str,
        window: Option<&DateWindow>,
    ) -> Vec<Event> {
        self.descriptor(provider_id, descriptor_id)
            .map(|descriptor| Event::materialize(&descriptor, window))
            .unwrap_or_default()
    }

    /// ## Summary
    /// Finds the event a key identifies.
    ///
    /// A non-recurring descriptor is materialized directly and only matches a
    /// key without a recurrence date. A recurring descriptor is expanded
    /// around the key's date and searched for the occurrence with that date.
    #[must_use]
    pub fn event_by_key(&self, key: &EventKey) -> Option<Event> {
        let descriptor = self.descriptor(key.provider_id(), key.descriptor_id())?;

        let Some(rule) = descriptor.recurrence_rule() else {
            let event = Event::materialize(&descriptor, None).into_iter().next()?;
            if event.key() != key {
                tracing::debug!(
                    %key,
                    actual = %event.key(),
                    "Key does not match non-recurring event"
                );
                return None;
            }
            return Some(event);
        };

        let Some(recurrence_date) = key.recurrence_date() else {
            tracing::debug!(%key, "Key of recurring descriptor has no recurrence date");
            return None;
        };
        let start = occurrence_start(Some(recurrence_date), Some(*rule.start()), self.default_tz)?;
        let slack = match recurrence_date {
            RecurrenceDate::Date(_) => TimeDelta::days(KEY_SEARCH_SLACK_DAYS),
            RecurrenceDate::DateTime(_) => TimeDelta::seconds(KEY_SEARCH_SLACK_SECONDS),
        };
        let window = DateWindow::inclusive(&(start - slack), &(start + slack));

        Event::materialize(&descriptor, Some(&window))
            .into_iter()
            .find(|event| event.key() == key)
    }

    /// Like [`event_by_key`](Self::event_by_key), for the key's string form.
    /// A malformed key is logged and not found.
    #[must_use]
    pub fn event_by_key_str(&self, key: &str) -> Option<Event> {
        match EventKey::parse(key) {
            Ok(key) => self.event_by_key(&key),
            Err(err) => {
                tracing::warn!(key, error = %err, "Ignoring malformed event key");
                None
            }
        }
    }
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.start().cmp(b.start()).then_with(|| a.key().cmp(b.key())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EventDetails, ExternalDescriptor, InternalDescriptor};
    use chrono::{DateTime, TimeZone};
    use fixit_rfc::recurrence::RecurrenceRule;

    fn amsterdam(month: u32, day: u32, hour: u32) -> DateTime<Tz> {
        Tz::Europe__Amsterdam
            .with_ymd_and_hms(2026, month, day, hour, 0, 0)
            .unwrap()
    }

    fn internal_provider() -> InMemoryProvider {
        let rule = RecurrenceRule::builder("FREQ=WEEKLY;INTERVAL=2")
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
                EventDetails::new("Biweekly", amsterdam(5, 2, 13), amsterdam(5, 2, 16))
                    .with_recurrence(rule),
            ))
            .unwrap();
        provider
            .insert(InternalDescriptor::new(
                "fixit",
                "2",
                EventDetails::new("One-off", amsterdam(5, 20, 19), amsterdam(5, 20, 22)),
            ))
            .unwrap();
        provider
    }

    fn external_provider() -> InMemoryProvider {
        let mut provider = InMemoryProvider::new("ical");
        provider
            .insert(ExternalDescriptor::new(
                "ical",
                "evening@example.org",
                EventDetails::new("Evening", amsterdam(5, 9, 19), amsterdam(5, 9, 21)),
            ))
            .unwrap();
        provider
    }

    #[test]
    fn test_insert_rejects_foreign_descriptor() {
        let mut provider = InMemoryProvider::new("fixit");
        let foreign = ExternalDescriptor::new(
            "ical",
            "x",
            EventDetails::new("x", amsterdam(5, 1, 0), amsterdam(5, 1, 0)),
        );
        assert!(provider.insert(foreign).is_err());
        assert!(provider.is_empty());
    }

    #[test_log::test]
    fn test_events_in_window_spans_providers_in_order() {
        let internal = internal_provider();
        let external = external_provider();
        let catalog = EventCatalog::new(Tz::UTC)
            .with_provider(&internal)
            .with_provider(&external);
        let window = DateWindow::half_open(&amsterdam(5, 1, 0), &amsterdam(6, 1, 0));

        let keys: Vec<String> = catalog
            .events_in_window(&window)
            .iter()
            .map(|event| event.key().to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "fixit.1.20260502",
                "ical.evening~40example~2eorg",
                "fixit.1.20260516",
                "fixit.2",
                "fixit.1.20260530",
            ]
        );
    }

    #[test]
    fn test_events_for_provider_and_descriptor() {
        let internal = internal_provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&internal);
        let window = DateWindow::half_open(&amsterdam(5, 1, 0), &amsterdam(6, 1, 0));

        assert_eq!(catalog.events_for_provider("fixit", Some(&window)).len(), 4);
        assert!(catalog.events_for_provider("ical", Some(&window)).is_empty());
        assert_eq!(catalog.events_for_descriptor("fixit", "1", Some(&window)).len(), 3);
        assert!(catalog.events_for_descriptor("fixit", "9", None).is_empty());
    }

    #[test]
    fn test_event_by_key_recurring() {
        let internal = internal_provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&internal);

        let event = catalog.event_by_key_str("fixit.1.20260516").unwrap();
        assert_eq!(*event.start(), amsterdam(5, 16, 13));
        assert!(!event.is_placeholder());

        // Off-week for a biweekly series
        assert!(catalog.event_by_key_str("fixit.1.20260509").is_none());
        assert!(catalog.event_by_key_str("fixit.1").is_none());
    }

    #[test]
    fn test_event_by_key_non_recurring_requires_matching_token() {
        let internal = internal_provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&internal);

        assert!(catalog.event_by_key_str("fixit.2").is_some());
        assert!(catalog.event_by_key_str("fixit.2.20260520").is_none());
    }

    #[test_log::test]
    fn test_event_by_key_minutely_weeks_after_start() {
        let start = Tz::UTC.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        let rule = RecurrenceRule::builder("FREQ=MINUTELY;INTERVAL=1")
            .unwrap()
            .start(start)
            .end(start + TimeDelta::minutes(1))
            .build()
            .unwrap();
        let mut provider = InMemoryProvider::new("fixit");
        provider
            .insert(InternalDescriptor::new(
                "fixit",
                "m",
                EventDetails::new("Minutely", start, start + TimeDelta::minutes(1))
                    .with_recurrence(rule),
            ))
            .unwrap();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&provider);
        let window = DateWindow::half_open(
            &Tz::UTC.with_ymd_and_hms(2026, 5, 20, 10, 0, 0).unwrap(),
            &Tz::UTC.with_ymd_and_hms(2026, 5, 20, 10, 5, 0).unwrap(),
        );

        let events = catalog.events_in_window(&window);
        assert_eq!(events.len(), 5);
        for event in &events {
            let found = catalog.event_by_key(event.key()).unwrap();
            assert_eq!(found.start(), event.start());
        }

        let event = catalog.event_by_key_str("fixit.m.20260520T100000").unwrap();
        assert_eq!(
            *event.start(),
            Tz::UTC.with_ymd_and_hms(2026, 5, 20, 10, 0, 0).unwrap()
        );
        assert!(catalog.event_by_key_str("fixit.m.20260520T100030").is_none());
    }

    #[test_log::test]
    fn test_event_by_key_str_malformed_or_unknown() {
        let internal = internal_provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&internal);

        assert!(catalog.event_by_key_str("not a key").is_none());
        assert!(catalog.event_by_key_str("fixit.404").is_none());
        assert!(catalog.event_by_key_str("elsewhere.1").is_none());
    }

    #[test]
    fn test_descriptor_lookup_is_memoized() {
        let internal = internal_provider();
        let catalog = EventCatalog::new(Tz::UTC).with_provider(&internal);

        let first = catalog.descriptor("fixit", "1").unwrap();
        let second = catalog.descriptor("fixit", "1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.descriptors.borrow().len(), 1);
    }
}
