//! Serialisable descriptor records and their conversion into descriptors.

use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::config::EngineConfig;
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};
use fixit_rfc::datetime::{parse_datetime_list, parse_datetime_token};
use fixit_rfc::error::{RfcError, RfcResult};
use fixit_rfc::recurrence::{RecurrenceDate, RecurrenceRule};
use fixit_rfc::timezone::TimeZoneResolver;
use serde::{Deserialize, Serialize};

use super::{EventDetails, ExternalDescriptor, InternalDescriptor};
use crate::error::{ServiceError, ServiceResult};

/// A descriptor as a provider stores it: schedule fields are datetime tokens
/// and the recurrence is a compact rule string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorRecord {
    pub id: String,
    pub summary: String,
    /// Datetime token, e.g. `TZID=Europe/Amsterdam:20260502T130000`.
    pub start: String,
    pub end: Option<String>,
    pub status: EventStatus,
    pub class: EventClass,
    pub venue: Option<Venue>,
    pub geo: Option<GeoPosition>,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub fixer_stations: Vec<String>,
    pub colour: Option<String>,
    /// Rule string, e.g. `FREQ=MONTHLY;BYMONTHDAY=1;INTERVAL=1`.
    pub recurrence_rule: Option<String>,
    pub until: Option<String>,
    /// Comma-joined datetime tokens.
    pub exclusion_dates: Option<String>,
    pub inclusion_dates: Option<String>,
    pub cancelled_dates: Vec<RecurrenceDate>,
}

/// ## Summary
/// Request-scoped state for turning records into descriptors.
///
/// Holds the engine settings the conversion depends on and a timezone
/// resolver shared by every record of one pass.
#[derive(Debug)]
pub struct RecordContext {
    internal_provider_id: String,
    default_tz: Tz,
    max_occurrences: usize,
    resolver: TimeZoneResolver,
}

impl RecordContext {
    #[must_use]
    pub fn new(
        internal_provider_id: impl Into<String>,
        default_tz: Tz,
        max_occurrences: usize,
    ) -> Self {
        Self {
            internal_provider_id: internal_provider_id.into(),
            default_tz,
            max_occurrences,
            resolver: TimeZoneResolver::new(),
        }
    }

    /// ## Summary
    /// Builds a context from the engine configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if the configured default timezone is unknown.
    pub fn from_settings(engine: &EngineConfig) -> ServiceResult<Self> {
        let mut resolver = TimeZoneResolver::new();
        let default_tz = resolver
            .resolve(&engine.default_timezone)
            .map_err(RfcError::from)?;

        Ok(Self {
            internal_provider_id: engine.internal_provider_id.clone(),
            default_tz,
            max_occurrences: engine.max_occurrences,
            resolver,
        })
    }

    #[must_use]
    pub const fn default_tz(&self) -> Tz {
        self.default_tz
    }

    #[must_use]
    pub fn internal_provider_id(&self) -> &str {
        &self.internal_provider_id
    }

    /// ## Summary
    /// Converts a record authored in the internal editor.
    ///
    /// ## Errors
    ///
    /// See [`details`](Self::details).
    pub fn internal(&mut self, record: &DescriptorRecord) -> ServiceResult<InternalDescriptor> {
        let details = self.details(record)?;
        Ok(
            InternalDescriptor::new(self.internal_provider_id.clone(), record.id.clone(), details)
                .with_cancelled(record.cancelled_dates.iter().copied()),
        )
    }

    /// ## Summary
    /// Converts a record supplied by an outside provider.
    ///
    /// Cancelled dates are ignored because external series cannot cancel
    /// single occurrences.
    ///
    /// ## Errors
    ///
    /// See [`details`](Self::details).
    pub fn external(
        &mut self,
        provider_id: &str,
        record: &DescriptorRecord,
    ) -> ServiceResult<ExternalDescriptor> {
        if !record.cancelled_dates.is_empty() {
            tracing::debug!(
                provider_id,
                descriptor_id = %record.id,
                "Ignoring cancelled dates on external descriptor"
            );
        }
        let details = self.details(record)?;
        Ok(ExternalDescriptor::new(provider_id, record.id.clone(), details))
    }

    /// ## Summary
    /// Parses the schedule and copies the presentation fields of a record.
    ///
    /// A malformed recurrence (rule text, until, exclusion or inclusion
    /// dates) is logged and the descriptor is treated as non-recurring.
    ///
    /// ## Errors
    ///
    /// Returns `ServiceError::InvalidDescriptor` if the start or end token is
    /// malformed, the end precedes the start or the position is out of range.
    pub fn details(&mut self, record: &DescriptorRecord) -> ServiceResult<EventDetails> {
        let invalid = |reason: String| ServiceError::InvalidDescriptor {
            id: record.id.clone(),
            reason,
        };

        let start = parse_datetime_token(&record.start, self.default_tz, &mut self.resolver)
            .map_err(|err| invalid(format!("start: {err}")))?;
        let end = match record.end.as_deref() {
            Some(token) => parse_datetime_token(token, self.default_tz, &mut self.resolver)
                .map_err(|err| invalid(format!("end: {err}")))?,
            None => start,
        };
        if end < start {
            return Err(invalid(format!("end {end} precedes start {start}")));
        }
        let geo = record
            .geo
            .map(|geo| GeoPosition::checked(geo.latitude, geo.longitude))
            .transpose()
            .map_err(|err| invalid(format!("geo: {err}")))?;

        let recurrence = match record.recurrence_rule.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                match self.recurrence(record, text, start, end) {
                    Ok(rule) => Some(rule),
                    Err(err) => {
                        tracing::warn!(
                            descriptor_id = %record.id,
                            rule = text,
                            error = %err,
                            "Malformed recurrence, treating descriptor as non-recurring"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(EventDetails {
            summary: record.summary.clone(),
            start: Some(start),
            end: Some(end),
            status: record.status,
            class: record.class,
            venue: record.venue.clone(),
            geo,
            location: record.location.clone(),
            categories: record.categories.clone(),
            fixer_stations: record.fixer_stations.clone(),
            colour: record.colour.clone(),
            recurrence,
        })
    }

    fn recurrence(
        &mut self,
        record: &DescriptorRecord,
        text: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> RfcResult<RecurrenceRule> {
        let mut builder = RecurrenceRule::builder(text)?
            .start(start)
            .end(end)
            .max_occurrences(self.max_occurrences);

        let tz = self.default_tz;
        if let Some(until) = record.until.as_deref() {
            builder = builder.until(parse_datetime_token(until, tz, &mut self.resolver)?);
        }
        if let Some(list) = record.exclusion_dates.as_deref() {
            builder = builder.exclusions(parse_datetime_list(list, tz, &mut self.resolver)?);
        }
        if let Some(list) = record.inclusion_dates.as_deref() {
            builder = builder.inclusions(parse_datetime_list(list, tz, &mut self.resolver)?);
        }

        Ok(builder.build()?)
    }
}
