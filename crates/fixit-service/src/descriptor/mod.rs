//! Event descriptors: the source records events are materialized from.
//!
//! Every provider's records are represented by one [`Descriptor`] variant and
//! consumed through the [`EventDescriptor`] capability trait.

mod details;
mod external;
mod internal;
mod placeholder;
mod record;

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use fixit_core::types::{EventClass, EventStatus, GeoPosition, Venue};
use fixit_rfc::recurrence::RecurrenceRule;

pub use details::EventDetails;
pub use external::ExternalDescriptor;
pub use internal::InternalDescriptor;
pub use placeholder::PlaceholderDescriptor;
pub use record::{DescriptorRecord, RecordContext};

/// Identity of a descriptor across providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorIdentity {
    pub provider_id: String,
    pub descriptor_id: String,
}

impl DescriptorIdentity {
    #[must_use]
    pub fn new(provider_id: impl Into<String>, descriptor_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            descriptor_id: descriptor_id.into(),
        }
    }
}

impl fmt::Display for DescriptorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.descriptor_id)
    }
}

/// Capabilities every descriptor variant supplies.
pub trait EventDescriptor {
    fn descriptor_id(&self) -> &str;

    fn provider_id(&self) -> &str;

    fn summary(&self) -> &str;

    fn start_time(&self) -> Option<DateTime<Tz>>;

    fn end_time(&self) -> Option<DateTime<Tz>>;

    /// The validated recurrence rule, if the descriptor describes a series.
    fn recurrence_rule(&self) -> Option<&RecurrenceRule>;

    fn is_recurring(&self) -> bool {
        self.recurrence_rule().is_some()
    }

    /// ## Summary
    /// Status of the descriptor, optionally for one occurrence.
    ///
    /// Variants that support per-occurrence cancellation consult `for_date`;
    /// the others return their base status.
    fn status(&self, for_date: Option<&DateTime<Tz>>) -> EventStatus;

    fn class(&self) -> EventClass;

    fn venue(&self) -> Option<&Venue>;

    fn geo(&self) -> Option<GeoPosition>;

    /// Free-text location, used when there is no venue.
    fn location(&self) -> Option<&str>;

    fn categories(&self) -> &[String];

    fn fixer_stations(&self) -> &[String];

    /// Marker colour, e.g. `#1a9d9a`.
    fn colour(&self) -> Option<&str>;

    fn identity(&self) -> DescriptorIdentity {
        DescriptorIdentity::new(self.provider_id(), self.descriptor_id())
    }
}

/// A descriptor from any source.
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// Authored in the internal editor.
    Internal(InternalDescriptor),
    /// Read-only, supplied by an outside calendar provider.
    External(ExternalDescriptor),
    /// Synthesized for a referenced key whose descriptor cannot be found.
    Placeholder(PlaceholderDescriptor),
}

impl Descriptor {
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    fn inner(&self) -> &dyn EventDescriptor {
        match self {
            Self::Internal(descriptor) => descriptor,
            Self::External(descriptor) => descriptor,
            Self::Placeholder(descriptor) => descriptor,
        }
    }
}

impl EventDescriptor for Descriptor {
    fn descriptor_id(&self) -> &str {
        self.inner().descriptor_id()
    }

    fn provider_id(&self) -> &str {
        self.inner().provider_id()
    }

    fn summary(&self) -> &str {
        self.inner().summary()
    }

    fn start_time(&self) -> Option<DateTime<Tz>> {
        self.inner().start_time()
    }

    fn end_time(&self) -> Option<DateTime<Tz>> {
        self.inner().end_time()
    }

    fn recurrence_rule(&self) -> Option<&RecurrenceRule> {
        self.inner().recurrence_rule()
    }

    fn status(&self, for_date: Option<&DateTime<Tz>>) -> EventStatus {
        self.inner().status(for_date)
    }

    fn class(&self) -> EventClass {
        self.inner().class()
    }

    fn venue(&self) -> Option<&Venue> {
        self.inner().venue()
    }

    fn geo(&self) -> Option<GeoPosition> {
        self.inner().geo()
    }

    fn location(&self) -> Option<&str> {
        self.inner().location()
    }

    fn categories(&self) -> &[String] {
        self.inner().categories()
    }

    fn fixer_stations(&self) -> &[String] {
        self.inner().fixer_stations()
    }

    fn colour(&self) -> Option<&str> {
        self.inner().colour()
    }
}

impl From<InternalDescriptor> for Descriptor {
    fn from(descriptor: InternalDescriptor) -> Self {
        Self::Internal(descriptor)
    }
}

impl From<ExternalDescriptor> for Descriptor {
    fn from(descriptor: ExternalDescriptor) -> Self {
        Self::External(descriptor)
    }
}

impl From<PlaceholderDescriptor> for Descriptor {
    fn from(descriptor: PlaceholderDescriptor) -> Self {
        Self::Placeholder(descriptor)
    }
}
