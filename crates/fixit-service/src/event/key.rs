//! Event keys: the global identity of one occurrence.
//!
//! The string form is `provider.descriptor[.token]`. Each component keeps
//! ASCII letters, digits, `-` and `_` as they are and writes every other byte
//! as `~` plus two lowercase hex digits, so the delimiter never appears
//! inside a component and the whole key is URL-safe.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use fixit_rfc::recurrence::{Frequency, RecurrenceDate};

use crate::error::{ServiceError, ServiceResult};

const DELIMITER: char = '.';
const ESCAPE: u8 = b'~';

/// ## Summary
/// Identity of one occurrence across every provider.
///
/// Two keys are equal iff provider id, descriptor id and recurrence date are
/// all equal. The recurrence date is absent for non-recurring descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    provider_id: String,
    descriptor_id: String,
    recurrence_date: Option<RecurrenceDate>,
}

impl EventKey {
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        descriptor_id: impl Into<String>,
        recurrence_date: Option<RecurrenceDate>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            descriptor_id: descriptor_id.into(),
            recurrence_date,
        }
    }

    /// ## Summary
    /// Derives the key of the occurrence starting at `start`.
    ///
    /// `frequency` is the series frequency for recurring descriptors and
    /// `None` otherwise; it decides whether the token carries a time.
    #[must_use]
    pub fn create<Tz: TimeZone>(
        start: &DateTime<Tz>,
        descriptor_id: impl Into<String>,
        provider_id: impl Into<String>,
        frequency: Option<Frequency>,
    ) -> Self {
        Self::new(
            provider_id,
            descriptor_id,
            frequency.map(|frequency| RecurrenceDate::for_instant(start, frequency)),
        )
    }

    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    #[must_use]
    pub fn descriptor_id(&self) -> &str {
        &self.descriptor_id
    }

    #[must_use]
    pub const fn recurrence_date(&self) -> Option<RecurrenceDate> {
        self.recurrence_date
    }

    /// ## Summary
    /// Parses the string form produced by `Display`.
    ///
    /// ## Errors
    ///
    /// Returns `ServiceError::MalformedEventKey` if the string does not have
    /// two or three components, contains a bad escape, or carries an
    /// unreadable recurrence-date token.
    pub fn parse(key: &str) -> ServiceResult<Self> {
        let malformed = |reason: String| ServiceError::MalformedEventKey {
            key: key.to_string(),
            reason,
        };

        let parts: Vec<&str> = key.split(DELIMITER).collect();
        let (provider, descriptor, token) = match parts.as_slice() {
            [provider, descriptor] => (*provider, *descriptor, None),
            [provider, descriptor, token] => (*provider, *descriptor, Some(*token)),
            _ => {
                return Err(malformed(format!(
                    "expected 2 or 3 components, found {}",
                    parts.len()
                )));
            }
        };

        let recurrence_date = token
            .map(|token| {
                unescape(token).and_then(|token| {
                    token
                        .parse::<RecurrenceDate>()
                        .map_err(|err| err.to_string())
                })
            })
            .transpose()
            .map_err(&malformed)?;

        Ok(Self {
            provider_id: unescape(provider).map_err(&malformed)?,
            descriptor_id: unescape(descriptor).map_err(&malformed)?,
            recurrence_date,
        })
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}",
            escape(&self.provider_id),
            escape(&self.descriptor_id)
        )?;
        if let Some(date) = &self.recurrence_date {
            write!(f, "{DELIMITER}{}", escape(&date.to_string()))?;
        }
        Ok(())
    }
}

impl FromStr for EventKey {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

const fn is_literal(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

fn escape(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for &byte in component.as_bytes() {
        if is_literal(byte) {
            escaped.push(char::from(byte));
        } else {
            escaped.push(char::from(ESCAPE));
            escaped.push_str(&hex::encode([byte]));
        }
    }
    escaped
}

fn unescape(component: &str) -> Result<String, String> {
    let bytes = component.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte == ESCAPE {
            let digits = bytes
                .get(index + 1..index + 3)
                .ok_or_else(|| format!("truncated escape at byte {index}"))?;
            let mut value = [0_u8; 1];
            hex::decode_to_slice(digits, &mut value)
                .map_err(|err| format!("bad escape at byte {index}: {err}"))?;
            decoded.push(value[0]);
            index += 3;
        } else if is_literal(byte) {
            decoded.push(byte);
            index += 1;
        } else {
            return Err(format!("unexpected character at byte {index}"));
        }
    }

    String::from_utf8(decoded).map_err(|err| err.to_string())
}
