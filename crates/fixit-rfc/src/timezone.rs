//! Timezone resolution for datetime tokens.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and alias canonicalization.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use std::collections::HashMap;
use std::str::FromStr;

/// Error during timezone conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Non-existent time during DST gap.
    #[error("Non-existent time (DST gap): {0}")]
    NonExistentTime(String),
}

/// Resolver for timezone identifiers.
///
/// Lives for one resolution pass; successful lookups are cached so repeated
/// TZIDs in exclusion and inclusion lists are normalised once.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    cache: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Vendor prefixes, Windows zone names and IANA aliases are normalised
    /// before lookup.
    ///
    /// ## Errors
    ///
    /// Returns `ConversionError::UnknownTimezone` if the TZID cannot be resolved.
    pub fn resolve(&mut self, tzid: &str) -> Result<Tz, ConversionError> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let normalized = normalize_tzid(tzid);
        let tz = Tz::from_str(&normalized)
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))?;

        tracing::trace!(tzid, resolved = %tz, "Resolved timezone");
        self.cache.insert(tzid.to_string(), tz);

        Ok(tz)
    }
}

/// Normalizes vendor-specific timezone identifiers to IANA names.
fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let windows_parser = WindowsParser::new();
    if let Some(tz) = windows_parser.parse(stripped, None) {
        let iana_parser = IanaParserExtended::new();
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    // Europe/Kiev -> Europe/Kyiv and friends
    let iana_parser = IanaParserExtended::new();
    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}

/// ## Summary
/// Attaches a timezone to a local wall-clock time.
///
/// During a DST fold the earlier instant is chosen.
///
/// ## Errors
///
/// Returns `ConversionError::NonExistentTime` for wall-clock times skipped by a DST gap.
pub fn localize(local_time: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, ConversionError> {
    match tz.from_local_datetime(&local_time) {
        LocalResult::None => Err(ConversionError::NonExistentTime(format!(
            "{local_time} in timezone {tz}"
        ))),
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn naive(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_standard_timezone() {
        let mut resolver = TimeZoneResolver::new();

        let tz = resolver.resolve("America/Toronto").expect("should resolve");
        assert_eq!(tz, Tz::America__Toronto);
    }

    #[test]
    fn test_resolve_unknown_timezone() {
        let mut resolver = TimeZoneResolver::new();
        assert!(matches!(
            resolver.resolve("Mars/Olympus_Mons"),
            Err(ConversionError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn test_normalize_windows_timezone() {
        assert_eq!(normalize_tzid("Eastern Standard Time"), "America/New_York");
    }

    #[test]
    fn test_normalize_mozilla_prefix() {
        assert_eq!(
            normalize_tzid("/mozilla.org/America/New_York"),
            "America/New_York"
        );
    }

    #[test]
    fn test_normalize_iana_alias() {
        assert_eq!(normalize_tzid("Europe/Kiev"), "Europe/Kyiv");
    }

    #[test]
    fn test_timezone_caching() {
        let mut resolver = TimeZoneResolver::new();
        resolver.resolve("America/Toronto").expect("should resolve");
        assert!(resolver.cache.contains_key("America/Toronto"));
    }

    #[test]
    fn test_localize_standard_and_daylight() {
        let winter = localize(naive(2026, 1, 15, 10, 0), Tz::America__Toronto).unwrap();
        let summer = localize(naive(2026, 7, 15, 10, 0), Tz::America__Toronto).unwrap();

        assert_eq!(
            winter.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 1, 15, 15, 0, 0).unwrap()
        );
        assert_eq!(
            summer.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2026, 7, 15, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_localize_dst_gap() {
        // 02:30 does not exist on 2026-03-08 in Toronto
        assert!(matches!(
            localize(naive(2026, 3, 8, 2, 30), Tz::America__Toronto),
            Err(ConversionError::NonExistentTime(_))
        ));
    }
}
