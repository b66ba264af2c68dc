//! Datetime-with-timezone tokens used for exclusion and inclusion lists.
//!
//! Accepted forms:
//! - `TZID=America/Toronto:20201115T120000` (zoned local time)
//! - `20201115T120000Z` (UTC)
//! - `20201115T120000` (floating, interpreted in the default timezone)
//! - `20201115` or `TZID=America/Toronto:20201115` (midnight local time)
//!
//! Lists are comma-joined tokens.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;

use crate::timezone::{ConversionError, TimeZoneResolver, localize};

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Error while reading a datetime token.
#[derive(Debug, thiserror::Error)]
pub enum DateTokenError {
    #[error("Malformed datetime token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// ## Summary
/// Parses one datetime token into a zoned datetime.
///
/// ## Errors
///
/// Returns an error if the token does not match any accepted form, names an
/// unknown timezone, or falls into a DST gap.
pub fn parse_datetime_token(
    token: &str,
    default_tz: Tz,
    resolver: &mut TimeZoneResolver,
) -> Result<DateTime<Tz>, DateTokenError> {
    let token = token.trim();

    let (tz, value) = if let Some(zoned) = token.strip_prefix("TZID=") {
        let (tzid, value) = zoned
            .split_once(':')
            .ok_or_else(|| DateTokenError::Malformed(token.to_string()))?;
        (resolver.resolve(tzid)?, value)
    } else if let Some(utc) = token.strip_suffix('Z') {
        (Tz::UTC, utc)
    } else {
        (default_tz, token)
    };

    let local = parse_local(value).ok_or_else(|| DateTokenError::Malformed(token.to_string()))?;
    Ok(localize(local, tz)?)
}

/// ## Summary
/// Parses a comma-joined list of datetime tokens.
///
/// Blank input yields an empty list.
///
/// ## Errors
///
/// Returns the first token error encountered.
pub fn parse_datetime_list(
    text: &str,
    default_tz: Tz,
    resolver: &mut TimeZoneResolver,
) -> Result<Vec<DateTime<Tz>>, DateTokenError> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| parse_datetime_token(token, default_tz, resolver))
        .collect()
}

fn parse_local(value: &str) -> Option<NaiveDateTime> {
    if value.len() == 8 {
        return NaiveDate::parse_from_str(value, DATE_FORMAT)
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN));
    }
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_zoned_token() {
        let mut resolver = TimeZoneResolver::new();
        let value =
            parse_datetime_token("TZID=America/Toronto:20201115T120000", Tz::UTC, &mut resolver)
                .expect("valid token");

        assert_eq!(value.timezone(), Tz::America__Toronto);
        assert_eq!(
            value.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2020, 11, 15, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_utc_and_floating_tokens() {
        let mut resolver = TimeZoneResolver::new();
        let utc = parse_datetime_token("20201115T120000Z", Tz::America__Toronto, &mut resolver)
            .expect("valid token");
        let floating = parse_datetime_token("20201115T120000", Tz::America__Toronto, &mut resolver)
            .expect("valid token");

        assert_eq!(utc.timezone(), Tz::UTC);
        assert_eq!(floating.timezone(), Tz::America__Toronto);
        assert_ne!(utc, floating);
    }

    #[test]
    fn test_parse_date_only_token() {
        let mut resolver = TimeZoneResolver::new();
        let value = parse_datetime_token("20201115", Tz::Europe__Amsterdam, &mut resolver)
            .expect("valid token");

        assert_eq!(
            value.naive_local(),
            NaiveDate::from_ymd_opt(2020, 11, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        let mut resolver = TimeZoneResolver::new();
        let values = parse_datetime_list(
            "TZID=America/Toronto:20201115T120000, ,20201122T120000Z",
            Tz::UTC,
            &mut resolver,
        )
        .expect("valid list");
        assert_eq!(values.len(), 2);

        assert!(
            parse_datetime_list("", Tz::UTC, &mut resolver)
                .expect("empty list")
                .is_empty()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let mut resolver = TimeZoneResolver::new();
        assert!(matches!(
            parse_datetime_token("TZID=America/Toronto", Tz::UTC, &mut resolver),
            Err(DateTokenError::Malformed(_))
        ));
        assert!(matches!(
            parse_datetime_token("2020-11-15", Tz::UTC, &mut resolver),
            Err(DateTokenError::Malformed(_))
        ));
        assert!(matches!(
            parse_datetime_token("TZID=Nowhere/Special:20201115T120000", Tz::UTC, &mut resolver),
            Err(DateTokenError::Conversion(_))
        ));
    }
}
