use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GeoMetric;
use crate::error::{CoreError, CoreResult};

/// Lifecycle status of an event (mirrors the calendar `STATUS` property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Tentative => "TENTATIVE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CONFIRMED" => Ok(Self::Confirmed),
            "TENTATIVE" => Ok(Self::Tentative),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(CoreError::ParseError(format!("unknown event status {other}"))),
        }
    }
}

/// Access classification of an event (mirrors the calendar `CLASS` property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventClass {
    #[default]
    Public,
    Private,
    Confidential,
}

impl EventClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Confidential => "CONFIDENTIAL",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EARTH_RADIUS_METRES: f64 = 6_371_008.8;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// ## Summary
    /// Builds a position, rejecting coordinates outside the valid ranges.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::ValidationError` if the latitude is outside
    /// `-90..=90` or the longitude outside `-180..=180`.
    pub fn checked(latitude: f64, longitude: f64) -> CoreResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::ValidationError(format!(
                "geo position out of range: {latitude},{longitude}"
            )));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// ## Summary
    /// Returns whether two positions are the same place within `precision`.
    ///
    /// With [`GeoMetric::PerAxis`] each coordinate delta is compared to
    /// `precision` degrees; with [`GeoMetric::Haversine`] the great-circle
    /// distance is compared to `precision` metres.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, precision: f64, metric: GeoMetric) -> bool {
        match metric {
            GeoMetric::PerAxis => {
                (self.latitude - other.latitude).abs() <= precision
                    && (self.longitude - other.longitude).abs() <= precision
            }
            GeoMetric::Haversine => self.distance_metres(other) <= precision,
        }
    }

    /// Great-circle distance in metres.
    #[must_use]
    pub fn distance_metres(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METRES * a.sqrt().asin()
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for GeoPosition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| CoreError::ParseError(format!("geo position without comma: {s}")))?;
        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|err| CoreError::ParseError(format!("latitude {lat}: {err}")))?;
        let longitude = lng
            .trim()
            .parse::<f64>()
            .map_err(|err| CoreError::ParseError(format!("longitude {lng}: {err}")))?;

        Self::checked(latitude, longitude)
    }
}

/// A named, optionally geolocated place where events happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub geo: Option<GeoPosition>,
}

/// A span of time used to bound expansions and range queries.
///
/// The lower bound is always inclusive; the upper bound is inclusive or
/// exclusive depending on how the window was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    end_inclusive: bool,
}

impl DateWindow {
    /// Window covering `[start, end]`.
    #[must_use]
    pub fn inclusive<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
            end_inclusive: true,
        }
    }

    /// Window covering `[start, end)`.
    #[must_use]
    pub fn half_open<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
            end_inclusive: false,
        }
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub const fn is_end_inclusive(&self) -> bool {
        self.end_inclusive
    }

    /// A window is usable only when its bounds are ordered (and non-empty when half-open).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.end_inclusive {
            self.start <= self.end
        } else {
            self.start < self.end
        }
    }

    #[must_use]
    pub fn contains<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&Utc);
        instant >= self.start && self.below_end(instant)
    }

    /// ## Summary
    /// Calendar days touched by the window in `tz`, both inclusive.
    ///
    /// A half-open window ending exactly at local midnight does not touch
    /// the day that starts there.
    #[must_use]
    pub fn date_range<Tz: TimeZone>(&self, tz: &Tz) -> (NaiveDate, NaiveDate) {
        let first = self.start.with_timezone(tz).date_naive();
        let end = self.end.with_timezone(tz).naive_local();
        let mut last = end.date();
        if !self.end_inclusive && end.time() == NaiveTime::MIN {
            last = last.pred_opt().unwrap_or(last);
        }
        (first, last.max(first))
    }

    fn below_end(&self, instant: DateTime<Utc>) -> bool {
        if self.end_inclusive {
            instant <= self.end
        } else {
            instant < self.end
        }
    }
}
