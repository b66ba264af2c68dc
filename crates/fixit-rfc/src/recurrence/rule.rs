//! Recurrence rule grammar and the immutable rule value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use rrule::{RRule, RRuleSet, Unvalidated};

use super::{Frequency, RecurrenceDate};
use fixit_core::constants::DEFAULT_MAX_OCCURRENCES;

/// Error while parsing or assembling a recurrence rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Malformed rule part: {0}")]
    MalformedPart(String),

    #[error("Rule has no FREQ part")]
    MissingFrequency,

    #[error("Unknown frequency: {0}")]
    UnknownFrequency(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Rule has no start date-time")]
    MissingStart,

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Rule rejected: {0}")]
    Rejected(String),
}

/// The compact textual form of a rule, e.g. `FREQ=MONTHLY;BYMONTHDAY=1;INTERVAL=1`.
///
/// `FREQ` is always written first; every other part keeps its original
/// position and spelling so that the text reads back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleText {
    frequency: Frequency,
    interval: u32,
    parts: Vec<(String, String)>,
}

impl RuleText {
    /// Rule text with just a frequency and interval.
    #[must_use]
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            parts: vec![("INTERVAL".to_string(), interval.to_string())],
        }
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Interval between occurrences, in units of the frequency (default 1).
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }
}

impl FromStr for RuleText {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().strip_prefix("RRULE:").unwrap_or(s.trim());

        let mut frequency = None;
        let mut interval = 1;
        let mut parts = Vec::new();

        for part in text.split(';').filter(|part| !part.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .filter(|(key, value)| !key.is_empty() && !value.is_empty())
                .ok_or_else(|| RuleError::MalformedPart(part.to_string()))?;
            let key = key.to_ascii_uppercase();

            match key.as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    interval = value
                        .parse::<u32>()
                        .ok()
                        .filter(|interval| *interval > 0)
                        .ok_or_else(|| RuleError::InvalidInterval(value.to_string()))?;
                    parts.push((key, value.to_string()));
                }
                _ => parts.push((key, value.to_string())),
            }
        }

        Ok(Self {
            frequency: frequency.ok_or(RuleError::MissingFrequency)?,
            interval,
            parts,
        })
    }
}

impl fmt::Display for RuleText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        for (key, value) in &self.parts {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

/// ## Summary
/// A validated recurrence rule bound to its first occurrence.
///
/// Built once through [`RecurrenceRuleBuilder`]; every field is checked
/// together so a rule is never partially configured. Expansion lives in
/// `expand.rs`.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    pub(super) text: RuleText,
    pub(super) start: DateTime<Tz>,
    pub(super) duration: TimeDelta,
    pub(super) until: Option<DateTime<Tz>>,
    pub(super) exclusions: Vec<DateTime<Tz>>,
    pub(super) inclusions: Vec<DateTime<Tz>>,
    pub(super) max_occurrences: usize,
    pub(super) series: RRuleSet,
}

impl RecurrenceRule {
    /// Starts building a rule from its compact text.
    ///
    /// ## Errors
    /// Returns an error if the text is not a well-formed rule.
    pub fn builder(text: &str) -> Result<RecurrenceRuleBuilder, RuleError> {
        Ok(RecurrenceRuleBuilder::new(text.parse()?))
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.text.frequency
    }

    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.text.interval
    }

    #[must_use]
    pub const fn text(&self) -> &RuleText {
        &self.text
    }

    /// Start of the first occurrence.
    #[must_use]
    pub const fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    /// End of the first occurrence.
    #[must_use]
    pub fn end(&self) -> DateTime<Tz> {
        self.start + self.duration
    }

    #[must_use]
    pub const fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Latest start any occurrence may have.
    #[must_use]
    pub const fn until(&self) -> Option<&DateTime<Tz>> {
        self.until.as_ref()
    }

    #[must_use]
    pub fn exclusions(&self) -> &[DateTime<Tz>] {
        &self.exclusions
    }

    #[must_use]
    pub fn inclusions(&self) -> &[DateTime<Tz>] {
        &self.inclusions
    }

    /// Identity of the occurrence starting at `start` within this series.
    #[must_use]
    pub fn recurrence_date(&self, start: &DateTime<Tz>) -> RecurrenceDate {
        RecurrenceDate::for_instant(start, self.frequency())
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

/// Builder that validates all rule inputs together in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RecurrenceRuleBuilder {
    text: RuleText,
    start: Option<DateTime<Tz>>,
    end: Option<DateTime<Tz>>,
    until: Option<DateTime<Tz>>,
    exclusions: Vec<DateTime<Tz>>,
    inclusions: Vec<DateTime<Tz>>,
    max_occurrences: usize,
}

impl RecurrenceRuleBuilder {
    #[must_use]
    pub fn new(text: RuleText) -> Self {
        Self {
            text,
            start: None,
            end: None,
            until: None,
            exclusions: Vec::new(),
            inclusions: Vec::new(),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }

    /// Start of the first occurrence; required.
    #[must_use]
    pub fn start(mut self, start: DateTime<Tz>) -> Self {
        self.start = Some(start);
        self
    }

    /// End of the first occurrence; every occurrence gets the same duration.
    #[must_use]
    pub fn end(mut self, end: DateTime<Tz>) -> Self {
        self.end = Some(end);
        self
    }

    /// Latest start an occurrence may have.
    #[must_use]
    pub fn until(mut self, until: DateTime<Tz>) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn exclusions(mut self, exclusions: impl IntoIterator<Item = DateTime<Tz>>) -> Self {
        self.exclusions.extend(exclusions);
        self
    }

    #[must_use]
    pub fn inclusions(mut self, inclusions: impl IntoIterator<Item = DateTime<Tz>>) -> Self {
        self.inclusions.extend(inclusions);
        self
    }

    /// Cap on occurrences produced by a single expansion.
    #[must_use]
    pub fn max_occurrences(mut self, max_occurrences: usize) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }

    /// ## Summary
    /// Validates the inputs and produces an immutable rule.
    ///
    /// ## Errors
    ///
    /// Returns an error if the start is missing, the end or until precede the
    /// start, or the `rrule` crate rejects the rule for this start.
    pub fn build(self) -> Result<RecurrenceRule, RuleError> {
        let start = self.start.ok_or(RuleError::MissingStart)?;
        let end = self.end.unwrap_or(start);

        if end < start {
            return Err(RuleError::InvalidBounds(format!(
                "end {end} precedes start {start}"
            )));
        }
        if let Some(until) = self.until.filter(|until| *until < start) {
            return Err(RuleError::InvalidBounds(format!(
                "until {until} precedes start {start}"
            )));
        }

        let series = self
            .text
            .to_string()
            .parse::<RRule<Unvalidated>>()
            .map_err(|err| RuleError::Rejected(err.to_string()))?
            .build(start.with_timezone(&rrule::Tz::Tz(start.timezone())))
            .map_err(|err| RuleError::Rejected(err.to_string()))?;

        let mut exclusions = self.exclusions;
        exclusions.sort();
        exclusions.dedup();
        let mut inclusions = self.inclusions;
        inclusions.sort();
        inclusions.dedup();

        tracing::trace!(
            rule = %self.text,
            %start,
            exclusions = exclusions.len(),
            inclusions = inclusions.len(),
            "Built recurrence rule"
        );

        Ok(RecurrenceRule {
            text: self.text,
            start,
            duration: end - start,
            until: self.until,
            exclusions,
            inclusions,
            max_occurrences: self.max_occurrences,
            series,
        })
    }
}
