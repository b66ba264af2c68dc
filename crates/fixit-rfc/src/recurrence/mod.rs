//! Recurrence rules and their expansion into concrete occurrences.
//!
//! A rule is parsed from a compact `KEY=VALUE;KEY=VALUE` string, bound to a
//! first occurrence, and combined with exclusion and inclusion dates. The raw
//! series comes from the `rrule` crate; exclusion matching, inclusion union
//! and window clamping are applied on top of it.

mod date;
mod expand;
mod frequency;
mod rule;

pub use date::RecurrenceDate;
pub use expand::Occurrence;
pub use frequency::Frequency;
pub use rule::{RecurrenceRule, RecurrenceRuleBuilder, RuleError, RuleText};
