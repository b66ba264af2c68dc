//! Calendar grammar for the fixit event engine.
//!
//! Parses compact recurrence rules and datetime-with-timezone tokens, and
//! expands rules into concrete occurrences.

pub mod datetime;
pub mod error;
pub mod recurrence;
pub mod timezone;
