//! Shared building blocks for the fixit event engine.
//!
//! Holds configuration, the core error type and the small value types
//! (status, class, geo-position, venue, date window) every other crate
//! passes around.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
