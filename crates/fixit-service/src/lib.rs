//! Event resolution and clustering for the fixit engine.
//!
//! Descriptors from every provider are materialized into keyed events,
//! registration references to unknown events are reconciled with
//! placeholders, and the resulting events are grouped into map-marker
//! clusters. Everything here is a pure, request-scoped transformation.

pub mod catalog;
pub mod cluster;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod reconcile;
