//! Snapshot driver for the fixit engine: reads descriptors and registration
//! references, runs one resolution pass and produces map markers.

pub mod snapshot;
