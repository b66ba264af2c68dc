/// Provider id used for descriptors authored in the internal editor.
pub const INTERNAL_PROVIDER_ID: &str = "fixit";

/// Provider id recorded on descriptors synthesized for unresolvable references.
pub const PLACEHOLDER_PROVIDER_ID: &str = "placeholder";

/// Neutral marker colour used when a cluster has no colour consensus.
pub const DEFAULT_MARKER_COLOUR: &str = "#7f7f7f";

/// Default per-axis geo tolerance, in degrees.
pub const DEFAULT_GEO_PRECISION: f64 = 0.0001;

/// Safety cap for expansions that are not bounded by a window or UNTIL.
pub const DEFAULT_MAX_OCCURRENCES: usize = 1000;

/// Location id prefixes, one per kind of cluster.
pub const VENUE_LOCATION_PREFIX: &str = "venue";
pub const GEO_LOCATION_PREFIX: &str = "geo";
pub const TBD_LOCATION_PREFIX: &str = "tbd";

const CANCELLED_TOKEN: &str = "CANCELLED";
const TENTATIVE_TOKEN: &str = "TENTATIVE";

/// Status markers prefixed to marker labels when a whole group shares the status.
pub const CANCELLED_MARKER: &str = const_str::concat!("[", CANCELLED_TOKEN, "]");
pub const TENTATIVE_MARKER: &str = const_str::concat!("[", TENTATIVE_TOKEN, "]");

/// Summary shown for events whose descriptor could not be found.
pub const PLACEHOLDER_SUMMARY: &str = "Event not found";
