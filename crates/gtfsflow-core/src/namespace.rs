//! Identifier namespacing used when several datasets are merged.
//!
//! Every identifier column that takes part in a key relationship is listed
//! here. Optional columns are only rewritten when they hold a non-empty
//! value so that an absent reference never turns into `"A_"`.

#[derive(Debug, Clone, Copy)]
pub struct PrefixedColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub optional: bool,
}

const fn required(table: &'static str, column: &'static str) -> PrefixedColumn {
    PrefixedColumn {
        table,
        column,
        optional: false,
    }
}

const fn optional(table: &'static str, column: &'static str) -> PrefixedColumn {
    PrefixedColumn {
        table,
        column,
        optional: true,
    }
}

/// Agency identifiers are not prefixed; they are replaced by the prefix
/// itself (see [`AGENCY_REFERENCES`]).
pub const PREFIXED_COLUMNS: &[PrefixedColumn] = &[
    required("stops", "stop_id"),
    optional("stops", "parent_station"),
    optional("stops", "zone_id"),
    optional("stops", "level_id"),
    required("routes", "route_id"),
    required("calendar", "service_id"),
    required("calendar_dates", "service_id"),
    required("shapes", "shape_id"),
    required("trips", "trip_id"),
    required("trips", "route_id"),
    required("trips", "service_id"),
    optional("trips", "shape_id"),
    optional("trips", "block_id"),
    required("stop_times", "trip_id"),
    required("stop_times", "stop_id"),
    required("frequencies", "trip_id"),
    required("transfers", "from_stop_id"),
    required("transfers", "to_stop_id"),
];

/// Columns holding an agency identifier, set to the dataset prefix.
pub const AGENCY_REFERENCES: &[(&str, &str)] = &[("agency", "agency_id"), ("routes", "agency_id")];

/// Fallback prefix for the dataset at `index` when none is configured.
pub fn default_prefix(index: usize) -> String {
    format!("DATASET_{index}")
}
