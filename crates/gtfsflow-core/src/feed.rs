//! The GTFS data dictionary: one [`TableDef`] per supported feed file.
//!
//! Order matters: it is the order tables are exported and merged in.

use crate::convert::{format_time_of_day, integer, real, time_of_day};
use crate::schema::{ColumnDef, TableDef};

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef::text(name)
}

const fn int(name: &'static str) -> ColumnDef {
    ColumnDef::parsed(name, integer)
}

const fn float(name: &'static str) -> ColumnDef {
    ColumnDef::parsed(name, real)
}

const fn time(name: &'static str) -> ColumnDef {
    ColumnDef::converted(name, time_of_day, format_time_of_day)
}

pub static AGENCY: TableDef = TableDef {
    file_name: "agency.txt",
    table: "agency",
    columns: &[
        text("agency_id"),
        text("agency_name"),
        text("agency_url"),
        text("agency_timezone"),
        text("agency_lang"),
        text("agency_phone"),
        text("agency_fare_url"),
        text("agency_email"),
    ],
    custom_fields: true,
};

pub static STOPS: TableDef = TableDef {
    file_name: "stops.txt",
    table: "stops",
    columns: &[
        text("stop_id"),
        text("stop_code"),
        text("stop_name"),
        text("stop_desc"),
        float("stop_lat"),
        float("stop_lon"),
        text("zone_id"),
        text("stop_url"),
        int("location_type"),
        text("parent_station"),
        text("stop_timezone"),
        int("wheelchair_boarding"),
        text("level_id"),
        text("platform_code"),
    ],
    custom_fields: true,
};

pub static ROUTES: TableDef = TableDef {
    file_name: "routes.txt",
    table: "routes",
    columns: &[
        text("route_id"),
        text("agency_id"),
        text("route_short_name"),
        text("route_long_name"),
        text("route_desc"),
        int("route_type"),
        text("route_url"),
        text("route_color"),
        text("route_text_color"),
        int("route_sort_order"),
    ],
    custom_fields: true,
};

pub static TRIPS: TableDef = TableDef {
    file_name: "trips.txt",
    table: "trips",
    columns: &[
        text("route_id"),
        text("service_id"),
        text("trip_id"),
        text("trip_headsign"),
        text("trip_short_name"),
        int("direction_id"),
        text("block_id"),
        text("shape_id"),
        int("wheelchair_accessible"),
        int("bikes_allowed"),
    ],
    custom_fields: true,
};

pub static CALENDAR: TableDef = TableDef {
    file_name: "calendar.txt",
    table: "calendar",
    columns: &[
        text("service_id"),
        int("monday"),
        int("tuesday"),
        int("wednesday"),
        int("thursday"),
        int("friday"),
        int("saturday"),
        int("sunday"),
        text("start_date"),
        text("end_date"),
    ],
    custom_fields: false,
};

pub static CALENDAR_DATES: TableDef = TableDef {
    file_name: "calendar_dates.txt",
    table: "calendar_dates",
    columns: &[text("service_id"), text("date"), int("exception_type")],
    custom_fields: false,
};

pub static SHAPES: TableDef = TableDef {
    file_name: "shapes.txt",
    table: "shapes",
    columns: &[
        text("shape_id"),
        float("shape_pt_lat"),
        float("shape_pt_lon"),
        int("shape_pt_sequence"),
        float("shape_dist_traveled"),
    ],
    custom_fields: false,
};

pub static FREQUENCIES: TableDef = TableDef {
    file_name: "frequencies.txt",
    table: "frequencies",
    columns: &[
        text("trip_id"),
        text("start_time"),
        text("end_time"),
        int("headway_secs"),
        int("exact_times"),
    ],
    custom_fields: false,
};

pub static TRANSFERS: TableDef = TableDef {
    file_name: "transfers.txt",
    table: "transfers",
    columns: &[
        text("from_stop_id"),
        text("to_stop_id"),
        int("transfer_type"),
        int("min_transfer_time"),
    ],
    custom_fields: false,
};

pub static STOP_TIMES: TableDef = TableDef {
    file_name: "stop_times.txt",
    table: "stop_times",
    columns: &[
        text("trip_id"),
        time("arrival_time"),
        time("departure_time"),
        text("stop_id"),
        int("stop_sequence"),
        text("stop_headsign"),
        int("pickup_type"),
        int("drop_off_type"),
        float("shape_dist_traveled"),
    ],
    custom_fields: false,
};

/// All supported feed tables in export order.
pub static GTFS_TABLES: [&TableDef; 10] = [
    &AGENCY,
    &STOPS,
    &ROUTES,
    &TRIPS,
    &CALENDAR,
    &CALENDAR_DATES,
    &SHAPES,
    &FREQUENCIES,
    &TRANSFERS,
    &STOP_TIMES,
];

/// Name of the synthetic feed metadata entry written on export.
pub const FEED_INFO_FILE: &str = "feed_info.txt";

pub const FEED_INFO_COLUMNS: [&str; 7] = [
    "feed_publisher_name",
    "feed_publisher_url",
    "feed_lang",
    "feed_start_date",
    "feed_end_date",
    "feed_version",
    "feed_contact_email",
];
