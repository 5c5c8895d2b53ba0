//! Fixed relational schema for the GTFS tables.
//!
//! Column names and order agree with `gtfsflow_core::feed`. Natural keys are
//! PRIMARY KEY or UNIQUE so that `INSERT OR IGNORE` makes re-imports and
//! merges idempotent.

/// Idempotent DDL for all feed tables.
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS agency (
    agency_id TEXT PRIMARY KEY,
    agency_name TEXT NOT NULL,
    agency_url TEXT NOT NULL,
    agency_timezone TEXT NOT NULL,
    agency_lang TEXT,
    agency_phone TEXT,
    agency_fare_url TEXT,
    agency_email TEXT,
    extra_fields_json TEXT
);

CREATE TABLE IF NOT EXISTS stops (
    stop_id TEXT PRIMARY KEY,
    stop_code TEXT,
    stop_name TEXT NOT NULL,
    stop_desc TEXT,
    stop_lat REAL NOT NULL,
    stop_lon REAL NOT NULL,
    zone_id TEXT,
    stop_url TEXT,
    location_type INTEGER DEFAULT 0,
    parent_station TEXT,
    stop_timezone TEXT,
    wheelchair_boarding INTEGER DEFAULT 0,
    level_id TEXT,
    platform_code TEXT,
    extra_fields_json TEXT
);
CREATE INDEX IF NOT EXISTS stops_parent_station_idx ON stops (parent_station);
CREATE INDEX IF NOT EXISTS stops_zone_idx ON stops (zone_id);

CREATE TABLE IF NOT EXISTS routes (
    route_id TEXT PRIMARY KEY,
    agency_id TEXT NOT NULL REFERENCES agency (agency_id) ON DELETE CASCADE,
    route_short_name TEXT NOT NULL,
    route_long_name TEXT NOT NULL,
    route_desc TEXT,
    route_type INTEGER NOT NULL,
    route_url TEXT,
    route_color TEXT,
    route_text_color TEXT,
    route_sort_order INTEGER,
    extra_fields_json TEXT
);
CREATE INDEX IF NOT EXISTS routes_agency_idx ON routes (agency_id);

CREATE TABLE IF NOT EXISTS calendar (
    service_id TEXT PRIMARY KEY,
    monday INTEGER NOT NULL,
    tuesday INTEGER NOT NULL,
    wednesday INTEGER NOT NULL,
    thursday INTEGER NOT NULL,
    friday INTEGER NOT NULL,
    saturday INTEGER NOT NULL,
    sunday INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calendar_dates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_id TEXT NOT NULL,
    date TEXT NOT NULL,
    exception_type INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS cd_service_idx ON calendar_dates (service_id);
CREATE UNIQUE INDEX IF NOT EXISTS cd_service_date_idx ON calendar_dates (service_id, date);

CREATE TABLE IF NOT EXISTS shapes (
    shape_id TEXT NOT NULL,
    shape_pt_lat REAL NOT NULL,
    shape_pt_lon REAL NOT NULL,
    shape_pt_sequence INTEGER NOT NULL,
    shape_dist_traveled REAL
);
CREATE INDEX IF NOT EXISTS shapes_id_idx ON shapes (shape_id);
CREATE UNIQUE INDEX IF NOT EXISTS shapes_pk ON shapes (shape_id, shape_pt_sequence);

CREATE TABLE IF NOT EXISTS trips (
    trip_id TEXT PRIMARY KEY,
    route_id TEXT NOT NULL REFERENCES routes (route_id) ON DELETE CASCADE,
    service_id TEXT NOT NULL REFERENCES calendar (service_id) ON DELETE CASCADE,
    trip_headsign TEXT,
    trip_short_name TEXT,
    direction_id INTEGER,
    block_id TEXT,
    shape_id TEXT,
    wheelchair_accessible INTEGER DEFAULT 0,
    bikes_allowed INTEGER DEFAULT 0,
    extra_fields_json TEXT
);
CREATE INDEX IF NOT EXISTS trips_route_idx ON trips (route_id);
CREATE INDEX IF NOT EXISTS trips_service_idx ON trips (service_id);
CREATE INDEX IF NOT EXISTS trips_shape_idx ON trips (shape_id);
CREATE INDEX IF NOT EXISTS trips_block_idx ON trips (block_id);

CREATE TABLE IF NOT EXISTS stop_times (
    trip_id TEXT NOT NULL REFERENCES trips (trip_id) ON DELETE CASCADE,
    arrival_time INTEGER,
    departure_time INTEGER,
    stop_id TEXT NOT NULL REFERENCES stops (stop_id) ON DELETE CASCADE,
    stop_sequence INTEGER NOT NULL,
    stop_headsign TEXT,
    pickup_type INTEGER DEFAULT 0,
    drop_off_type INTEGER DEFAULT 0,
    shape_dist_traveled REAL
);
CREATE UNIQUE INDEX IF NOT EXISTS st_pk ON stop_times (trip_id, stop_sequence);
CREATE INDEX IF NOT EXISTS st_stop_idx ON stop_times (stop_id);

CREATE TABLE IF NOT EXISTS frequencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trip_id TEXT NOT NULL REFERENCES trips (trip_id) ON DELETE CASCADE,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    headway_secs INTEGER NOT NULL,
    exact_times INTEGER DEFAULT 0
);
CREATE INDEX IF NOT EXISTS freq_trip_idx ON frequencies (trip_id);
CREATE UNIQUE INDEX IF NOT EXISTS freq_trip_start_idx ON frequencies (trip_id, start_time);

CREATE TABLE IF NOT EXISTS transfers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_stop_id TEXT NOT NULL REFERENCES stops (stop_id) ON DELETE CASCADE,
    to_stop_id TEXT NOT NULL REFERENCES stops (stop_id) ON DELETE CASCADE,
    transfer_type INTEGER NOT NULL,
    min_transfer_time INTEGER
);
CREATE INDEX IF NOT EXISTS tr_from_idx ON transfers (from_stop_id);
CREATE INDEX IF NOT EXISTS tr_to_idx ON transfers (to_stop_id);
CREATE UNIQUE INDEX IF NOT EXISTS tr_pair_idx ON transfers (from_stop_id, to_stop_id);
";
