//! `SQLite` schema definitions for safestep.
//!
//! Trips get typed columns because the lifecycle and history queries filter and
//! sort on them. Every other entity kind is a flat id → JSON record mapping in
//! the `records` table; preferences are a single pinned row.

/// SQL statement to create the trips table.
///
/// `seq` records insertion order and breaks ties in history ordering.
/// Timestamps are fixed-width RFC 3339 UTC strings, so text order is time order.
pub const CREATE_TRIPS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trips (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    destination TEXT NOT NULL,
    destination_type TEXT NOT NULL,
    status TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    progress INTEGER NOT NULL DEFAULT 0,
    current_step INTEGER NOT NULL DEFAULT 0,
    total_steps INTEGER NOT NULL,
    was_comfortable INTEGER,
    safe_route_enabled INTEGER NOT NULL
)
";

/// SQL statement to create an index on status for the active-trip lookup.
pub const CREATE_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trips_status ON trips(status)
";

/// SQL statement to create an index on `end_time` for history queries.
pub const CREATE_END_TIME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trips_end_time ON trips(end_time DESC)
";

/// SQL statement to create the generic entity record table.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (kind, id)
)
";

/// SQL statement to create the singleton preferences table.
pub const CREATE_PREFERENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS preferences (
    singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
    body TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_TRIPS_TABLE,
    CREATE_STATUS_INDEX,
    CREATE_END_TIME_INDEX,
    CREATE_RECORDS_TABLE,
    CREATE_PREFERENCES_TABLE,
    CREATE_METADATA_TABLE,
];
