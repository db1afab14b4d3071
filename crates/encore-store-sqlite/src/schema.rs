//! SQL schema for the encore SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `user_version` pragma.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- List-view projection of a performance; one row per upstream identifier.
CREATE TABLE IF NOT EXISTS performances (
    performance_id TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    start_date     TEXT NOT NULL,   -- ISO 8601 date
    end_date       TEXT NOT NULL,
    venue          TEXT NOT NULL,
    poster         TEXT NOT NULL,
    genre          TEXT NOT NULL,
    state          TEXT NOT NULL,
    open_run       INTEGER,         -- 0/1; NULL when the feed omits it
    area           TEXT,
    kid_flag       TEXT,
    last_refreshed TEXT NOT NULL
);

-- Full-profile projection, written once per identifier under the default
-- refresh policy.
CREATE TABLE IF NOT EXISTS performance_details (
    performance_id    TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    start_date        TEXT NOT NULL,
    end_date          TEXT NOT NULL,
    venue             TEXT NOT NULL,
    cast_members      TEXT NOT NULL,
    crew              TEXT NOT NULL,
    runtime           TEXT NOT NULL,
    age_rating        TEXT NOT NULL,
    producer          TEXT NOT NULL,
    price_guidance    TEXT NOT NULL,
    poster            TEXT NOT NULL,
    synopsis          TEXT NOT NULL,
    genre             TEXT NOT NULL,
    state             TEXT NOT NULL,
    open_run          INTEGER,
    style_urls        TEXT NOT NULL,
    schedule_guidance TEXT NOT NULL,
    related_links     TEXT NOT NULL DEFAULT '[]',   -- JSON [{name, url}]
    last_refreshed    TEXT NOT NULL
);

-- Facility rows are overwritten field-by-field on every ingestion pass.
CREATE TABLE IF NOT EXISTS facilities (
    facility_id    TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    region         TEXT NOT NULL,
    sub_region     TEXT NOT NULL,
    characteristic TEXT NOT NULL,
    hall_count     INTEGER NOT NULL,
    seat_count     INTEGER NOT NULL,
    open_year      TEXT,
    phone          TEXT,
    url            TEXT,
    address        TEXT,
    latitude       REAL NOT NULL,
    longitude      REAL NOT NULL
);

-- Session-scoped selections; the set for a token is replaced wholesale on
-- every save.
CREATE TABLE IF NOT EXISTS picks (
    pick_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    token          TEXT NOT NULL,
    performance_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS genre_prefs (
    pref_id INTEGER PRIMARY KEY AUTOINCREMENT,
    token   TEXT NOT NULL,
    genre   TEXT NOT NULL
);

-- Denormalised future-window snapshot; independent lifecycle, rebuilt
-- wholesale.
CREATE TABLE IF NOT EXISTS upcoming_performances (
    performance_id TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    start_date     TEXT NOT NULL,
    end_date       TEXT NOT NULL,
    venue          TEXT NOT NULL,
    poster         TEXT NOT NULL,
    area           TEXT,
    genre          TEXT,
    open_run       INTEGER,
    state          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS performances_window_idx ON performances(start_date, end_date);
CREATE INDEX IF NOT EXISTS performances_genre_idx  ON performances(genre, start_date);
CREATE INDEX IF NOT EXISTS facilities_region_idx   ON facilities(region, sub_region);
CREATE INDEX IF NOT EXISTS picks_token_idx         ON picks(token);
CREATE INDEX IF NOT EXISTS genre_prefs_token_idx   ON genre_prefs(token);
CREATE INDEX IF NOT EXISTS upcoming_start_idx      ON upcoming_performances(start_date);

PRAGMA user_version = 1;
";
