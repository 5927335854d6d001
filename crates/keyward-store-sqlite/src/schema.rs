//! SQL schema for the Keyward SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Availability has no column of its own: a key is available iff it has no
/// `custody` row, so double ownership and flag drift are unrepresentable.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS keys (
    tag_number  TEXT PRIMARY KEY,
    series_id   TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    building    TEXT NOT NULL,
    key_type    TEXT NOT NULL,     -- 'door' | 'display_case' | 'file_cabinet'
    location    TEXT NOT NULL,     -- JSON array of location tags
    comment     TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,     -- ISO 8601 UTC
    UNIQUE (series_id, sequence_id)
);

CREATE TABLE IF NOT EXISTS users (
    pid        TEXT PRIMARY KEY,
    full_name  TEXT NOT NULL,
    role       TEXT NOT NULL DEFAULT 'requestor',
    created_at TEXT NOT NULL
);

-- Current custody: at most one row per key. Renames follow the key;
-- deleting a held key or a key-holding user is refused at this level too.
CREATE TABLE IF NOT EXISTS custody (
    tag_number  TEXT PRIMARY KEY
                REFERENCES keys(tag_number)
                ON UPDATE CASCADE ON DELETE RESTRICT,
    pid         TEXT NOT NULL
                REFERENCES users(pid)
                ON DELETE RESTRICT,
    acquired_at TEXT NOT NULL
);

-- The custody ledger. Appended by every transition; rows change only
-- through the administrator correction path. tag_number and pid are plain
-- text, not foreign keys: a record narrates the identifiers as they were
-- at the time of the exchange.
CREATE TABLE IF NOT EXISTS ledger (
    record_id  TEXT PRIMARY KEY,
    tag_number TEXT NOT NULL,
    pid        TEXT NOT NULL,
    date       TEXT NOT NULL,
    exchange   TEXT NOT NULL,      -- 'acquired' | 'returned' | 'reported'
    comment    TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS settings (
    name  TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS custody_pid_idx ON custody(pid);
CREATE INDEX IF NOT EXISTS ledger_tag_idx  ON ledger(tag_number);
CREATE INDEX IF NOT EXISTS ledger_pid_idx  ON ledger(pid);
CREATE INDEX IF NOT EXISTS ledger_date_idx ON ledger(date);

PRAGMA user_version = 1;
";
