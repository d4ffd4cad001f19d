//! SQL schema for the ClaimStore SQLite database.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS claimants (
    id      INTEGER PRIMARY KEY,
    uuid    TEXT NOT NULL UNIQUE,
    name    TEXT NOT NULL UNIQUE,
    url     TEXT,
    joined  TEXT NOT NULL            -- ISO 8601 UTC; server-assigned
);

-- Names are stored upper-case.
CREATE TABLE IF NOT EXISTS identifier_types (
    id            INTEGER PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    description   TEXT NOT NULL,
    url           TEXT NOT NULL,
    example_value TEXT NOT NULL,
    example_url   TEXT NOT NULL,
    claimant_id   INTEGER REFERENCES claimants(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS predicates (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

-- Derived from the equivalence-bearing claims; see `rebuild`.
-- (type_id, value) is unique by construction, not by constraint.
CREATE TABLE IF NOT EXISTS equivalent_identifiers (
    id      INTEGER PRIMARY KEY,
    eqid    TEXT NOT NULL,           -- class UUID, shared by the whole class
    type_id INTEGER NOT NULL REFERENCES identifier_types(id) ON DELETE RESTRICT,
    value   TEXT NOT NULL
);

-- Claims are append-only; rows only disappear with their claimant.
CREATE TABLE IF NOT EXISTS claims (
    id              INTEGER PRIMARY KEY,
    uuid            TEXT NOT NULL UNIQUE,
    received        TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    created         TEXT NOT NULL,   -- ISO 8601 UTC; claimant-supplied
    claimant_id     INTEGER NOT NULL REFERENCES claimants(id) ON DELETE CASCADE,
    subject_type_id INTEGER NOT NULL REFERENCES identifier_types(id) ON DELETE RESTRICT,
    subject_value   TEXT NOT NULL,
    subject_eqid    INTEGER REFERENCES equivalent_identifiers(id) ON DELETE SET NULL,
    predicate_id    INTEGER NOT NULL REFERENCES predicates(id) ON DELETE RESTRICT,
    certainty       REAL NOT NULL CHECK (certainty >= 0.0 AND certainty <= 1.0),
    human           INTEGER CHECK (human IN (0, 1)),
    actor           TEXT,
    role            TEXT,
    object_type_id  INTEGER NOT NULL REFERENCES identifier_types(id) ON DELETE RESTRICT,
    object_value    TEXT NOT NULL,
    object_eqid     INTEGER REFERENCES equivalent_identifiers(id) ON DELETE SET NULL,
    claim_details   TEXT NOT NULL,   -- submission JSON, verbatim
    CHECK (subject_type_id != object_type_id)
);

CREATE INDEX IF NOT EXISTS eqids_eqid_idx       ON equivalent_identifiers(eqid);
CREATE INDEX IF NOT EXISTS eqids_pair_idx       ON equivalent_identifiers(type_id, value);
CREATE INDEX IF NOT EXISTS claims_created_idx   ON claims(created);
CREATE INDEX IF NOT EXISTS claims_claimant_idx  ON claims(claimant_id);
CREATE INDEX IF NOT EXISTS claims_predicate_idx ON claims(predicate_id);
CREATE INDEX IF NOT EXISTS claims_subject_idx   ON claims(subject_type_id, subject_value);
CREATE INDEX IF NOT EXISTS claims_object_idx    ON claims(object_type_id, object_value);

PRAGMA user_version = 1;
";
