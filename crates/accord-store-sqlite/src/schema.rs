//! SQL schema for the Accord SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on the `user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `INTEGER PRIMARY KEY` rowids double as the monotone creation
/// sequence: version ordering and every "latest"/"head" computation is
/// defined over `versions.id`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS pacticipants (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    id             INTEGER PRIMARY KEY,
    pacticipant_id INTEGER NOT NULL REFERENCES pacticipants(id),
    number         TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (pacticipant_id, number)
);

CREATE TABLE IF NOT EXISTS branches (
    id             INTEGER PRIMARY KEY,
    pacticipant_id INTEGER NOT NULL REFERENCES pacticipants(id),
    name           TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (pacticipant_id, name)
);

-- Membership is append-only; a version is never removed from a branch.
CREATE TABLE IF NOT EXISTS branch_versions (
    id         INTEGER PRIMARY KEY,
    branch_id  INTEGER NOT NULL REFERENCES branches(id),
    version_id INTEGER NOT NULL REFERENCES versions(id),
    created_at TEXT NOT NULL,
    UNIQUE (branch_id, version_id)
);

CREATE TABLE IF NOT EXISTS tags (
    id             INTEGER PRIMARY KEY,
    pacticipant_id INTEGER NOT NULL REFERENCES pacticipants(id),
    version_id     INTEGER NOT NULL REFERENCES versions(id),
    name           TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (version_id, name)
);

-- Immutable, content-addressed pact documents.
CREATE TABLE IF NOT EXISTS pact_versions (
    id         INTEGER PRIMARY KEY,
    sha        TEXT NOT NULL UNIQUE,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pact_publications (
    id                  INTEGER PRIMARY KEY,
    consumer_version_id INTEGER NOT NULL REFERENCES versions(id),
    provider_id         INTEGER NOT NULL REFERENCES pacticipants(id),
    pact_version_id     INTEGER NOT NULL REFERENCES pact_versions(id),
    revision_number     INTEGER NOT NULL,
    created_at          TEXT NOT NULL,
    UNIQUE (consumer_version_id, provider_id, revision_number)
);

CREATE TABLE IF NOT EXISTS environments (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- At most one currently_deployed row per (pacticipant, environment,
-- target) scope; record_deployment flips the prior row in the same
-- transaction that inserts the new one.
CREATE TABLE IF NOT EXISTS deployed_versions (
    id                 INTEGER PRIMARY KEY,
    uuid               TEXT NOT NULL UNIQUE,
    pacticipant_id     INTEGER NOT NULL REFERENCES pacticipants(id),
    version_id         INTEGER NOT NULL REFERENCES versions(id),
    environment_id     INTEGER NOT NULL REFERENCES environments(id),
    target             TEXT,
    currently_deployed INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL
);

-- At most one currently_released row per (pacticipant, environment).
CREATE TABLE IF NOT EXISTS released_versions (
    id                 INTEGER PRIMARY KEY,
    uuid               TEXT NOT NULL UNIQUE,
    pacticipant_id     INTEGER NOT NULL REFERENCES pacticipants(id),
    version_id         INTEGER NOT NULL REFERENCES versions(id),
    environment_id     INTEGER NOT NULL REFERENCES environments(id),
    currently_released INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS versions_pacticipant_idx ON versions(pacticipant_id);
CREATE INDEX IF NOT EXISTS branch_versions_version_idx ON branch_versions(version_id);
CREATE INDEX IF NOT EXISTS tags_version_idx ON tags(version_id);
CREATE INDEX IF NOT EXISTS tags_pacticipant_name_idx ON tags(pacticipant_id, name);
CREATE INDEX IF NOT EXISTS pact_publications_consumer_version_idx ON pact_publications(consumer_version_id);
CREATE INDEX IF NOT EXISTS deployed_versions_version_idx ON deployed_versions(version_id);
CREATE INDEX IF NOT EXISTS deployed_versions_scope_idx ON deployed_versions(pacticipant_id, environment_id, target);
CREATE INDEX IF NOT EXISTS released_versions_version_idx ON released_versions(version_id);
CREATE INDEX IF NOT EXISTS released_versions_scope_idx ON released_versions(pacticipant_id, environment_id);

PRAGMA user_version = 1;
";
