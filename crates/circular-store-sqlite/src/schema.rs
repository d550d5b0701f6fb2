//! SQL schema for the circular SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS activities (
    activity_id       TEXT PRIMARY KEY,
    title             TEXT NOT NULL,
    starts_at         TEXT NOT NULL,
    ends_at           TEXT NOT NULL,
    location          TEXT,
    sections          TEXT NOT NULL DEFAULT '[]',   -- JSON array of section names
    requires_circular INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS circular_definitions (
    activity_id        TEXT PRIMARY KEY REFERENCES activities(activity_id),
    template_ref       TEXT NOT NULL,
    fields             TEXT NOT NULL DEFAULT '[]',  -- JSON CustomField[]
    acknowledgements   TEXT NOT NULL DEFAULT '[]',  -- JSON Acknowledgement[]
    signature_deadline TEXT,
    updated_at         TEXT NOT NULL
);

-- Local mirror of the host system's participant directory.
CREATE TABLE IF NOT EXISTS participants (
    participant_id TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    surname        TEXT NOT NULL,
    birth_date     TEXT NOT NULL,   -- YYYY-MM-DD
    section        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS guardian_links (
    guardian_id    TEXT NOT NULL,
    participant_id TEXT NOT NULL REFERENCES participants(participant_id),
    relation       TEXT NOT NULL,
    PRIMARY KEY (guardian_id, participant_id)
);

CREATE TABLE IF NOT EXISTS health_profiles (
    participant_id  TEXT PRIMARY KEY,
    allergies       TEXT NOT NULL DEFAULT '[]',
    medications     TEXT NOT NULL DEFAULT '[]',
    medical_notes   TEXT,
    last_updated_at TEXT NOT NULL
);

-- Replaced wholesale on every health-profile write.
CREATE TABLE IF NOT EXISTS emergency_contacts (
    participant_id TEXT NOT NULL,
    position       INTEGER NOT NULL,
    name           TEXT NOT NULL,
    phone          TEXT NOT NULL,
    relation       TEXT NOT NULL,
    is_primary     INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (participant_id, position)
);

CREATE UNIQUE INDEX IF NOT EXISTS emergency_contacts_one_primary
    ON emergency_contacts(participant_id) WHERE is_primary = 1;

-- Current-state view; history lives in response_events.
CREATE TABLE IF NOT EXISTS circular_responses (
    response_id       TEXT PRIMARY KEY,
    activity_id       TEXT NOT NULL REFERENCES activities(activity_id),
    participant_id    TEXT NOT NULL,
    guardian_id       TEXT NOT NULL,
    answers           TEXT NOT NULL,   -- JSON map field id -> AnswerValue
    acknowledged      TEXT NOT NULL,   -- JSON array of acknowledgement ids
    signature_ref     TEXT NOT NULL,
    signed_at         TEXT NOT NULL,
    state             TEXT NOT NULL,
    verification      TEXT,            -- JSON Verification or NULL
    rejection         TEXT,            -- JSON Rejection or NULL
    document_id       TEXT,
    document_url      TEXT,
    payment_status    TEXT NOT NULL DEFAULT 'PENDING',
    health_profile_at TEXT,
    version           INTEGER NOT NULL,
    UNIQUE (activity_id, participant_id)
);

-- Strictly append-only.
CREATE TABLE IF NOT EXISTS response_events (
    event_id    TEXT PRIMARY KEY,
    response_id TEXT NOT NULL REFERENCES circular_responses(response_id),
    kind        TEXT NOT NULL,
    payload     TEXT NOT NULL,   -- JSON ResponseEventKind
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS signature_blobs (
    signature_ref TEXT PRIMARY KEY,   -- hex SHA-256 of bytes
    bytes         BLOB NOT NULL,
    stored_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance_confirmations (
    confirmation_id TEXT PRIMARY KEY,
    activity_id     TEXT NOT NULL REFERENCES activities(activity_id),
    participant_id  TEXT NOT NULL,
    state           TEXT NOT NULL,
    comment         TEXT,
    decided_at      TEXT,
    decided_by      TEXT,
    UNIQUE (activity_id, participant_id)
);

CREATE INDEX IF NOT EXISTS responses_state_idx     ON circular_responses(state);
CREATE INDEX IF NOT EXISTS events_response_idx     ON response_events(response_id);
CREATE INDEX IF NOT EXISTS participants_section_idx ON participants(section);

PRAGMA user_version = 1;
";
