//! Database schema, applied statement by statement on open

pub(crate) const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS voting_members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        position TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS grant_applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reference_code TEXT NOT NULL UNIQUE,
        submitter_name TEXT NOT NULL,
        candidate_full_name TEXT NOT NULL,
        grant_type TEXT NOT NULL,
        event_date TEXT NOT NULL,
        place TEXT NOT NULL,
        amount_requested REAL NOT NULL,
        currency TEXT NOT NULL DEFAULT 'EUR',
        description TEXT NOT NULL DEFAULT '',
        voting_deadline INTEGER NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS vote_tokens (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token TEXT NOT NULL UNIQUE,
        application_id INTEGER NOT NULL REFERENCES grant_applications(id),
        member_id INTEGER NOT NULL REFERENCES voting_members(id),
        vote_value TEXT NOT NULL DEFAULT 'unvoted'
            CHECK (vote_value IN ('unvoted', 'accept', 'reject')),
        rejection_reason TEXT,
        cast_at INTEGER,
        issued_at INTEGER NOT NULL,
        UNIQUE (application_id, member_id)
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        application_id INTEGER NOT NULL REFERENCES grant_applications(id),
        member_id INTEGER NOT NULL REFERENCES voting_members(id),
        parent_comment_id INTEGER REFERENCES comments(id),
        content TEXT NOT NULL,
        stance TEXT NOT NULL DEFAULT 'neutral',
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_vote_tokens_application ON vote_tokens(application_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_application
        ON comments(application_id, created_at DESC)",
];
