/// SQL DDL for the paste database.
pub const SCHEMA_VERSION: u32 = 1;

/// `created_at` holds fixed-width RFC 3339 UTC text (microsecond precision),
/// so lexical order is chronological order.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS pastes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    network TEXT NOT NULL,
    user TEXT NOT NULL DEFAULT '',
    device TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pastes_network_created ON pastes(network, created_at);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
