//! Registry schema history.
//!
//! Steps run in version order inside one transaction each; the runner records
//! the version itself, so a step only carries its DDL.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Version bookkeeping, created before any step runs.
pub(crate) const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "seen_jobs with url and fingerprint lookups",
        sql: r#"
-- Postings already delivered downstream. Append-only.
CREATE TABLE IF NOT EXISTS seen_jobs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    url         TEXT NOT NULL DEFAULT '',
    fingerprint TEXT NOT NULL DEFAULT '',
    source      TEXT NOT NULL DEFAULT '',
    company     TEXT NOT NULL DEFAULT '',
    title       TEXT NOT NULL DEFAULT '',
    seen_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_seen_jobs_url ON seen_jobs(url);
CREATE INDEX IF NOT EXISTS idx_seen_jobs_fingerprint ON seen_jobs(fingerprint);
"#,
    },
    Migration {
        version: 2,
        description: "seen_jobs by source, for stats",
        sql: "CREATE INDEX IF NOT EXISTS idx_seen_jobs_source ON seen_jobs(source);",
    },
];

/// Highest schema version this build knows.
pub(crate) fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}
