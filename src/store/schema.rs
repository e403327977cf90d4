use anyhow::Context;
use sqlx::SqlitePool;

const STATEMENTS: &[(&str, &str)] = &[
    (
        "tasks",
        "CREATE TABLE IF NOT EXISTS tasks (
            id             TEXT PRIMARY KEY,
            goal           TEXT NOT NULL,
            status         TEXT NOT NULL DEFAULT 'planning',
            plan_json      TEXT NOT NULL DEFAULT '[]',
            result_summary TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        )",
    ),
    (
        "tasks index",
        "CREATE INDEX IF NOT EXISTS idx_tasks_status_updated ON tasks(status, updated_at)",
    ),
    (
        "approvals",
        "CREATE TABLE IF NOT EXISTS approvals (
            id           TEXT PRIMARY KEY,
            status       TEXT NOT NULL DEFAULT 'pending',
            tool         TEXT NOT NULL,
            args_json    TEXT NOT NULL DEFAULT '{}',
            risk_level   INTEGER NOT NULL,
            reason       TEXT NOT NULL DEFAULT '',
            requested_at TEXT NOT NULL,
            resolved_at  TEXT,
            resolved_by  TEXT
        )",
    ),
    (
        "approvals index",
        "CREATE INDEX IF NOT EXISTS idx_approvals_status ON approvals(status, requested_at)",
    ),
    (
        "timeline_events",
        "CREATE TABLE IF NOT EXISTS timeline_events (
            id           TEXT PRIMARY KEY,
            timestamp    TEXT NOT NULL,
            type         TEXT NOT NULL,
            summary      TEXT NOT NULL,
            payload_json TEXT NOT NULL DEFAULT '{}'
        )",
    ),
    (
        "timeline index",
        "CREATE INDEX IF NOT EXISTS idx_timeline_timestamp ON timeline_events(timestamp)",
    ),
    (
        "memories",
        "CREATE TABLE IF NOT EXISTS memories (
            id         TEXT PRIMARY KEY,
            type       TEXT NOT NULL,
            text       TEXT NOT NULL,
            tags       TEXT NOT NULL DEFAULT '[]',
            importance INTEGER NOT NULL DEFAULT 5,
            source     TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "memories_fts",
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
            text, tags, content=memories, content_rowid=rowid
        )",
    ),
    (
        "memories insert trigger",
        "CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
            INSERT INTO memories_fts(rowid, text, tags)
            VALUES (new.rowid, new.text, new.tags);
        END",
    ),
    (
        "memories delete trigger",
        "CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
            INSERT INTO memories_fts(memories_fts, rowid, text, tags)
            VALUES ('delete', old.rowid, old.text, old.tags);
        END",
    ),
    (
        "memories update trigger",
        "CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
            INSERT INTO memories_fts(memories_fts, rowid, text, tags)
            VALUES ('delete', old.rowid, old.text, old.tags);
            INSERT INTO memories_fts(rowid, text, tags)
            VALUES (new.rowid, new.text, new.tags);
        END",
    ),
    (
        "cost_tracking",
        "CREATE TABLE IF NOT EXISTS cost_tracking (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            date          TEXT NOT NULL,
            model         TEXT NOT NULL,
            input_tokens  INTEGER NOT NULL DEFAULT 0,
            output_tokens INTEGER NOT NULL DEFAULT 0,
            cost_cents    REAL NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL
        )",
    ),
    (
        "cost index",
        "CREATE INDEX IF NOT EXISTS idx_cost_date ON cost_tracking(date)",
    ),
    (
        "calendar_events",
        "CREATE TABLE IF NOT EXISTS calendar_events (
            id         TEXT PRIMARY KEY,
            title      TEXT NOT NULL,
            starts_at  TEXT NOT NULL,
            ends_at    TEXT,
            type       TEXT NOT NULL DEFAULT 'task',
            status     TEXT NOT NULL DEFAULT 'scheduled',
            notes      TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    ),
];

pub(super) async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    for (name, sql) in STATEMENTS {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("create {name}"))?;
    }
    Ok(())
}
