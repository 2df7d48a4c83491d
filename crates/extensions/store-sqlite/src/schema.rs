//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Pragmas for file-backed databases.
pub(crate) const FILE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

/// Initialize the tables for one namespace.
pub(crate) fn init_schema(conn: &Connection, namespace: &str) -> Result<(), Error> {
    conn.execute_batch(&schema_sql(namespace))?;
    Ok(())
}

fn schema_sql(ns: &str) -> String {
    format!(
        r#"
-- Cache entries
CREATE TABLE IF NOT EXISTS {ns}_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input_text TEXT NOT NULL,
    output_text TEXT NOT NULL,
    explanation TEXT,
    metadata TEXT NOT NULL DEFAULT '{{}}',
    embedding BLOB,
    embedding_dim INTEGER,
    use_count INTEGER NOT NULL DEFAULT 0,
    scope_key TEXT,
    succeeded INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{ns}_use_count ON {ns}_entries(use_count DESC);
CREATE INDEX IF NOT EXISTS idx_{ns}_scope ON {ns}_entries(scope_key, use_count DESC);
CREATE INDEX IF NOT EXISTS idx_{ns}_pending ON {ns}_entries(id) WHERE embedding IS NULL;

-- Full-text index over the request text
CREATE VIRTUAL TABLE IF NOT EXISTS {ns}_fts USING fts5(
    input_text,
    content={ns}_entries,
    content_rowid=id,
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS {ns}_entries_ai AFTER INSERT ON {ns}_entries BEGIN
    INSERT INTO {ns}_fts(rowid, input_text) VALUES (new.id, new.input_text);
END;

CREATE TRIGGER IF NOT EXISTS {ns}_entries_ad AFTER DELETE ON {ns}_entries BEGIN
    INSERT INTO {ns}_fts({ns}_fts, rowid, input_text) VALUES('delete', old.id, old.input_text);
END;

CREATE TRIGGER IF NOT EXISTS {ns}_entries_au AFTER UPDATE OF input_text ON {ns}_entries BEGIN
    INSERT INTO {ns}_fts({ns}_fts, rowid, input_text) VALUES('delete', old.id, old.input_text);
    INSERT INTO {ns}_fts(rowid, input_text) VALUES (new.id, new.input_text);
END;
"#
    )
}
