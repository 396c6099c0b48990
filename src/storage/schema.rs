//! Database schema definitions
//!
//! Company tables are created on demand, one per crawl target. The schema is created
//! with `IF NOT EXISTS` so opening an existing database is a no-op.

/// SQL schema shared by every company
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs per company
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT,
    status TEXT NOT NULL,
    summary TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_runs_company ON crawl_runs(company);
"#;

/// Initializes the shared schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Builds the DDL for one company's page/document table
///
/// `table` must already be validated as a plain identifier.
pub fn company_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT,
    link TEXT NOT NULL UNIQUE,
    images TEXT,
    tags TEXT,
    dt_download TEXT NOT NULL,
    local_path TEXT,
    parent_document TEXT REFERENCES {table}(link)
);

CREATE INDEX IF NOT EXISTS idx_{table}_parent ON {table}(parent_document);
"#,
        table = table
    )
}
