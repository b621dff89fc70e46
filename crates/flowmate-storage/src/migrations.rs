use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if database table creation or index creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Sessions table - one row per focus interval of a queued task
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            task_name TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT,
            planned_minutes INTEGER NOT NULL,
            status TEXT NOT NULL,
            distraction_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Distractions table - append-only log per session
    conn.execute(
        "CREATE TABLE IF NOT EXISTS distractions (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            process_name TEXT NOT NULL,
            window_title TEXT NOT NULL DEFAULT '',
            reason TEXT NOT NULL,
            FOREIGN KEY (session_id) REFERENCES sessions(id)
        )",
        [],
    )?;

    // AI config table - single row holding oracle settings
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ai_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            provider TEXT NOT NULL DEFAULT 'openai',
            model TEXT,
            api_key TEXT,
            base_url TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT
        )",
        [],
    )?;

    add_column_if_missing(conn, "ai_config", "mock", "INTEGER NOT NULL DEFAULT 0")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_distractions_session ON distractions(session_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_distractions_timestamp ON distractions(timestamp)",
        [],
    )?;

    Ok(())
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column_name: &str,
    column_type: &str,
) -> Result<()> {
    let column_exists: i32 = conn.query_row(
        &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name='{column_name}'"),
        [],
        |row| row.get(0),
    )?;

    if column_exists == 0 {
        conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN {column_name} {column_type}"),
            [],
        )?;
        log::info!("Added column {table}.{column_name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('sessions', 'distractions', 'ai_config')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_mock_column_added_to_legacy_ai_config() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE ai_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                provider TEXT NOT NULL DEFAULT 'openai',
                model TEXT, api_key TEXT, base_url TEXT,
                enabled INTEGER NOT NULL DEFAULT 1, updated_at TEXT
            )",
            [],
        )
        .unwrap();

        init_schema(&conn).unwrap();

        let has_mock: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('ai_config') WHERE name='mock'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(has_mock, 1);
    }
}
