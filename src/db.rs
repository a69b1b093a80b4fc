use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

/// A single key/value table: the tracker keeps its whole aggregate under one key.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS storage (
    key        TEXT PRIMARY KEY CHECK(length(key) > 0),
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}

pub fn get_item(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn set_item(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO storage (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let conn = open_memory().unwrap();
        assert_eq!(get_item(&conn, "k").unwrap(), None);
    }

    #[test]
    fn set_overwrites() {
        let conn = open_memory().unwrap();
        set_item(&conn, "k", "one").unwrap();
        set_item(&conn, "k", "two").unwrap();
        assert_eq!(get_item(&conn, "k").unwrap().as_deref(), Some("two"));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM storage", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_key_rejected() {
        let conn = open_memory().unwrap();
        assert!(set_item(&conn, "", "v").is_err());
    }
}
