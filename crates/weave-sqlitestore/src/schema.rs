use rusqlite::Connection;

/// DDL applied on open. All statements are idempotent.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS links (
    link_hash       TEXT PRIMARY KEY,
    map_id          TEXT NOT NULL,
    process         TEXT NOT NULL,
    prev_link_hash  TEXT,
    priority        REAL,
    data            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS links_map_id_idx ON links (map_id);
CREATE INDEX IF NOT EXISTS links_prev_link_hash_idx ON links (prev_link_hash);
CREATE INDEX IF NOT EXISTS links_process_idx ON links (process);

CREATE TABLE IF NOT EXISTS link_tags (
    link_hash  TEXT NOT NULL,
    tag        TEXT NOT NULL,
    PRIMARY KEY (link_hash, tag)
);

CREATE TABLE IF NOT EXISTS maps (
    map_id   TEXT PRIMARY KEY,
    process  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS evidences (
    link_hash  TEXT NOT NULL,
    backend    TEXT NOT NULL,
    provider   TEXT NOT NULL,
    data       TEXT NOT NULL,
    PRIMARY KEY (link_hash, backend, provider)
);

CREATE TABLE IF NOT EXISTS kv_store (
    key    BLOB PRIMARY KEY,
    value  BLOB NOT NULL
);
";

pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(tables.contains(&"links".to_string()));
        assert!(tables.contains(&"link_tags".to_string()));
        assert!(tables.contains(&"maps".to_string()));
        assert!(tables.contains(&"evidences".to_string()));
        assert!(tables.contains(&"kv_store".to_string()));
    }
}
