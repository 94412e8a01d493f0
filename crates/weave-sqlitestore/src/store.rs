use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use weave_batch::BufferedBatch;
use weave_store::{
    event, Adapter, Batch, EventSender, KeyValueStore, MapFilter, SegmentFilter, StoreError,
    StoreEvent, StoreInfo, StoreReader, StoreResult, StoreWriter,
};
use weave_types::{Evidence, Evidences, Link, LinkHash, Segment, SegmentMeta, ValidationError};

use crate::schema;

/// Name reported in the store's information.
pub const NAME: &str = "sqlite";

/// Description reported in the store's information.
pub const DESCRIPTION: &str = "Weave SQLite store";

/// Configuration options for the store.
#[derive(Clone, Debug, Default)]
pub struct SqliteStoreConfig {
    /// Database file; `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    pub version: String,
    pub commit: String,
}

/// Relational adapter over SQLite.
///
/// The connection mutex serializes all statements, which is stricter than
/// the readers-writer discipline the contract asks for; the observable
/// guarantees are the same. Events are published before the connection
/// lock is released so event order equals write order.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: SqliteStoreConfig,
    event_chans: RwLock<Vec<EventSender>>,
}

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn sql_limit(limit: usize) -> i64 {
    limit.min(i64::MAX as usize) as i64
}

impl SqliteStore {
    /// Open (or create) a store per the configuration.
    pub fn open(config: SqliteStoreConfig) -> StoreResult<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path).map_err(backend_err)?,
            None => Connection::open_in_memory().map_err(backend_err)?,
        };
        schema::initialize(&conn).map_err(backend_err)?;
        tracing::debug!(path = ?config.path, "sqlite store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            event_chans: RwLock::new(Vec::new()),
        })
    }

    /// An in-memory store, for tests and embedding.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(SqliteStoreConfig::default())
    }

    fn lock_conn(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Internal("connection lock poisoned".into()))
    }

    fn publish(&self, event: &StoreEvent) -> StoreResult<()> {
        let chans = self
            .event_chans
            .read()
            .map_err(|_| StoreError::Internal("event channel lock poisoned".into()))?;
        event::deliver(&chans, event);
        Ok(())
    }
}

fn evidences_for(conn: &Connection, link_hash_hex: &str) -> StoreResult<Option<Evidences>> {
    let mut stmt = conn
        .prepare("SELECT data FROM evidences WHERE link_hash = ? ORDER BY rowid")
        .map_err(backend_err)?;
    let rows = stmt
        .query_map(params![link_hash_hex], |row| row.get::<_, String>(0))
        .map_err(backend_err)?;

    let mut evidences = Vec::new();
    for row in rows {
        let data = row.map_err(backend_err)?;
        let evidence: Evidence =
            serde_json::from_str(&data).map_err(|e| StoreError::Internal(e.to_string()))?;
        evidences.push(evidence);
    }

    if evidences.is_empty() {
        Ok(None)
    } else {
        Ok(Some(evidences.into_iter().collect()))
    }
}

fn collect_ids(conn: &Connection, sql: &str, bindings: &[&dyn ToSql]) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(backend_err)?;
    let result = stmt
        .query_map(params_from_iter(bindings.iter().copied()), |row| row.get(0))
        .map_err(backend_err)?
        .collect::<Result<_, _>>()
        .map_err(backend_err);
    result
}

fn segment_from_row(
    conn: &Connection,
    link_hash_hex: &str,
    data: &str,
) -> StoreResult<Segment> {
    let link: Link =
        serde_json::from_str(data).map_err(|e| StoreError::Internal(e.to_string()))?;
    let link_hash = LinkHash::from_hex(link_hash_hex).map_err(StoreError::Validation)?;
    Ok(Segment {
        link,
        meta: SegmentMeta {
            link_hash,
            evidences: evidences_for(conn, link_hash_hex)?.unwrap_or_default(),
        },
    })
}

impl StoreWriter for SqliteStore {
    fn create_link(&self, link: &Link) -> StoreResult<LinkHash> {
        link.validate()?;
        let link_hash = link.hash()?;
        let link_hash_hex = link_hash.to_hex();
        let data =
            serde_json::to_string(link).map_err(|e| StoreError::Internal(e.to_string()))?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(backend_err)?;

        // Exact duplicates re-accept: same hash, same row.
        tx.execute(
            "INSERT OR REPLACE INTO links
                 (link_hash, map_id, process, prev_link_hash, priority, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                link_hash_hex,
                link.map_id(),
                link.process(),
                link.prev_link_hash(),
                link.meta.priority,
                data
            ],
        )
        .map_err(backend_err)?;

        tx.execute(
            "INSERT OR IGNORE INTO maps (map_id, process) VALUES (?1, ?2)",
            params![link.map_id(), link.process()],
        )
        .map_err(backend_err)?;

        tx.execute(
            "DELETE FROM link_tags WHERE link_hash = ?1",
            params![link_hash_hex],
        )
        .map_err(backend_err)?;
        for tag in &link.meta.tags {
            tx.execute(
                "INSERT OR IGNORE INTO link_tags (link_hash, tag) VALUES (?1, ?2)",
                params![link_hash_hex, tag],
            )
            .map_err(backend_err)?;
        }

        tx.commit().map_err(backend_err)?;

        tracing::debug!(link_hash = %link_hash.short_hex(), map_id = link.map_id(), "link row stored");
        self.publish(&StoreEvent::saved_links(link.clone()))?;
        Ok(link_hash)
    }

    fn add_evidence(&self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()> {
        let data =
            serde_json::to_string(evidence).map_err(|e| StoreError::Internal(e.to_string()))?;

        let conn = self.lock_conn()?;
        let result = conn.execute(
            "INSERT INTO evidences (link_hash, backend, provider, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![link_hash.to_hex(), evidence.backend, evidence.provider, data],
        );

        match result {
            Ok(_) => {
                self.publish(&StoreEvent::saved_evidence(*link_hash, evidence.clone()))?;
                Ok(())
            }
            // The primary key enforces evidence uniqueness.
            Err(e) if is_constraint_violation(&e) => {
                Err(ValidationError::DuplicateEvidence {
                    backend: evidence.backend.clone(),
                    provider: evidence.provider.clone(),
                }
                .into())
            }
            Err(e) => Err(backend_err(e)),
        }
    }
}

impl StoreReader for SqliteStore {
    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>> {
        let conn = self.lock_conn()?;
        let link_hash_hex = link_hash.to_hex();

        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM links WHERE link_hash = ?1",
                params![link_hash_hex],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend_err)?;

        match data {
            Some(data) => Ok(Some(segment_from_row(&conn, &link_hash_hex, &data)?)),
            None => Ok(None),
        }
    }

    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>> {
        if filter.pagination.limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = String::from("SELECT link_hash, data FROM links");
        let mut clauses: Vec<String> = Vec::new();
        let mut bindings: Vec<Box<dyn ToSql>> = Vec::new();

        if !filter.map_ids.is_empty() {
            clauses.push(format!("map_id IN ({})", placeholders(filter.map_ids.len())));
            bindings.extend(
                filter
                    .map_ids
                    .iter()
                    .map(|m| Box::new(m.clone()) as Box<dyn ToSql>),
            );
        }
        if let Some(process) = &filter.process {
            clauses.push("process = ?".into());
            bindings.push(Box::new(process.clone()));
        }
        if let Some(prev) = &filter.prev_link_hash {
            if prev.is_empty() {
                clauses.push("prev_link_hash IS NULL".into());
            } else {
                clauses.push("prev_link_hash = ?".into());
                bindings.push(Box::new(prev.clone()));
            }
        }
        if !filter.link_hashes.is_empty() {
            clauses.push(format!(
                "link_hash IN ({})",
                placeholders(filter.link_hashes.len())
            ));
            bindings.extend(
                filter
                    .link_hashes
                    .iter()
                    .map(|h| Box::new(h.clone()) as Box<dyn ToSql>),
            );
        }
        for tag in &filter.tags {
            clauses.push(
                "EXISTS (SELECT 1 FROM link_tags t \
                 WHERE t.link_hash = links.link_hash AND t.tag = ?)"
                    .into(),
            );
            bindings.push(Box::new(tag.clone()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        // `priority IS NULL` ranks missing priorities after present ones.
        sql.push_str(
            " ORDER BY priority IS NULL, priority DESC, link_hash ASC LIMIT ? OFFSET ?",
        );
        bindings.push(Box::new(sql_limit(filter.pagination.limit)));
        bindings.push(Box::new(sql_limit(filter.pagination.offset)));

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&sql).map_err(backend_err)?;
        let rows: Vec<(String, String)> = stmt
            .query_map(
                params_from_iter(bindings.iter().map(|b| b.as_ref())),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(backend_err)?
            .collect::<Result<_, _>>()
            .map_err(backend_err)?;
        drop(stmt);

        rows.iter()
            .map(|(link_hash_hex, data)| segment_from_row(&conn, link_hash_hex, data))
            .collect()
    }

    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>> {
        if filter.pagination.limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock_conn()?;
        let limit = sql_limit(filter.pagination.limit);
        let offset = sql_limit(filter.pagination.offset);

        match &filter.process {
            // A map qualifies when any member link matches the process.
            Some(process) => collect_ids(
                &conn,
                "SELECT DISTINCT m.map_id FROM maps m
                 JOIN links l ON l.map_id = m.map_id
                 WHERE l.process = ?
                 ORDER BY m.map_id LIMIT ? OFFSET ?",
                &[process, &limit, &offset],
            ),
            None => collect_ids(
                &conn,
                "SELECT map_id FROM maps ORDER BY map_id LIMIT ? OFFSET ?",
                &[&limit, &offset],
            ),
        }
    }

    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>> {
        let conn = self.lock_conn()?;
        evidences_for(&conn, &link_hash.to_hex())
    }
}

impl KeyValueStore for SqliteStore {
    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(backend_err)
    }

    fn set_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(backend_err)?;
        Ok(())
    }

    fn delete_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.lock_conn()?;
        let previous: Option<Vec<u8>> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend_err)?;

        if previous.is_some() {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                .map_err(backend_err)?;
        }
        Ok(previous)
    }
}

impl Adapter for SqliteStore {
    fn get_info(&self) -> StoreResult<StoreInfo> {
        Ok(StoreInfo {
            name: NAME.into(),
            description: DESCRIPTION.into(),
            version: self.config.version.clone(),
            commit: self.config.commit.clone(),
        })
    }

    fn new_batch(&self) -> StoreResult<Box<dyn Batch + '_>> {
        Ok(Box::new(BufferedBatch::new(self)))
    }

    fn add_event_channel(&self, sender: EventSender) {
        self.event_chans
            .write()
            .expect("event channel lock poisoned")
            .push(sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_in_memory_initializes_the_schema() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get_info().unwrap().name, NAME);
    }

    #[test]
    fn denormalized_columns_match_the_link() {
        let store = SqliteStore::in_memory().unwrap();
        let mut link = Link::new_root("m1", "p1", json!({"n": 1}));
        link.meta.priority = Some(2.5);
        link.meta.tags = vec!["a".into(), "a".into(), "b".into()];
        let link_hash = store.create_link(&link).unwrap();

        let conn = store.conn.lock().unwrap();
        let (map_id, process, priority): (String, String, f64) = conn
            .query_row(
                "SELECT map_id, process, priority FROM links WHERE link_hash = ?1",
                params![link_hash.to_hex()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(map_id, "m1");
        assert_eq!(process, "p1");
        assert_eq!(priority, 2.5);

        // Duplicate tags collapse in the tag index but survive in the body.
        let tag_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM link_tags WHERE link_hash = ?1",
                params![link_hash.to_hex()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tag_count, 2);
        drop(conn);

        let segment = store.get_segment(&link_hash).unwrap().unwrap();
        assert_eq!(segment.link.meta.tags, ["a", "a", "b"]);
    }

    #[test]
    fn root_links_store_null_prev() {
        let store = SqliteStore::in_memory().unwrap();
        let root_hash = store
            .create_link(&Link::new_root("m1", "p1", json!({})))
            .unwrap();

        let mut child = Link::new_root("m1", "p1", json!({"c": 1}));
        child.meta.prev_link_hash = Some(root_hash.to_hex());
        store.create_link(&child).unwrap();

        let conn = store.conn.lock().unwrap();
        let null_prevs: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM links WHERE prev_link_hash IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(null_prevs, 1);
    }

    #[test]
    fn evidence_uniqueness_is_constraint_backed() {
        let store = SqliteStore::in_memory().unwrap();
        let link_hash = LinkHash::from_hash([1; 32]);

        store
            .add_evidence(&link_hash, &Evidence::new("b", "p"))
            .unwrap();
        let err = store
            .add_evidence(&link_hash, &Evidence::new("b", "p"))
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
