//! SQLite tab table
//!
//! One `tabs` table, versioned through `PRAGMA user_version`. Timestamps are
//! stored as RFC 3339 text. Calls run on the blocking pool so the async
//! repository never stalls on disk I/O.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::error::{StorageError, StorageResult};
use crate::models::{TabId, TabRecord, TabState, TabType};

use super::{RecordOrder, RecordQuery, TabStorage};

/// Highest schema version this build can read and write.
pub const TAB_SCHEMA_VERSION: i64 = 1;

const SELECT_COLUMNS: &str = "SELECT id, tab_type, title, state, is_pinned, opened, position, \
     closed_at, created_at, updated_at, payload FROM tabs";

/// Tab table backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Backend(format!("cannot create '{}': {e}", parent.display()))
            })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Returns the schema version recorded in the database.
    pub fn schema_version(&self) -> StorageResult<i64> {
        let conn = lock(&self.conn)?;
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Brings the schema up to [`TAB_SCHEMA_VERSION`].
    pub fn migrate(&self) -> StorageResult<()> {
        let current = self.schema_version()?;
        if current > TAB_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: TAB_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let conn = lock(&self.conn)?;
            conn.execute_batch(include_str!("../../migrations/0001_tab_schema.sql"))?;
            conn.execute("PRAGMA user_version = 1", []).map(|_| ())?;
            tracing::debug!(version = 1, "Applied tab schema migration");
        }

        Ok(())
    }

    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn)?;
            op(&guard)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("sqlite worker failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StorageError::Backend(format!("sqlite connection poisoned: {e}")))
}

fn select_sql(query: &RecordQuery) -> String {
    let mut sql = String::from(SELECT_COLUMNS);
    if let Some(opened) = query.opened {
        sql.push_str(if opened {
            " WHERE opened = 1"
        } else {
            " WHERE opened = 0"
        });
    }
    match query.order {
        RecordOrder::Unordered => {}
        RecordOrder::Position => sql.push_str(" ORDER BY position ASC, id ASC"),
        RecordOrder::ClosedAtDesc => sql.push_str(" ORDER BY closed_at DESC, id ASC"),
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

/// Raw column values, decoded after the statement is done.
struct RawRow {
    id: String,
    tab_type: String,
    title: String,
    state: String,
    is_pinned: bool,
    opened: bool,
    position: i64,
    closed_at: Option<String>,
    created_at: String,
    updated_at: String,
    payload: String,
}

impl RawRow {
    fn into_record(self) -> StorageResult<TabRecord> {
        let corrupt = |reason: String| StorageError::Corrupt {
            id: self.id.clone(),
            reason,
        };
        let tab_type = TabType::parse(&self.tab_type)
            .ok_or_else(|| corrupt(format!("unknown tab type '{}'", self.tab_type)))?;
        let state = TabState::parse(&self.state)
            .ok_or_else(|| corrupt(format!("unknown tab state '{}'", self.state)))?;
        let closed_at = self
            .closed_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(corrupt)?;
        let created_at = parse_timestamp(&self.created_at).map_err(corrupt)?;
        let updated_at = parse_timestamp(&self.updated_at).map_err(corrupt)?;

        Ok(TabRecord {
            id: TabId::from_string(self.id),
            tab_type,
            title: self.title,
            state,
            is_pinned: self.is_pinned,
            opened: self.opened,
            position: self.position,
            closed_at,
            created_at,
            updated_at,
            payload: self.payload,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("bad timestamp '{value}': {err}"))
}

#[async_trait]
impl TabStorage for SqliteStorage {
    async fn find(&self, query: &RecordQuery) -> StorageResult<Vec<TabRecord>> {
        let sql = select_sql(query);
        self.with_conn(move |conn| {
            let mut statement = conn.prepare(&sql)?;
            let rows = statement.query_map([], |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    tab_type: row.get(1)?,
                    title: row.get(2)?,
                    state: row.get(3)?,
                    is_pinned: row.get(4)?,
                    opened: row.get(5)?,
                    position: row.get(6)?,
                    closed_at: row.get(7)?,
                    created_at: row.get(8)?,
                    updated_at: row.get(9)?,
                    payload: row.get(10)?,
                })
            })?;
            let raw = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(raw
                .into_iter()
                .filter_map(|row| match row.into_record() {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::error!(error = %e, "Skipping unreadable tab row");
                        None
                    }
                })
                .collect())
        })
        .await
    }

    async fn insert(&self, record: &TabRecord) -> StorageResult<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tabs (id, tab_type, title, state, is_pinned, opened, position, \
                 closed_at, created_at, updated_at, payload) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.as_str(),
                    record.tab_type.as_str(),
                    record.title,
                    record.state.as_str(),
                    record.is_pinned,
                    record.opened,
                    record.position,
                    record.closed_at.map(|t| t.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                    record.payload,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update(&self, record: &TabRecord) -> StorageResult<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tabs SET tab_type = ?2, title = ?3, state = ?4, is_pinned = ?5, \
                 opened = ?6, position = ?7, closed_at = ?8, created_at = ?9, \
                 updated_at = ?10, payload = ?11 WHERE id = ?1",
                params![
                    record.id.as_str(),
                    record.tab_type.as_str(),
                    record.title,
                    record.state.as_str(),
                    record.is_pinned,
                    record.opened,
                    record.position,
                    record.closed_at.map(|t| t.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                    record.payload,
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::Backend(format!(
                    "no tab row with id '{}'",
                    record.id
                )));
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &TabId) -> StorageResult<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM tabs WHERE id = ?1", [id.as_str()])?;
            Ok(())
        })
        .await
    }
}
