mod schema;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::hash::text_digest;

const DEFAULT_SOUNDS_ENABLED: bool = true;
const DEFAULT_MAX_ELEMENTS: i64 = 100;
const DEFAULT_ANNOUNCE_INDEX_NUMBER: bool = false;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history entries cannot be empty")]
    EmptyText,
    #[error("max elements cannot be negative (got {0})")]
    InvalidMaxElements(i64),
    #[error("database lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub text: String,
    pub favorite: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub sounds_enabled: bool,
    /// Retention cap; 0 keeps every entry.
    pub max_elements: i64,
    pub announce_index_number: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sounds_enabled: DEFAULT_SOUNDS_ENABLED,
            max_elements: DEFAULT_MAX_ELEMENTS,
            announce_index_number: DEFAULT_ANNOUNCE_INDEX_NUMBER,
        }
    }
}

pub struct Database {
    conn: Mutex<Connection>,
}

const ENTRY_COLUMNS: &str = "id, string, favorite";

impl Database {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    pub fn new(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        ensure_strings_schema(conn)?;
        ensure_settings_schema(conn)?;

        conn.execute_batch(schema::CREATE_INDEX_HASH)?;
        conn.execute_batch(schema::CREATE_INDEX_FAVORITE)?;

        conn.execute(
            "INSERT OR IGNORE INTO settings (id, sounds, max_elements, number) VALUES (1, ?1, ?2, ?3)",
            params![
                DEFAULT_SOUNDS_ENABLED,
                DEFAULT_MAX_ELEMENTS,
                DEFAULT_ANNOUNCE_INDEX_NUMBER
            ],
        )?;

        Ok(())
    }

    pub fn insert(&self, text: &str, favorite: bool) -> Result<i64, DbError> {
        let conn = self.conn()?;
        insert_entry(&conn, text, favorite)
    }

    pub fn find_by_text(&self, text: &str) -> Result<Option<HistoryEntry>, DbError> {
        let conn = self.conn()?;
        find_entry_by_text(&conn, text)
    }

    pub fn delete_by_text(&self, text: &str) -> Result<bool, DbError> {
        let conn = self.conn()?;
        Ok(delete_entry_by_text(&conn, text)? > 0)
    }

    pub fn delete_by_id(&self, id: i64) -> Result<bool, DbError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM strings WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub fn list_all(&self, favorite: bool) -> Result<Vec<HistoryEntry>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM strings
            WHERE favorite = ?1
            ORDER BY id DESC
            "
        ))?;
        let rows = stmt.query_map(params![favorite], entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn update_favorite(&self, text: &str, favorite: bool) -> Result<bool, DbError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE strings SET favorite = ?1 WHERE hash = ?2 AND string = ?3",
            params![favorite, text_digest(text), text],
        )?;
        Ok(updated > 0)
    }

    pub fn count(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        count_entries(&conn)
    }

    pub fn record_clip(&self, text: &str) -> Result<HistoryEntry, DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let favorite = match find_entry_by_text(&tx, text)? {
            Some(existing) => {
                delete_entry_by_text(&tx, text)?;
                existing.favorite
            }
            None => false,
        };
        let id = insert_entry(&tx, text, favorite)?;

        tx.commit()?;
        Ok(HistoryEntry {
            id,
            text: text.to_string(),
            favorite,
        })
    }

    pub fn prune_excess(&self, max_elements: i64) -> Result<Vec<HistoryEntry>, DbError> {
        if max_elements <= 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let overflow = count_entries(&tx)? - max_elements;
        if overflow <= 0 {
            return Ok(Vec::new());
        }

        let evicted = {
            let mut stmt = tx.prepare(&format!(
                "
                SELECT {ENTRY_COLUMNS}
                FROM strings
                ORDER BY id ASC
                LIMIT ?1
                "
            ))?;
            let rows = stmt.query_map(params![overflow], entry_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        for entry in &evicted {
            tx.execute("DELETE FROM strings WHERE id = ?1", params![entry.id])?;
        }
        tx.commit()?;

        Ok(evicted)
    }

    pub fn delete_all(&self, include_favorites: bool) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let deleted = if include_favorites {
            conn.execute("DELETE FROM strings", [])?
        } else {
            conn.execute("DELETE FROM strings WHERE favorite = 0", [])?
        };
        Ok(deleted)
    }

    pub fn get_settings(&self) -> Result<Settings, DbError> {
        let conn = self.conn()?;
        let row: (bool, i64, bool) = conn.query_row(
            "SELECT sounds, max_elements, number FROM settings WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Settings {
            sounds_enabled: row.0,
            max_elements: row.1,
            announce_index_number: row.2,
        })
    }

    pub fn set_settings(&self, settings: &Settings) -> Result<(), DbError> {
        if settings.max_elements < 0 {
            return Err(DbError::InvalidMaxElements(settings.max_elements));
        }
        let conn = self.conn()?;
        conn.execute(
            "UPDATE settings SET sounds = ?1, max_elements = ?2, number = ?3 WHERE id = 1",
            params![
                settings.sounds_enabled,
                settings.max_elements,
                settings.announce_index_number
            ],
        )?;
        Ok(())
    }
}

fn insert_entry(conn: &Connection, text: &str, favorite: bool) -> Result<i64, DbError> {
    if text.is_empty() {
        return Err(DbError::EmptyText);
    }
    conn.execute(
        "INSERT INTO strings (string, favorite, hash) VALUES (?1, ?2, ?3)",
        params![text, favorite, text_digest(text)],
    )?;
    Ok(conn.last_insert_rowid())
}

fn find_entry_by_text(conn: &Connection, text: &str) -> Result<Option<HistoryEntry>, DbError> {
    conn.query_row(
        &format!(
            "SELECT {ENTRY_COLUMNS} FROM strings WHERE hash = ?1 AND string = ?2 ORDER BY id DESC LIMIT 1"
        ),
        params![text_digest(text), text],
        entry_from_row,
    )
    .optional()
    .map_err(DbError::from)
}

fn delete_entry_by_text(conn: &Connection, text: &str) -> Result<usize, DbError> {
    let deleted = conn.execute(
        "DELETE FROM strings WHERE hash = ?1 AND string = ?2",
        params![text_digest(text), text],
    )?;
    Ok(deleted)
}

fn count_entries(conn: &Connection) -> Result<i64, DbError> {
    conn.query_row("SELECT COUNT(*) FROM strings", [], |row| row.get(0))
        .map_err(DbError::from)
}

fn entry_from_row(row: &Row<'_>) -> Result<HistoryEntry, rusqlite::Error> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        text: row.get(1)?,
        favorite: row.get::<_, i64>(2)? != 0,
    })
}

fn table_columns(conn: &Connection, table: &str) -> Result<Option<HashSet<String>>, DbError> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Ok(None);
    }

    let mut columns = HashSet::new();
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        columns.insert(row?);
    }
    Ok(Some(columns))
}

fn ensure_strings_schema(conn: &Connection) -> Result<(), DbError> {
    match table_columns(conn, "strings")? {
        None => {
            conn.execute_batch(schema::CREATE_STRINGS_TABLE)?;
            Ok(())
        }
        Some(columns) if columns.contains("hash") => Ok(()),
        Some(_) => migrate_legacy_strings(conn),
    }
}

fn migrate_legacy_strings(conn: &Connection) -> Result<(), DbError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "
        ALTER TABLE strings ADD COLUMN hash TEXT NOT NULL DEFAULT '';
        DELETE FROM strings WHERE string IS NULL OR string = '';
        UPDATE strings SET favorite = 0 WHERE favorite IS NULL;
        ",
    )?;

    let rows = {
        let mut stmt = tx.prepare("SELECT id, string FROM strings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };
    for (id, text) in rows {
        tx.execute(
            "UPDATE strings SET hash = ?1 WHERE id = ?2",
            params![text_digest(&text), id],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn ensure_settings_schema(conn: &Connection) -> Result<(), DbError> {
    match table_columns(conn, "settings")? {
        None => {
            conn.execute_batch(schema::CREATE_SETTINGS_TABLE)?;
            Ok(())
        }
        Some(columns) if columns.contains("id") => Ok(()),
        Some(_) => migrate_legacy_settings(conn),
    }
}

fn migrate_legacy_settings(conn: &Connection) -> Result<(), DbError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("DROP TABLE IF EXISTS settings_v2;")?;
    tx.execute_batch(schema::CREATE_SETTINGS_TABLE_V2)?;
    tx.execute_batch(
        "
        INSERT INTO settings_v2 (id, sounds, max_elements, number)
        SELECT 1, COALESCE(sounds, 1) != 0, MAX(COALESCE(max_elements, 100), 0), COALESCE(number, 0) != 0
        FROM settings
        LIMIT 1;
        DROP TABLE settings;
        ALTER TABLE settings_v2 RENAME TO settings;
        ",
    )?;
    tx.commit()?;
    Ok(())
}
