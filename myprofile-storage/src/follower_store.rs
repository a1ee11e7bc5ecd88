//! Persistent follower table.
//!
//! Uses a SQLite file (or an in-memory database for tests). Every public
//! operation takes the connection lock for its whole duration, so a reader
//! never observes a half-applied write.

use crate::error::{StorageError, StorageResult};
use myprofile_types::{FollowerId, FollowerRecord};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Version stamped into `PRAGMA user_version`. Bump when the table shape
/// changes; older files are then recreated empty.
pub const SCHEMA_VERSION: i64 = 1;

/// Result of a write, with the table contents it left behind read in the
/// same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written<T> {
    pub value: T,
    pub followers: Vec<FollowerRecord>,
}

/// Durable table of follower records.
pub struct FollowerStore {
    conn: Mutex<Connection>,
}

impl FollowerStore {
    /// Opens (or creates) a follower store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened follower store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Opens an in-memory follower store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    // Runs `op` and reads the resulting list in one transaction. If either
    // step fails the transaction is rolled back.
    fn write<T>(
        &self,
        op: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<Written<T>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let value = op(&tx)?;
        let followers = read_all_from(&tx)?;
        tx.commit()?;
        Ok(Written { value, followers })
    }

    // ── Bulk operations ──────────────────────────────────────────

    /// Discards every stored record and installs `records` in their given
    /// order. Runs as one transaction: on error nothing changes.
    ///
    /// Repeated ids keep their first occurrence; records with a blank id are
    /// skipped. The value is the number of records stored.
    pub fn replace_all(&self, records: &[FollowerRecord]) -> StorageResult<Written<usize>> {
        self.write(|tx| {
            tx.execute("DELETE FROM followers", [])?;

            let mut seen = HashSet::with_capacity(records.len());
            let mut position: i64 = 0;
            let mut insert = tx.prepare(
                "INSERT INTO followers (id, position, display_name, email, following)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                if checked_id(&record.id).is_err() {
                    warn!("Dropping follower with blank id from replacement");
                    continue;
                }
                if !seen.insert(&record.id) {
                    warn!("Dropping duplicate follower id {} from replacement", record.id);
                    continue;
                }
                insert.execute(params![
                    record.id.as_str(),
                    position,
                    record.display_name,
                    record.email,
                    record.following_state,
                ])?;
                position += 1;
            }
            Ok(position as usize)
        })
    }

    /// Returns every record in display order.
    pub fn read_all(&self) -> StorageResult<Vec<FollowerRecord>> {
        let conn = self.conn()?;
        read_all_from(&conn)
    }

    /// Number of stored records.
    pub fn len(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM followers", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    // ── Single-record operations ─────────────────────────────────

    /// Looks up one record.
    pub fn get(&self, id: &FollowerId) -> StorageResult<Option<FollowerRecord>> {
        let conn = self.conn()?;
        get_from(&conn, id)
    }

    /// Deletes one record, returning it together with its ordering slot.
    pub fn remove(
        &self,
        id: &FollowerId,
    ) -> StorageResult<Written<Option<(i64, FollowerRecord)>>> {
        self.write(|tx| {
            let found = tx
                .query_row(
                    "SELECT position, id, display_name, email, following
                     FROM followers WHERE id = ?1",
                    params![id.as_str()],
                    |row| {
                        let position: i64 = row.get(0)?;
                        let id: String = row.get(1)?;
                        let name: String = row.get(2)?;
                        let email: Option<String> = row.get(3)?;
                        let following: bool = row.get(4)?;
                        Ok((position, id, name, email, following))
                    },
                )
                .optional()?;

            let Some((position, id, name, email, following)) = found else {
                return Ok(None);
            };
            tx.execute("DELETE FROM followers WHERE id = ?1", params![id])?;
            Ok(Some((position, to_record(id, name, email, following)?)))
        })
    }

    /// Reinserts a record at a slot previously returned by [`remove`].
    /// The value is `false` if the id is already stored; nothing changes then.
    ///
    /// [`remove`]: Self::remove
    pub fn restore(
        &self,
        position: i64,
        record: &FollowerRecord,
    ) -> StorageResult<Written<bool>> {
        let id = checked_id(&record.id)?;
        self.write(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO followers (id, position, display_name, email, following)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    position,
                    record.display_name,
                    record.email,
                    record.following_state,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Appends a record after all others. The value is `false` if the id is
    /// already stored; nothing changes then.
    ///
    /// A blank id is rejected with [`StorageError::InvalidData`].
    pub fn append(&self, record: &FollowerRecord) -> StorageResult<Written<bool>> {
        let id = checked_id(&record.id)?;
        self.write(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO followers (id, position, display_name, email, following)
                 SELECT ?1, COALESCE(MAX(position), -1) + 1, ?2, ?3, ?4 FROM followers",
                params![id, record.display_name, record.email, record.following_state],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Sets the following flag of one record. The value is `false` if the id
    /// is not stored.
    pub fn set_following(
        &self,
        id: &FollowerId,
        following: bool,
    ) -> StorageResult<Written<bool>> {
        self.write(|tx| {
            let updated = tx.execute(
                "UPDATE followers SET following = ?2 WHERE id = ?1",
                params![id.as_str(), following],
            )?;
            Ok(updated == 1)
        })
    }

    /// Flips the following flag of one record. The value is the new flag, or
    /// `None` if the id is not stored.
    pub fn toggle_following(&self, id: &FollowerId) -> StorageResult<Written<Option<bool>>> {
        self.write(|tx| {
            let Some(record) = get_from(tx, id)? else {
                return Ok(None);
            };
            let following = !record.following_state;
            tx.execute(
                "UPDATE followers SET following = ?2 WHERE id = ?1",
                params![id.as_str(), following],
            )?;
            Ok(Some(following))
        })
    }
}

fn init_schema(conn: &Connection) -> StorageResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version != SCHEMA_VERSION {
        if version != 0 {
            warn!(
                "Follower store schema version {} does not match {}, recreating empty",
                version, SCHEMA_VERSION
            );
        }
        conn.execute_batch("DROP TABLE IF EXISTS followers;")?;
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS followers (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            email TEXT,
            following INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_followers_position ON followers(position);
        ",
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn read_all_from(conn: &Connection) -> StorageResult<Vec<FollowerRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, email, following FROM followers
         ORDER BY position, rowid",
    )?;
    let rows = stmt.query_map([], read_row)?;

    let mut result = Vec::new();
    for row in rows {
        let (id, display_name, email, following) = row?;
        result.push(to_record(id, display_name, email, following)?);
    }
    Ok(result)
}

fn get_from(conn: &Connection, id: &FollowerId) -> StorageResult<Option<FollowerRecord>> {
    let row = conn
        .query_row(
            "SELECT id, display_name, email, following FROM followers WHERE id = ?1",
            params![id.as_str()],
            read_row,
        )
        .optional()?;
    row.map(|(id, name, email, following)| to_record(id, name, email, following))
        .transpose()
}

// A blank id could not be read back by `read_all`.
fn checked_id(id: &FollowerId) -> StorageResult<&str> {
    if id.is_blank() {
        return Err(StorageError::InvalidData("blank follower id".to_string()));
    }
    Ok(id.as_str())
}

type RawRow = (String, String, Option<String>, bool);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn to_record(
    id: String,
    display_name: String,
    email: Option<String>,
    following: bool,
) -> StorageResult<FollowerRecord> {
    let id = FollowerId::parse(&id)
        .map_err(|e| StorageError::InvalidData(format!("follower id: {e}")))?;
    Ok(FollowerRecord {
        id,
        display_name,
        email,
        following_state: following,
    })
}
