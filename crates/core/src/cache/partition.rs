//! Cache partitions and their entries.
//!
//! [`Partitions`] is the only way to reach stored responses. It opens
//! partitions by role or name, enumerates and prunes them, and looks requests
//! up across all of them. A [`Partition`] handle reads and writes entries of a
//! single partition.
//!
//! Every write is one SQLite statement or one transaction, so an entry is
//! either fully replaced or untouched. Concurrent writers to the same key are
//! not ordered; the last write wins.

use chrono::{SecondsFormat, Utc};
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::names::{CacheNames, PartitionRole};
use crate::Error;
use crate::request::{CacheRequest, CachedResponse};

/// Owner of every cache partition for one deployment.
#[derive(Clone, Debug)]
pub struct Partitions {
    db: CacheDb,
    names: CacheNames,
}

/// Handle to one named partition.
#[derive(Clone, Debug)]
pub struct Partition {
    db: CacheDb,
    name: String,
}

/// Row shape shared by every entry read.
struct StoredRow {
    url: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

const ENTRY_COLUMNS: &str = "e.url, e.status_code, e.headers_json, e.body, e.stored_at";

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            status_code: row.get(1)?,
            headers_json: row.get(2)?,
            body: row.get(3)?,
            stored_at: row.get(4)?,
        })
    }

    fn into_response(self) -> Result<CachedResponse, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{}: headers: {e}", self.url)))?;
        let status = u16::try_from(self.status_code)
            .map_err(|_| Error::CorruptEntry(format!("{}: status {}", self.url, self.status_code)))?;

        Ok(CachedResponse { url: self.url, status, headers, body: self.body, stored_at: Some(self.stored_at) })
    }
}

/// Entry ready to be written: everything fallible already done.
struct PendingEntry {
    key_hash: String,
    method: String,
    url: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl PendingEntry {
    fn new(request: &CacheRequest, response: &CachedResponse) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot cache {} {}", request.method, request.url)));
        }
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::CorruptEntry(format!("{}: headers: {e}", request.url)))?;

        Ok(Self {
            key_hash: request.cache_key(),
            method: request.method.clone(),
            url: request.url.to_string(),
            status_code: i64::from(response.status),
            headers_json,
            body: response.body.clone(),
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, now()],
    )?;
    Ok(())
}

fn write_entry(conn: &rusqlite::Connection, partition: &str, entry: &PendingEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO entries (partition, key_hash, method, url, status_code, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status_code,
            &entry.headers_json,
            &entry.body,
            now(),
        ],
    )?;
    Ok(())
}

impl Partitions {
    pub fn new(db: CacheDb, names: CacheNames) -> Self {
        Self { db, names }
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    /// Open the current partition for a role, creating it if needed.
    pub async fn open(&self, role: PartitionRole) -> Result<Partition, Error> {
        self.open_named(self.names.name(role)).await
    }

    /// Open a partition by name, creating it if needed. Idempotent.
    pub async fn open_named(&self, name: &str) -> Result<Partition, Error> {
        let owned = name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &owned)?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.db.clone(), name: name.to_string() })
    }

    /// Every existing partition name, oldest first.
    pub async fn names(&self) -> Result<Vec<String>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no such partition existed.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition that is not current for this deployment.
    ///
    /// Returns the deleted names, oldest first.
    pub async fn prune(&self) -> Result<Vec<String>, Error> {
        let keep: Vec<String> = self.names.allow_list().iter().map(|s| s.to_string()).collect();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale = {
                    let mut stmt = tx.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                    let all = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    all.into_iter().filter(|name| !keep.contains(name)).collect::<Vec<_>>()
                };
                for name in &stale {
                    tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up across all partitions, oldest partition first.
    pub async fn match_any(&self, request: &CacheRequest) -> Result<Option<CachedResponse>, Error> {
        let key_hash = request.cache_key();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e
                    JOIN partitions p ON p.name = e.partition
                    WHERE e.key_hash = ?1
                    ORDER BY p.rowid ASC
                    LIMIT 1"
                );
                let row = conn
                    .query_row(&sql, params![key_hash], StoredRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_response).transpose()
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response for a GET request, replacing any previous entry.
    pub async fn put(&self, request: &CacheRequest, response: &CachedResponse) -> Result<(), Error> {
        let entry = PendingEntry::new(request, response)?;
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &name)?;
                write_entry(&tx, &name, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction: all of them or none.
    pub async fn put_all(&self, items: &[(CacheRequest, CachedResponse)]) -> Result<(), Error> {
        let entries = items
            .iter()
            .map(|(request, response)| PendingEntry::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &name)?;
                for entry in &entries {
                    write_entry(&tx, &name, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up in this partition only.
    pub async fn get(&self, request: &CacheRequest) -> Result<Option<CachedResponse>, Error> {
        let key_hash = request.cache_key();
        let name = self.name.clone();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.partition = ?1 AND e.key_hash = ?2");
                let row = conn
                    .query_row(&sql, params![name, key_hash], StoredRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_response).transpose()
    }

    /// URLs of every stored entry, oldest write first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY stored_at ASC, rowid ASC")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for a request. Returns false if there was none.
    pub async fn delete(&self, request: &CacheRequest) -> Result<bool, Error> {
        let key_hash = request.cache_key();
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn len(&self) -> Result<usize, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete oldest-written entries until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim(&self, max_entries: usize) -> Result<u64, Error> {
        let max = max_entries as i64;
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![&name], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash IN (
                    SELECT key_hash FROM entries WHERE partition = ?1
                    ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                )",
                    params![&name, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
